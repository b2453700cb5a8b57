//! Error types for span operations.

/// Result type alias for span operations.
pub type Result<T> = std::result::Result<T, SpanError>;

/// Errors reported at the span-setting boundary.
///
/// Only [`set_span`](crate::SpanCollection::set_span) validates its input;
/// a rejected call leaves the collection untouched. Internal index
/// maintenance does not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpanError {
    /// A span was requested with a zero row or column extent.
    #[error("invalid span ({row}, {column}, {row_span}, {column_span}): extents must be at least 1")]
    InvalidSpan {
        row: usize,
        column: usize,
        row_span: usize,
        column_span: usize,
    },

    /// The anchor cell is already covered by a span that starts elsewhere.
    #[error("span at ({row}, {column}) would overlap an existing span")]
    Overlap { row: usize, column: usize },
}
