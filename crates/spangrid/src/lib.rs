//! Merged-cell span tracking for table and grid views.
//!
//! This crate provides [`SpanCollection`], the bookkeeping a table view
//! needs to support merged cells: a registry of non-overlapping
//! rectangular [`Span`] regions over a sparse row/column grid, point and
//! rectangle queries against them, and coherent adjustment of every span
//! when the hosting model inserts or removes rows or columns.
//!
//! The collection is a pure in-process data structure: single-threaded,
//! synchronous, and free of I/O. A hosting view typically:
//!
//! - calls [`SpanCollection::set_span`] when the application merges or
//!   unmerges cells;
//! - routes its model's row/column insertion and removal notifications to
//!   [`update_inserted_rows`], [`update_removed_rows`] and their column
//!   counterparts;
//! - consults [`span_at`] and [`spans_in_rect`] while painting and
//!   hit-testing, to skip cells already drawn as part of a merged region.
//!
//! # Example
//!
//! ```
//! use spangrid::SpanCollection;
//!
//! let mut spans = SpanCollection::new();
//!
//! // Merge a 3x3 block anchored at row 2, column 2.
//! spans.set_span(2, 2, 3, 3).unwrap();
//! assert_eq!(spans.row_span(3, 3), 3);
//!
//! // The model removes row 3; the block shrinks with it.
//! spans.update_removed_rows(3, 3);
//! assert_eq!(spans.span(2, 2).height(), 2);
//! ```
//!
//! Diagnostics are emitted on the `spangrid::spans` target through the
//! `tracing` crate; install a subscriber to see rejected calls.
//!
//! [`update_inserted_rows`]: SpanCollection::update_inserted_rows
//! [`update_removed_rows`]: SpanCollection::update_removed_rows
//! [`span_at`]: SpanCollection::span_at
//! [`spans_in_rect`]: SpanCollection::spans_in_rect

mod collection;
mod error;
mod span;

pub use collection::{SpanCollection, SpanId};
pub use error::{Result, SpanError};
pub use span::Span;
