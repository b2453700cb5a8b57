//! Two-level ordered index of merged-cell spans.
//!
//! This module provides [`SpanCollection`], which tracks non-overlapping
//! rectangular [`Span`] regions over a sparse row/column grid and keeps
//! itself consistent while the hosting view inserts, removes, or resizes
//! rows and columns.
//!
//! # Structure
//!
//! Spans live in an arena keyed by stable [`SpanId`]s; the arena doubles
//! as the flat registry used for bulk scans. Lookups go through a
//! two-level ordered index: an outer map from row to an inner sub-index,
//! and inner maps from column to span id. A span is indexed under every
//! row it covers, so a query anchored at any interior row can find it
//! with a nearest-predecessor search on both levels.
//!
//! # Example
//!
//! ```ignore
//! use spangrid::SpanCollection;
//!
//! let mut spans = SpanCollection::new();
//! spans.set_span(2, 2, 3, 3)?;
//!
//! // Any cell inside the merged region resolves to it.
//! let span = spans.span_at(3, 3).unwrap();
//! assert_eq!((span.top(), span.left()), (2, 2));
//!
//! // The model grew two rows inside the region; the span absorbs them.
//! spans.update_inserted_rows(3, 4);
//! assert_eq!(spans.span(2, 2).height(), 5);
//! ```

use std::collections::{BTreeMap, HashSet};

use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, SpanError};
use crate::span::Span;

new_key_type! {
    /// Stable identifier of a span within a [`SpanCollection`].
    pub struct SpanId;
}

/// Inner level of the index: first covered column to span id, for one row.
type SubIndex = BTreeMap<usize, SpanId>;

/// Registry and two-level index of merged-cell spans.
///
/// The collection owns every span. Queries hand out borrowed views that
/// the borrow checker invalidates at the next mutating call.
///
/// All operations assume the caller serializes access; the structure
/// performs no locking and no I/O.
#[derive(Debug, Default)]
pub struct SpanCollection {
    /// Flat registry of live spans; sole owner.
    spans: SlotMap<SpanId, Span>,
    /// Outer index: row -> sub-index of spans covering that row.
    index: BTreeMap<usize, SubIndex>,
}

impl SpanCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            spans: SlotMap::with_key(),
            index: BTreeMap::new(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns the span covering the cell `(row, column)`, if any.
    ///
    /// The lookup finds the nearest indexed row at or above the cell, then
    /// the nearest span start at or left of the cell within that row, and
    /// accepts the candidate only if its rectangle actually covers the
    /// cell. Runs in O(log n).
    pub fn span_at(&self, row: usize, column: usize) -> Option<&Span> {
        self.span_id_at(row, column).map(|id| &self.spans[id])
    }

    /// Returns the covering span's geometry, or a 1x1 placeholder at
    /// `(row, column)` when the cell is not part of any span.
    pub fn span(&self, row: usize, column: usize) -> Span {
        match self.span_at(row, column) {
            Some(span) => *span,
            None => Span::new(row, column, 1, 1),
        }
    }

    /// Number of rows spanned by the merged region covering `(row, column)`;
    /// 1 for an unspanned cell.
    pub fn row_span(&self, row: usize, column: usize) -> usize {
        self.span(row, column).height()
    }

    /// Number of columns spanned by the merged region covering
    /// `(row, column)`; 1 for an unspanned cell.
    pub fn column_span(&self, row: usize, column: usize) -> usize {
        self.span(row, column).width()
    }

    /// Returns every span intersecting the rectangle of `row_count` rows
    /// and `column_count` columns anchored at `(row, column)`.
    ///
    /// The result is deduplicated (a span is indexed once per covered
    /// row); its order is unspecified.
    pub fn spans_in_rect(
        &self,
        row: usize,
        column: usize,
        row_count: usize,
        column_count: usize,
    ) -> Vec<&Span> {
        if row_count == 0 || column_count == 0 {
            return Vec::new();
        }
        let last_row = row + row_count - 1;
        let last_column = column + column_count - 1;

        let mut seen: HashSet<SpanId> = HashSet::new();
        let mut result = Vec::new();
        // Walk rows downward from the far edge; the final bucket visited is
        // the nearest one at or above the rectangle, which lists any span
        // reaching into it from above. Columns are walked the same way.
        for (&bucket_row, bucket) in self.index.range(..=last_row).rev() {
            for (&bucket_column, &id) in bucket.range(..=last_column).rev() {
                let span = &self.spans[id];
                if span.bottom() >= row && span.right() >= column && seen.insert(id) {
                    result.push(span);
                }
                if bucket_column <= column {
                    break;
                }
            }
            if bucket_row <= row {
                break;
            }
        }
        result
    }

    /// Iterates over all live spans, in no particular order.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.spans.values()
    }

    /// Returns the span for a previously returned id, if still live.
    pub fn get(&self, id: SpanId) -> Option<&Span> {
        self.spans.get(id)
    }

    /// Number of live spans.
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    /// Returns `true` if no spans are registered.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    // =========================================================================
    // Span registration
    // =========================================================================

    /// Declares the cells covered by `row_span` rows and `column_span`
    /// columns starting at `(row, column)` to be one merged region.
    ///
    /// Validation happens here and only here:
    /// - zero extents are rejected;
    /// - if a span already starts at `(row, column)`, its extent is
    ///   updated instead (a 1x1 request dissolves it);
    /// - if the cell is covered by a span starting elsewhere, the call is
    ///   rejected and nothing changes;
    /// - a 1x1 request on an unspanned cell stores nothing.
    ///
    /// Rejections are also reported on the `spangrid::spans` log target.
    pub fn set_span(
        &mut self,
        row: usize,
        column: usize,
        row_span: usize,
        column_span: usize,
    ) -> Result<()> {
        if row_span == 0 || column_span == 0 {
            tracing::warn!(
                target: "spangrid::spans",
                "set_span: invalid span given: ({}, {}, {}, {})",
                row, column, row_span, column_span
            );
            return Err(SpanError::InvalidSpan {
                row,
                column,
                row_span,
                column_span,
            });
        }

        if let Some(id) = self.span_id_at(row, column) {
            let existing = self.spans[id];
            if existing.top() != row || existing.left() != column {
                tracing::warn!(
                    target: "spangrid::spans",
                    "set_span: span at ({}, {}) cannot overlap",
                    row, column
                );
                return Err(SpanError::Overlap { row, column });
            }
            // A 1x1 span is no span at all; normalize to the degenerate
            // form so update_span prunes it.
            let (height, width) = if row_span == 1 && column_span == 1 {
                (0, 0)
            } else {
                (row_span, column_span)
            };
            self.update_span(id, height, width);
            return Ok(());
        }

        if row_span == 1 && column_span == 1 {
            tracing::debug!(
                target: "spangrid::spans",
                "set_span: single cell span at ({}, {}) is not stored",
                row, column
            );
            return Ok(());
        }

        self.add_span(Span::new(row, column, row_span, column_span));
        Ok(())
    }

    /// Registers a new span and indexes it under every row it covers.
    ///
    /// The span must not overlap any registered span; [`set_span`] is the
    /// validated entry point. Returns the span's stable id.
    ///
    /// [`set_span`]: Self::set_span
    pub fn add_span(&mut self, span: Span) -> SpanId {
        debug_assert!(span.height() >= 1 && span.width() >= 1);
        let id = self.spans.insert(span);
        for row in span.top()..=span.bottom() {
            self.bucket_mut(row).insert(span.left(), id);
        }
        id
    }

    /// Changes the extent of an existing span, keeping its anchor.
    ///
    /// Newly covered rows gain an index entry; rows no longer covered
    /// lose theirs (emptied buckets are dropped). Width changes need no
    /// index work: the column key is always the span's left edge.
    ///
    /// Passing `(0, 0)` removes the span. Callers wanting a 1x1 result
    /// must pass `(0, 0)` instead; single-cell spans are never stored.
    pub fn update_span(&mut self, id: SpanId, row_span: usize, column_span: usize) {
        let old = self.spans[id];
        {
            let span = &mut self.spans[id];
            span.height = row_span;
            span.width = column_span;
        }

        if row_span > old.height() {
            for row in old.top() + old.height()..old.top() + row_span {
                self.bucket_mut(row).insert(old.left(), id);
            }
        } else if row_span < old.height() {
            for row in old.top() + row_span..old.top() + old.height() {
                let emptied = match self.index.get_mut(&row) {
                    Some(bucket) => {
                        bucket.remove(&old.left());
                        bucket.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    self.index.remove(&row);
                }
            }
        }

        if self.spans[id].is_degenerate() {
            self.spans.remove(id);
        }
    }

    /// Removes all spans and index state.
    pub fn clear(&mut self) {
        self.spans.clear();
        self.index.clear();
    }

    // =========================================================================
    // Row insertion / removal
    // =========================================================================

    /// Adjusts all spans after rows `start..=end` were inserted into the
    /// hosting model.
    ///
    /// Spans ending before `start` are untouched; spans starting at or
    /// after it shift whole; a span straddling the splice absorbs the new
    /// rows and grows.
    pub fn update_inserted_rows(&mut self, start: usize, end: usize) {
        debug_assert!(start <= end);
        if self.spans.is_empty() {
            return;
        }
        let count = end - start + 1;

        for (_, span) in self.spans.iter_mut() {
            if span.bottom() < start {
                continue;
            }
            if span.top() >= start {
                span.top += count;
            } else {
                span.height += count;
            }
        }

        let moved = self.index.split_off(&start);
        for (row, bucket) in moved {
            self.index.insert(row + count, bucket);
        }
    }

    /// Adjusts all spans after columns `start..=end` were inserted into
    /// the hosting model. Mirrors [`update_inserted_rows`].
    ///
    /// [`update_inserted_rows`]: Self::update_inserted_rows
    pub fn update_inserted_columns(&mut self, start: usize, end: usize) {
        debug_assert!(start <= end);
        if self.spans.is_empty() {
            return;
        }
        let count = end - start + 1;

        for (_, span) in self.spans.iter_mut() {
            if span.right() < start {
                continue;
            }
            if span.left() >= start {
                span.left += count;
            } else {
                span.width += count;
            }
        }

        for bucket in self.index.values_mut() {
            let moved = bucket.split_off(&start);
            for (column, id) in moved {
                bucket.insert(column + count, id);
            }
        }
    }

    /// Adjusts all spans after rows `start..=end` were removed from the
    /// hosting model.
    ///
    /// Span extents are clamped or shifted; spans falling entirely inside
    /// the removed range are deleted, as is any span reduced to a single
    /// cell. The index is then rewritten: buckets before the cut lose
    /// entries for swept spans, buckets inside the removed range collapse
    /// into one bucket at `start`, and buckets past the cut shift up,
    /// merging into the collapsed bucket at the boundary.
    pub fn update_removed_rows(&mut self, start: usize, end: usize) {
        debug_assert!(start <= end);
        if self.spans.is_empty() {
            return;
        }
        let count = end - start + 1;

        let mut swept = Vec::new();
        for (id, span) in self.spans.iter_mut() {
            if span.bottom() < start {
                continue;
            }
            if span.top() < start {
                if span.bottom() <= end {
                    span.height = start - span.top();
                } else {
                    span.height -= count;
                }
            } else if span.bottom() > end {
                let bottom = span.bottom() - count;
                if span.top() <= end {
                    span.top = start;
                } else {
                    span.top -= count;
                }
                span.height = bottom - span.top() + 1;
            } else {
                swept.push(id);
                continue;
            }
            // Spans must cover more than one cell.
            if span.is_unit() {
                swept.push(id);
            }
        }
        for id in &swept {
            self.spans.remove(*id);
        }

        if self.spans.is_empty() {
            self.index.clear();
            return;
        }

        let tail = self.index.split_off(&start);

        // Rows before the cut keep their keys and anchors; only swept
        // entries go, and only emptied buckets are dropped.
        let spans = &self.spans;
        let mut dead_rows = Vec::new();
        for (&row, bucket) in self.index.iter_mut() {
            clean_sub_index(spans, bucket, row, false);
            if bucket.is_empty() {
                dead_rows.push(row);
            }
        }
        for row in dead_rows {
            self.index.remove(&row);
        }

        let mut merged = SubIndex::new();
        for (row, bucket) in tail {
            if row <= end {
                // Surviving entries of a removed row belong at `start` if
                // their span still reaches it (re-anchored spans now start
                // there; straddling spans cross it).
                for (column, id) in bucket {
                    if let Some(span) = self.spans.get(id) {
                        if span.top() <= start && span.bottom() >= start {
                            merged.insert(column, id);
                        }
                    }
                }
            } else {
                let target = row - count;
                let mut entries = bucket;
                let spans = &self.spans;
                entries.retain(|_, id| spans.contains_key(*id));
                if entries.is_empty() {
                    continue;
                }
                if target == start {
                    merged.extend(entries);
                } else {
                    self.index.insert(target, entries);
                }
            }
        }
        if !merged.is_empty() {
            self.index.insert(start, merged);
        }
    }

    /// Adjusts all spans after columns `start..=end` were removed from
    /// the hosting model.
    ///
    /// Extent handling mirrors [`update_removed_rows`]. The outer index
    /// keeps its row keys; each sub-index is cleaned instead: entries for
    /// swept spans go, entries whose span's left edge shifted are
    /// re-keyed, and a bucket in which no surviving span starts is
    /// dropped entirely.
    ///
    /// [`update_removed_rows`]: Self::update_removed_rows
    pub fn update_removed_columns(&mut self, start: usize, end: usize) {
        debug_assert!(start <= end);
        if self.spans.is_empty() {
            return;
        }
        let count = end - start + 1;

        let mut swept = Vec::new();
        for (id, span) in self.spans.iter_mut() {
            if span.right() < start {
                continue;
            }
            if span.left() < start {
                if span.right() <= end {
                    span.width = start - span.left();
                } else {
                    span.width -= count;
                }
            } else if span.right() > end {
                let right = span.right() - count;
                if span.left() <= end {
                    span.left = start;
                } else {
                    span.left -= count;
                }
                span.width = right - span.left() + 1;
            } else {
                swept.push(id);
                continue;
            }
            if span.is_unit() {
                swept.push(id);
            }
        }
        for id in &swept {
            self.spans.remove(*id);
        }

        if self.spans.is_empty() {
            self.index.clear();
            return;
        }

        let spans = &self.spans;
        let mut dead_rows = Vec::new();
        for (&row, bucket) in self.index.iter_mut() {
            if clean_sub_index(spans, bucket, row, true) {
                dead_rows.push(row);
            }
        }
        for row in dead_rows {
            self.index.remove(&row);
        }
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Verifies the structural invariants. Intended for tests and
    /// debugging; every public operation must leave this holding.
    ///
    /// Checks that every index entry references a live span which covers
    /// the bucket's row and is keyed by its left edge, and that every
    /// registered span has positive extent, is not 1x1, and is found by
    /// [`span_at`] from every cell of its rectangle.
    ///
    /// [`span_at`]: Self::span_at
    pub fn check_consistency(&self) -> bool {
        for (&row, bucket) in &self.index {
            for (&column, &id) in bucket {
                let span = match self.spans.get(id) {
                    Some(span) => span,
                    None => return false,
                };
                if span.height() == 0 || span.width() == 0 {
                    return false;
                }
                if span.left() != column || span.top() > row || span.bottom() < row {
                    return false;
                }
            }
        }
        for (id, span) in self.spans.iter() {
            if span.height() == 0 || span.width() == 0 || span.is_unit() {
                return false;
            }
            for row in span.top()..=span.bottom() {
                for column in span.left()..=span.right() {
                    if self.span_id_at(row, column) != Some(id) {
                        return false;
                    }
                }
            }
        }
        true
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Nearest-predecessor lookup on both index levels.
    fn span_id_at(&self, row: usize, column: usize) -> Option<SpanId> {
        let (_, bucket) = self.index.range(..=row).next_back()?;
        let (_, &id) = bucket.range(..=column).next_back()?;
        let span = &self.spans[id];
        if span.bottom() >= row && span.right() >= column {
            Some(id)
        } else {
            None
        }
    }

    /// Returns the sub-index for `row`, creating it if missing.
    ///
    /// A freshly created bucket is seeded from the nearest bucket below
    /// with every span still reaching `row`; without this, a lookup
    /// anchored at the new row would miss spans crossing it.
    fn bucket_mut(&mut self, row: usize) -> &mut SubIndex {
        if !self.index.contains_key(&row) {
            let mut bucket = SubIndex::new();
            if let Some((_, below)) = self.index.range(..row).next_back() {
                for (&column, &id) in below {
                    if self.spans[id].bottom() >= row {
                        bucket.insert(column, id);
                    }
                }
            }
            self.index.insert(row, bucket);
        }
        self.index
            .get_mut(&row)
            .expect("sub-index bucket exists after insertion")
    }
}

/// Cleans one sub-index after a removal: entries for swept spans are
/// erased and, when `update_anchor` is set (column removal shifts left
/// edges), entries whose span's left edge no longer matches their key are
/// re-inserted under the corrected column. Returns `true` when no
/// surviving entry's span starts at `row`, in which case the caller may
/// drop the bucket.
fn clean_sub_index(
    spans: &SlotMap<SpanId, Span>,
    bucket: &mut SubIndex,
    row: usize,
    update_anchor: bool,
) -> bool {
    bucket.retain(|_, id| spans.contains_key(*id));
    if update_anchor {
        let moved: Vec<(usize, SpanId)> = bucket
            .iter()
            .filter(|&(&column, &id)| spans[id].left() != column)
            .map(|(&column, &id)| (column, id))
            .collect();
        // Erase all stale keys before re-inserting: a corrected key may
        // collide with another entry's stale one.
        for (column, _) in &moved {
            bucket.remove(column);
        }
        for (_, id) in &moved {
            bucket.insert(spans[*id].left(), *id);
        }
    }
    !bucket.values().any(|&id| spans[id].top() == row)
}
