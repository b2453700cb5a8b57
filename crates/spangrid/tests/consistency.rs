//! Randomized cross-check of the span index against a brute-force model.
//!
//! The reference keeps a flat list of span rectangles and answers every
//! query by linear scan; the collection must agree with it cell by cell
//! after every operation, and its internal index must stay consistent.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spangrid::{Span, SpanCollection};

const GRID: usize = 24;

/// Brute-force model of the grid: no index, just rectangles.
#[derive(Default)]
struct ReferenceGrid {
    spans: Vec<Span>,
}

impl ReferenceGrid {
    fn covering(&self, row: usize, column: usize) -> Option<Span> {
        self.spans.iter().copied().find(|s| s.contains(row, column))
    }

    fn set_span(&mut self, row: usize, column: usize, row_span: usize, column_span: usize) {
        self.spans
            .retain(|s| (s.top(), s.left()) != (row, column));
        if row_span == 1 && column_span == 1 {
            return;
        }
        self.spans
            .push(Span::new(row, column, row_span, column_span));
    }

    fn insert_rows(&mut self, start: usize, end: usize) {
        let count = end - start + 1;
        for s in &mut self.spans {
            if s.bottom() < start {
                continue;
            }
            *s = if s.top() >= start {
                Span::new(s.top() + count, s.left(), s.height(), s.width())
            } else {
                Span::new(s.top(), s.left(), s.height() + count, s.width())
            };
        }
    }

    fn insert_columns(&mut self, start: usize, end: usize) {
        let count = end - start + 1;
        for s in &mut self.spans {
            if s.right() < start {
                continue;
            }
            *s = if s.left() >= start {
                Span::new(s.top(), s.left() + count, s.height(), s.width())
            } else {
                Span::new(s.top(), s.left(), s.height(), s.width() + count)
            };
        }
    }

    fn remove_rows(&mut self, start: usize, end: usize) {
        let count = end - start + 1;
        let mut kept = Vec::new();
        for s in self.spans.drain(..) {
            let (top, height) = if s.bottom() < start {
                (s.top(), s.height())
            } else if s.top() < start {
                if s.bottom() <= end {
                    (s.top(), start - s.top())
                } else {
                    (s.top(), s.height() - count)
                }
            } else if s.bottom() > end {
                let bottom = s.bottom() - count;
                let top = if s.top() <= end { start } else { s.top() - count };
                (top, bottom - top + 1)
            } else {
                continue;
            };
            if height == 1 && s.width() == 1 {
                continue;
            }
            kept.push(Span::new(top, s.left(), height, s.width()));
        }
        self.spans = kept;
    }

    fn remove_columns(&mut self, start: usize, end: usize) {
        let count = end - start + 1;
        let mut kept = Vec::new();
        for s in self.spans.drain(..) {
            let (left, width) = if s.right() < start {
                (s.left(), s.width())
            } else if s.left() < start {
                if s.right() <= end {
                    (s.left(), start - s.left())
                } else {
                    (s.left(), s.width() - count)
                }
            } else if s.right() > end {
                let right = s.right() - count;
                let left = if s.left() <= end { start } else { s.left() - count };
                (left, right - left + 1)
            } else {
                continue;
            };
            if s.height() == 1 && width == 1 {
                continue;
            }
            kept.push(Span::new(s.top(), left, s.height(), width));
        }
        self.spans = kept;
    }

    /// Anchors of all spans intersecting the given rectangle.
    fn intersecting(
        &self,
        row: usize,
        column: usize,
        row_count: usize,
        column_count: usize,
    ) -> std::collections::HashSet<(usize, usize)> {
        let probe = Span::new(row, column, row_count, column_count);
        self.spans
            .iter()
            .filter(|s| s.intersects(&probe))
            .map(|s| (s.top(), s.left()))
            .collect()
    }
}

/// Window large enough to cover everything the reference holds.
fn window(reference: &ReferenceGrid) -> (usize, usize) {
    let rows = reference
        .spans
        .iter()
        .map(|s| s.bottom())
        .max()
        .map_or(4, |m| m + 3);
    let columns = reference
        .spans
        .iter()
        .map(|s| s.right())
        .max()
        .map_or(4, |m| m + 3);
    (rows, columns)
}

fn verify(collection: &SpanCollection, reference: &ReferenceGrid, step: usize) {
    assert!(collection.check_consistency(), "index broken at step {step}");
    assert_eq!(
        collection.span_count(),
        reference.spans.len(),
        "span count diverged at step {step}"
    );
    let (rows, columns) = window(reference);
    for row in 0..rows {
        for column in 0..columns {
            let expected = reference.covering(row, column).map(|s| (s.top(), s.left()));
            let actual = collection
                .span_at(row, column)
                .map(|s| (s.top(), s.left()));
            assert_eq!(
                actual, expected,
                "lookup diverged at cell ({row}, {column}), step {step}"
            );
        }
    }
}

fn run_sequence(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut collection = SpanCollection::new();
    let mut reference = ReferenceGrid::default();

    for step in 0..steps {
        match rng.gen_range(0..100u32) {
            0..=54 => {
                let row = rng.gen_range(0..GRID);
                let column = rng.gen_range(0..GRID);
                let row_span = rng.gen_range(1..=4);
                let column_span = rng.gen_range(1..=4);
                match reference.covering(row, column) {
                    Some(s) if (s.top(), s.left()) != (row, column) => {
                        // Covered by a span starting elsewhere: must be
                        // rejected without touching anything.
                        assert!(
                            collection.set_span(row, column, row_span, column_span).is_err(),
                            "overlap accepted at step {step}"
                        );
                    }
                    _ => {
                        // Only apply requests whose outcome is defined:
                        // the new rectangle may not collide with any span
                        // other than the one being resized.
                        let rect = Span::new(row, column, row_span, column_span);
                        let clear = reference.spans.iter().all(|s| {
                            (s.top(), s.left()) == (row, column) || !s.intersects(&rect)
                        });
                        if clear {
                            collection
                                .set_span(row, column, row_span, column_span)
                                .unwrap();
                            reference.set_span(row, column, row_span, column_span);
                        }
                    }
                }
            }
            55..=64 => {
                let start = rng.gen_range(0..GRID);
                let end = start + rng.gen_range(0..3);
                collection.update_inserted_rows(start, end);
                reference.insert_rows(start, end);
            }
            65..=74 => {
                let start = rng.gen_range(0..GRID);
                let end = start + rng.gen_range(0..3);
                collection.update_removed_rows(start, end);
                reference.remove_rows(start, end);
            }
            75..=84 => {
                let start = rng.gen_range(0..GRID);
                let end = start + rng.gen_range(0..3);
                collection.update_inserted_columns(start, end);
                reference.insert_columns(start, end);
            }
            85..=94 => {
                let start = rng.gen_range(0..GRID);
                let end = start + rng.gen_range(0..3);
                collection.update_removed_columns(start, end);
                reference.remove_columns(start, end);
            }
            95..=97 => {
                // Dissolve a random span through the public API.
                if !reference.spans.is_empty() {
                    let pick = rng.gen_range(0..reference.spans.len());
                    let s = reference.spans[pick];
                    collection.set_span(s.top(), s.left(), 1, 1).unwrap();
                    reference.set_span(s.top(), s.left(), 1, 1);
                }
            }
            _ => {
                collection.clear();
                reference.spans.clear();
            }
        }

        verify(&collection, &reference, step);

        // Rectangle queries against the same model.
        let (rows, columns) = window(&reference);
        for _ in 0..3 {
            let row = rng.gen_range(0..rows);
            let column = rng.gen_range(0..columns);
            let row_count = rng.gen_range(1..=6);
            let column_count = rng.gen_range(1..=6);
            let expected = reference.intersecting(row, column, row_count, column_count);
            let actual: std::collections::HashSet<(usize, usize)> = collection
                .spans_in_rect(row, column, row_count, column_count)
                .into_iter()
                .map(|s| (s.top(), s.left()))
                .collect();
            assert_eq!(
                actual, expected,
                "rect query diverged at ({row}, {column}) {row_count}x{column_count}, step {step}"
            );
        }
    }
}

#[test]
fn randomized_against_reference_model() {
    for seed in [1, 7, 42, 1234] {
        run_sequence(seed, 250);
    }
}

#[test]
fn randomized_long_sequence() {
    run_sequence(987_654_321, 600);
}

#[test]
fn insertion_inside_then_removal_across_the_gap() {
    // Row insertion inside a span absorbs the new rows without indexing
    // them; a removal that later crosses the absorbed range must leave
    // every surviving cell reachable. Driven here as a fixed regression
    // on top of the randomized runs.
    let mut collection = SpanCollection::new();
    let mut reference = ReferenceGrid::default();

    collection.set_span(0, 0, 4, 2).unwrap();
    reference.set_span(0, 0, 4, 2);
    collection.update_inserted_rows(1, 3);
    reference.insert_rows(1, 3);
    collection.set_span(8, 3, 3, 3).unwrap();
    reference.set_span(8, 3, 3, 3);

    collection.update_removed_rows(2, 8);
    reference.remove_rows(2, 8);

    verify(&collection, &reference, 0);
}
