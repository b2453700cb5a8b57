//! Merged-cell bookkeeping walkthrough.
//!
//! Builds a small grid with merged regions, splices rows and columns the
//! way a hosting table model would, and prints the resulting layout.
//!
//! Run with: cargo run -p spangrid --example merged_cells

use spangrid::SpanCollection;

/// Prints the grid with `#` at span anchors and `+` in covered cells.
fn print_grid(spans: &SpanCollection, rows: usize, columns: usize) {
    for row in 0..rows {
        let mut line = String::new();
        for column in 0..columns {
            let cell = match spans.span_at(row, column) {
                Some(span) if (span.top(), span.left()) == (row, column) => '#',
                Some(_) => '+',
                None => '.',
            };
            line.push(cell);
            line.push(' ');
        }
        println!("{line}");
    }
    println!();
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut spans = SpanCollection::new();

    spans.set_span(1, 1, 2, 3).expect("valid span");
    spans.set_span(4, 0, 3, 2).expect("valid span");
    spans.set_span(5, 4, 2, 2).expect("valid span");

    println!("initial layout:");
    print_grid(&spans, 8, 7);

    // Overlapping an existing region is rejected and logged.
    if let Err(err) = spans.set_span(2, 2, 2, 2) {
        println!("rejected: {err}\n");
    }

    println!("after inserting two rows at row 5:");
    spans.update_inserted_rows(5, 6);
    print_grid(&spans, 10, 7);

    println!("after removing columns 1..=2:");
    spans.update_removed_columns(1, 2);
    print_grid(&spans, 10, 5);

    println!("spans intersecting the top-left 4x4 block:");
    for span in spans.spans_in_rect(0, 0, 4, 4) {
        println!(
            "  ({}, {}) {}x{}",
            span.top(),
            span.left(),
            span.height(),
            span.width()
        );
    }
}
