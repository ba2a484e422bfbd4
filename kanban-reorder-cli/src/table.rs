//! Terminal-aware table output

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

/// A table sized to the terminal, or 120 columns when not on a TTY.
pub fn new_table() -> Table {
    let width = crossterm::terminal::size()
        .map(|(w, _)| w)
        .unwrap_or(120);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_width(width);
    table
}

/// Positions print compactly but never lose digits that distinguish neighbours.
pub fn format_position(position: f64) -> String {
    if position.fract() == 0.0 && position.abs() < 1e15 {
        format!("{position:.0}")
    } else {
        format!("{position}")
    }
}
