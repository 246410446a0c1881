/// Static state grid used to seat one small multiple per state.
///
/// Each US state (plus DC) gets one cell in an 8-row by 11-column tile grid
/// that approximates its real position on the map. The table is a fixed
/// seating chart; nothing here computes geometry.

// ---------------------------------------------------------------------------
// Grid cells
// ---------------------------------------------------------------------------

/// One state's seat in the grid. Rows and columns are zero-based, row 0 at
/// the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCell {
    /// Two-letter USPS code, also the `stateCd` query value.
    pub code: &'static str,
    pub row: u32,
    pub col: u32,
}

const fn cell(code: &'static str, row: u32, col: u32) -> StateCell {
    StateCell { code, row, col }
}

pub static STATE_GRID: &[StateCell] = &[
    cell("AK", 0, 0),
    cell("ME", 0, 10),
    cell("VT", 1, 9),
    cell("NH", 1, 10),
    cell("WA", 2, 0),
    cell("ID", 2, 1),
    cell("MT", 2, 2),
    cell("ND", 2, 3),
    cell("MN", 2, 4),
    cell("IL", 2, 5),
    cell("WI", 2, 6),
    cell("MI", 2, 7),
    cell("NY", 2, 8),
    cell("RI", 2, 9),
    cell("MA", 2, 10),
    cell("OR", 3, 0),
    cell("NV", 3, 1),
    cell("WY", 3, 2),
    cell("SD", 3, 3),
    cell("IA", 3, 4),
    cell("IN", 3, 5),
    cell("OH", 3, 6),
    cell("PA", 3, 7),
    cell("NJ", 3, 8),
    cell("CT", 3, 9),
    cell("CA", 4, 0),
    cell("UT", 4, 1),
    cell("CO", 4, 2),
    cell("NE", 4, 3),
    cell("MO", 4, 4),
    cell("KY", 4, 5),
    cell("WV", 4, 6),
    cell("VA", 4, 7),
    cell("MD", 4, 8),
    cell("DE", 4, 9),
    cell("AZ", 5, 1),
    cell("NM", 5, 2),
    cell("KS", 5, 3),
    cell("AR", 5, 4),
    cell("TN", 5, 5),
    cell("NC", 5, 6),
    cell("SC", 5, 7),
    cell("DC", 5, 8),
    cell("OK", 6, 3),
    cell("LA", 6, 4),
    cell("MS", 6, 5),
    cell("AL", 6, 6),
    cell("GA", 6, 7),
    cell("HI", 7, 0),
    cell("TX", 7, 3),
    cell("FL", 7, 8),
];

/// Looks up a state's cell by its two-letter code (case-insensitive).
pub fn find_state(code: &str) -> Option<&'static StateCell> {
    STATE_GRID.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

/// Returns `(rows, cols)` needed to hold every cell.
pub fn grid_dimensions() -> (u32, u32) {
    let rows = STATE_GRID.iter().map(|c| c.row).max().map_or(0, |r| r + 1);
    let cols = STATE_GRID.iter().map(|c| c.col).max().map_or(0, |c| c + 1);
    (rows, cols)
}
