//! Character display sink
//!
//! A small row/column text display (4 rows × 16 columns on the bench
//! board, 1-based). The core only ever writes to it.

/// Write-only character display.
pub trait DisplaySink {
    /// Draw `text` starting at (`row`, `column`).
    fn show_string(&mut self, row: u8, column: u8, text: &str);

    /// Draw `value` as exactly `digits` zero-padded decimal digits.
    fn show_num(&mut self, row: u8, column: u8, value: u32, digits: u8);
}
