use serde::{Deserialize, Serialize};
use tracing::warn;

/// Sentinel returned when there are no digits to decode.
pub const BCD_ERROR_VALUE: u32 = u32::MAX;

/// Digit order of a score stored in RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endianness {
    Big,
    Little,
}

/// Where and how the game keeps its score in work RAM: one binary-coded
/// decimal digit per byte, `width` bytes starting at `offset`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreLocation {
    pub offset: usize,
    pub width: usize,
    pub endianness: Endianness,
}

impl ScoreLocation {
    /// The highest score this location can express. A zero-width location
    /// yields 0, which downstream normalisation treats as the +infinity
    /// degenerate case rather than an error.
    pub fn max_score(&self) -> u32 {
        match 10u32.checked_pow(self.width as u32) {
            Some(power) => power - 1,
            None => u32::MAX,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0
    }
}

impl Default for ScoreLocation {
    fn default() -> Self {
        ScoreLocation {
            offset: 0,
            width: 0,
            endianness: Endianness::Big,
        }
    }
}

/// Decode a binary-coded-decimal number holding one digit per byte. The digit
/// nearest the start of iteration order is the ones column; `Big` iterates
/// forward, `Little` backward. Empty input decodes to the error sentinel.
pub fn bcd_to_int(bytes: &[u8], endianness: Endianness) -> u32 {
    if bytes.is_empty() {
        return BCD_ERROR_VALUE;
    }

    let mut output: u32 = 0;
    let mut column: u32 = 1;

    for i in 0..bytes.len() {
        let digit = match endianness {
            Endianness::Big => bytes[i],
            Endianness::Little => bytes[bytes.len() - 1 - i],
        };

        output = output.wrapping_add(digit as u32 * column);
        column = column.wrapping_mul(10);
    }

    output
}

/// Read the current score out of a RAM snapshot. A location that falls
/// outside the snapshot (or has zero width) reads as 0 with a diagnostic;
/// the score read itself must never fail.
pub fn read_score(ram: &[u8], location: &ScoreLocation) -> u32 {
    let end = match location.offset.checked_add(location.width) {
        Some(end) if end <= ram.len() => end,
        _ => {
            warn!(
                offset = location.offset,
                width = location.width,
                ram_len = ram.len(),
                "score location outside RAM; reading 0"
            );
            return 0;
        }
    };

    if location.width == 0 {
        return 0;
    }

    bcd_to_int(&ram[location.offset..end], location.endianness)
}
