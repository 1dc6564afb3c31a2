//! Per-module display colors
//!
//! Every logger gets a random color at creation and keeps it for the life
//! of the instance, so one module's lines stay visually grouped. The
//! leading hex digit is capped at 5 to keep colors away from near-white
//! tones that wash out on light terminal themes.

use colored::{ColoredString, Colorize};
use rand::Rng;

const FIRST_DIGITS: &[u8] = b"012345";
const HEX_DIGITS: &[u8] = b"0123456789ABCDEF";

/// RGB display color assigned to a logger instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color {
    hex: String,
}

impl Color {
    /// Generate a random color. The first digit is drawn from 0-5, the
    /// remaining five from the full hex alphabet. Draws again if the
    /// result is ever malformed.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let mut hex = String::with_capacity(6);
            hex.push(FIRST_DIGITS[rng.gen_range(0..FIRST_DIGITS.len())] as char);
            for _ in 0..5 {
                hex.push(HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char);
            }
            if Self::is_valid(&hex) {
                return Color { hex };
            }
        }
    }

    fn is_valid(hex: &str) -> bool {
        hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Hex form without a leading '#', e.g. "3FA0C2"
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Red, green and blue components
    pub fn rgb(&self) -> (u8, u8, u8) {
        let byte = |i| u8::from_str_radix(&self.hex[i..i + 2], 16).unwrap_or(0);
        (byte(0), byte(2), byte(4))
    }

    /// Paint text in this color for terminal output
    pub fn paint(&self, text: &str) -> ColoredString {
        let (r, g, b) = self.rgb();
        text.truecolor(r, g, b)
    }
}
