use std::fmt;

use chrono::{DateTime, Local};

use crate::error::{FrameError, Result};
use crate::symbol::{SymbolSet, SYMBOL_LAYOUT};

/// Every frame is exactly 15 bytes.
pub const FRAME_LEN: usize = 15;

/// Value of byte 0 of every frame.
pub const START_MARKER: u8 = 0b0000_0010;

/// Number of 7-segment digits on the LCD.
pub const DIGIT_COUNT: usize = 4;

/// Number of decimal points (one after each of the first three digits).
pub const DOT_COUNT: usize = 3;

const FIRST_DIGIT_BYTE: usize = 3;

/// The lit segments of one 7-segment digit.
///
/// ```text
///  AAA
/// F   B
///  GGG
/// E   C
///  DDD
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Segments(u8);

impl Segments {
    pub const A: u8 = 1 << 6;
    pub const B: u8 = 1 << 5;
    pub const C: u8 = 1 << 4;
    pub const D: u8 = 1 << 3;
    pub const E: u8 = 1 << 2;
    pub const F: u8 = 1 << 1;
    pub const G: u8 = 1 << 0;

    /// Build from a mask of the segment constants above.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x7f)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Read digit `position` (0 = leftmost) from its two bytes.
    fn read(raw: &[u8; FRAME_LEN], position: usize) -> Self {
        let hi = raw[FIRST_DIGIT_BYTE + 2 * position];
        let lo = raw[FIRST_DIGIT_BYTE + 2 * position + 1];
        let lit = |byte: u8, mask: u8, segment: u8| if byte & mask != 0 { segment } else { 0 };
        Self(
            lit(hi, 1 << 3, Self::A)
                | lit(lo, 1 << 3, Self::B)
                | lit(lo, 1 << 1, Self::C)
                | lit(lo, 1, Self::D)
                | lit(hi, 1 << 1, Self::E)
                | lit(hi, 1 << 2, Self::F)
                | lit(lo, 1 << 2, Self::G),
        )
    }

    /// The character this pattern shows, if it is a known glyph.
    pub fn glyph(self) -> Option<char> {
        GLYPHS
            .iter()
            .find(|(bits, _)| *bits == self.0)
            .map(|(_, ch)| *ch)
    }
}

impl fmt::Debug for Segments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Segments({:07b})", self.0)
    }
}

const GLYPHS: [(u8, char); 20] = {
    use Segments as S;
    [
        (S::A | S::B | S::C | S::D | S::E | S::F, '0'),
        (S::B | S::C, '1'),
        (S::A | S::B | S::D | S::E | S::G, '2'),
        (S::A | S::B | S::C | S::D | S::G, '3'),
        (S::B | S::C | S::F | S::G, '4'),
        (S::A | S::C | S::D | S::F | S::G, '5'),
        (S::A | S::C | S::D | S::E | S::F | S::G, '6'),
        (S::A | S::B | S::C, '7'),
        (S::A | S::B | S::C | S::D | S::E | S::F | S::G, '8'),
        (S::A | S::B | S::C | S::D | S::F | S::G, '9'),
        (S::A | S::D | S::E | S::F, 'C'),
        (S::A | S::E | S::F | S::G, 'F'),
        (S::G, '-'),
        (0, ' '),
        (S::D | S::E | S::F, 'L'),
        (S::A | S::B | S::C | S::E | S::F | S::G, 'A'),
        (S::C | S::D | S::E, 'u'),
        (S::D | S::E | S::F | S::G, 't'),
        (S::C | S::D | S::E | S::G, 'o'),
        (S::A | S::D | S::E | S::F | S::G, 'E'),
    ]
};

/// One decoded LCD snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Digit segment patterns, left to right.
    pub digits: [Segments; DIGIT_COUNT],
    /// Decimal point after digit `i`.
    pub dots: [bool; DOT_COUNT],
    /// Leading minus sign.
    pub minus: bool,
    /// Lit status/unit indicators.
    pub symbols: SymbolSet,
    /// When the frame was decoded.
    pub timestamp: DateTime<Local>,
    /// The validated 15-byte window the frame was decoded from.
    pub raw: [u8; FRAME_LEN],
}

impl Frame {
    /// Character shown by digit `position`.
    pub fn character(&self, position: usize) -> Result<char> {
        self.digits
            .get(position)
            .and_then(|segments| segments.glyph())
            .ok_or(FrameError::UnreadableDigit { position })
    }

    /// The full display: sign, all four digits and their decimal points.
    pub fn text(&self) -> Result<String> {
        self.text_range(0, DIGIT_COUNT - 1, true, true)
    }

    /// Display text for digits `start..=end`.
    pub fn text_range(
        &self,
        start: usize,
        end: usize,
        use_dots: bool,
        use_minus: bool,
    ) -> Result<String> {
        let mut text = String::with_capacity(2 * DIGIT_COUNT + 1);
        if use_minus && self.minus {
            text.push('-');
        }
        for position in start..end {
            text.push(self.character(position)?);
            if use_dots && self.dots.get(position).copied().unwrap_or(false) {
                text.push('.');
            }
        }
        text.push(self.character(end)?);
        Ok(text)
    }

    /// Raw bytes as lowercase space-separated hex.
    pub fn raw_hex(&self) -> String {
        to_hex(&self.raw)
    }
}

/// Check that byte `i` of `window` carries index tag `i`.
///
/// The tag is the high nibble of each byte. On a mismatch at offset `i`, the
/// error's `length` is `i`: the bytes before it cannot belong to the same
/// frame as the bytes after it.
pub fn check_index_tags(window: &[u8]) -> Result<()> {
    match first_misplaced(window) {
        Some(length) => Err(FrameError::TruncatedFrame { length }),
        None if window.len() < FRAME_LEN => Err(FrameError::TruncatedFrame {
            length: window.len(),
        }),
        None => Ok(()),
    }
}

/// Offset of the first byte whose index tag is not its position.
pub(crate) fn first_misplaced(window: &[u8]) -> Option<usize> {
    window
        .iter()
        .enumerate()
        .position(|(i, byte)| usize::from(byte >> 4) != i)
}

/// Decode a validated 15-byte window.
///
/// Total: digit patterns are kept as-is and only rejected when a caller asks
/// for their characters.
pub fn decode_frame(raw: &[u8; FRAME_LEN], timestamp: DateTime<Local>) -> Frame {
    let digits = std::array::from_fn(|position| Segments::read(raw, position));
    let dots = std::array::from_fn(|position| raw[5 + 2 * position] & 1 != 0);
    let minus = raw[FIRST_DIGIT_BYTE] & 1 != 0;

    let mut symbols = SymbolSet::new();
    for (offset, layout) in SYMBOL_LAYOUT {
        for bit in 0..4 {
            if raw[offset] & (1 << bit) != 0 {
                symbols.insert(layout[3 - bit]);
            }
        }
    }

    Frame {
        digits,
        dots,
        minus,
        symbols,
        timestamp,
        raw: *raw,
    }
}

/// Parse a space-separated hex dump such as `"02 1A 20 3C ..."` into a window.
pub fn parse_hex_window(text: &str) -> Result<[u8; FRAME_LEN]> {
    let bytes = text
        .split_whitespace()
        .map(|token| {
            u8::from_str_radix(token, 16)
                .map_err(|_| FrameError::InvalidRawFrame(format!("'{token}' is not a hex byte")))
        })
        .collect::<Result<Vec<u8>>>()?;

    bytes.as_slice().try_into().map_err(|_| {
        FrameError::InvalidRawFrame(format!(
            "expected {FRAME_LEN} bytes, got {}",
            bytes.len()
        ))
    })
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
