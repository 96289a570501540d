//! LCD status and unit indicators.
//!
//! Symbols live in the low nibble of bytes 1, 2, 11, 12, 13 and 14. Within a
//! nibble, bit `j` lights symbol `3 - j` of that byte's list in
//! [`SYMBOL_LAYOUT`].

use std::fmt;

use serde::Serialize;

/// One indicator on the meter's LCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Symbol {
    Auto,
    Dc,
    Ac,
    Rel,
    Beep,
    Battery,
    Loz,
    BMinus,
    Hold,
    Dbm,
    Mega,
    Kilo,
    Crest,
    Ohm,
    Hz,
    Nano,
    Max,
    Farad,
    Micro,
    Milli,
    Min,
    Volt,
    Ampere,
    Scale,
}

/// Byte offset and the four symbols it carries, most significant bit first.
pub const SYMBOL_LAYOUT: [(usize, [Symbol; 4]); 6] = [
    (1, [Symbol::Auto, Symbol::Dc, Symbol::Ac, Symbol::Rel]),
    (2, [Symbol::Beep, Symbol::Battery, Symbol::Loz, Symbol::BMinus]),
    (11, [Symbol::Hold, Symbol::Dbm, Symbol::Mega, Symbol::Kilo]),
    (12, [Symbol::Crest, Symbol::Ohm, Symbol::Hz, Symbol::Nano]),
    (13, [Symbol::Max, Symbol::Farad, Symbol::Micro, Symbol::Milli]),
    (14, [Symbol::Min, Symbol::Volt, Symbol::Ampere, Symbol::Scale]),
];

impl Symbol {
    /// Every symbol, in declaration order.
    pub const ALL: [Symbol; 24] = [
        Symbol::Auto,
        Symbol::Dc,
        Symbol::Ac,
        Symbol::Rel,
        Symbol::Beep,
        Symbol::Battery,
        Symbol::Loz,
        Symbol::BMinus,
        Symbol::Hold,
        Symbol::Dbm,
        Symbol::Mega,
        Symbol::Kilo,
        Symbol::Crest,
        Symbol::Ohm,
        Symbol::Hz,
        Symbol::Nano,
        Symbol::Max,
        Symbol::Farad,
        Symbol::Micro,
        Symbol::Milli,
        Symbol::Min,
        Symbol::Volt,
        Symbol::Ampere,
        Symbol::Scale,
    ];

    /// Label printed on the LCD next to the indicator.
    pub fn name(self) -> &'static str {
        match self {
            Symbol::Auto => "AUTO",
            Symbol::Dc => "DC",
            Symbol::Ac => "AC",
            Symbol::Rel => "REL",
            Symbol::Beep => "BEEP",
            Symbol::Battery => "BATTERY",
            Symbol::Loz => "LOZ",
            Symbol::BMinus => "BMINUS",
            Symbol::Hold => "HOLD",
            Symbol::Dbm => "DBM",
            Symbol::Mega => "MEGA",
            Symbol::Kilo => "KILO",
            Symbol::Crest => "CREST",
            Symbol::Ohm => "OHM",
            Symbol::Hz => "HZ",
            Symbol::Nano => "NANO",
            Symbol::Max => "MAX",
            Symbol::Farad => "FARAD",
            Symbol::Micro => "MICRO",
            Symbol::Milli => "MILLI",
            Symbol::Min => "MIN",
            Symbol::Volt => "VOLT",
            Symbol::Ampere => "AMPERE",
            Symbol::Scale => "SCALE",
        }
    }

    const fn bit(self) -> u32 {
        1 << self as u32
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`Symbol`]s, stored as a bitmask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SymbolSet(u32);

impl SymbolSet {
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.0 |= symbol.bit();
    }

    /// Remove `symbol`, returning whether it was present.
    pub fn remove(&mut self, symbol: Symbol) -> bool {
        let present = self.contains(symbol);
        self.0 &= !symbol.bit();
        present
    }

    pub const fn contains(&self, symbol: Symbol) -> bool {
        self.0 & symbol.bit() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// True if the set holds exactly `symbol` and nothing else.
    pub const fn is_only(&self, symbol: Symbol) -> bool {
        self.0 == symbol.bit()
    }

    /// Symbols in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        Symbol::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut set = SymbolSet::new();
        for symbol in iter {
            set.insert(symbol);
        }
        set
    }
}

impl fmt::Debug for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, symbol) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(symbol.name())?;
        }
        f.write_str("}")
    }
}

impl Serialize for SymbolSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
