use core::{fmt, str::FromStr};

use thiserror::Error;

/// Separator between the three clocks in the textual form.
pub const DELIM: char = '/';
/// Requests a dump of the frequency table instead of a frequency.
pub const LIST_SENTINEL: &str = "list";
/// Per-component slack in MHz when comparing entries.
pub const TOLERANCE_MHZ: f32 = 2.0;
/// Exclusive upper bound of a parsed clock, in MHz.
pub const MAX_MHZ: f32 = 1000.0;

/// FSB, SDRAM and PCI clocks in MHz.
///
/// Equality is approximate: two entries are equal when every component lies within
/// [`TOLERANCE_MHZ`] of the other's. That relation is not transitive, so there is no `Eq`.
#[derive(Clone, Copy, Debug)]
pub struct FreqEntry {
    fsb: f32,
    sdram: f32,
    pci: f32,
}

impl FreqEntry {
    pub const fn new(fsb: f32, sdram: f32, pci: f32) -> Self {
        Self { fsb, sdram, pci }
    }

    pub fn fsb(&self) -> f32 {
        self.fsb
    }

    pub fn sdram(&self) -> f32 {
        self.sdram
    }

    pub fn pci(&self) -> f32 {
        self.pci
    }

    /// FSB to PCI ratio. Display only.
    pub fn divider(&self) -> f32 {
        self.fsb / self.pci
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() <= TOLERANCE_MHZ
}

impl PartialEq for FreqEntry {
    fn eq(&self, other: &Self) -> bool {
        close(self.fsb, other.fsb) && close(self.sdram, other.sdram) && close(self.pci, other.pci)
    }
}

impl fmt::Display for FreqEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:5.1}{DELIM}{:5.1}{DELIM}{:4.1} (Div:{:.1})",
            self.fsb,
            self.sdram,
            self.pci,
            self.divider()
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFreqError {
    #[error("expected <FSB>/<SDRAM>/<PCI>, too few elements")]
    TooFew,
    #[error("expected <FSB>/<SDRAM>/<PCI>, too many elements")]
    TooMany,
    #[error("invalid frequency '{0}'")]
    InvalidNumber(String),
    #[error("frequency '{0}' out of range (0, 1000) MHz")]
    OutOfRange(String),
}

fn parse_component(text: &str) -> Result<f32, ParseFreqError> {
    let text = text.trim();
    let value: f32 = text
        .parse()
        .map_err(|_| ParseFreqError::InvalidNumber(text.to_owned()))?;
    if !(value > 0.0 && value < MAX_MHZ) {
        return Err(ParseFreqError::OutOfRange(text.to_owned()));
    }
    Ok(value)
}

impl FromStr for FreqEntry {
    type Err = ParseFreqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(DELIM).collect();
        match parts.len() {
            n if n < 3 => Err(ParseFreqError::TooFew),
            n if n > 3 => Err(ParseFreqError::TooMany),
            _ => Ok(Self::new(
                parse_component(parts[0])?,
                parse_component(parts[1])?,
                parse_component(parts[2])?,
            )),
        }
    }
}

/// What the user asked for on the command line: a frequency to program, or the table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FreqRequest {
    List,
    Set(FreqEntry),
}

impl FromStr for FreqRequest {
    type Err = ParseFreqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(LIST_SENTINEL) {
            return Ok(FreqRequest::List);
        }
        s.parse().map(FreqRequest::Set)
    }
}

impl fmt::Display for FreqRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreqRequest::List => f.write_str(LIST_SENTINEL),
            FreqRequest::Set(entry) => entry.fmt(f),
        }
    }
}
