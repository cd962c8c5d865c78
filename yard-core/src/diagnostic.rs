//! Rendering of syntax failures against the source text.

use std::fmt;

/// Marker inserted into the source at the failing offset.
pub const MARKER: &str = "<!>";

/// Why a grammar rule failed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The rule needed a token but the input was exhausted.
    OutOfRange,
    UnexpectedToken,
    /// A repetition matched fewer elements than its minimum.
    RepetitionTooShort,
    NoAlternativeMatched,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::OutOfRange => "OutOfRange",
            ErrorKind::UnexpectedToken => "UnexpectedToken",
            ErrorKind::RepetitionTooShort => "RepetitionTooShort",
            ErrorKind::NoAlternativeMatched => "NoAlternativeMatched",
        };
        f.write_str(name)
    }
}

/// A syntax failure located in, and rendered against, its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub offset: usize,
    /// `Kind: text-before<!>text-after`
    pub rendered: String,
}

impl Diagnostic {
    pub fn new(source: &str, kind: ErrorKind, offset: usize) -> Self {
        let mut split = offset.min(source.len());
        while !source.is_char_boundary(split) {
            split -= 1;
        }
        let (before, after) = source.split_at(split);
        Diagnostic {
            kind,
            offset,
            rendered: format!("{kind}: {before}{MARKER}{after}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
