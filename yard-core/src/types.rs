//! Primitive value kinds and function signatures.

use std::fmt;

/// The value kinds a parameter or result can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    I32,
    F32,
}

impl ValueKind {
    /// Parses a parameter type as spelled in source (`int`, `float`).
    pub fn from_source(name: &str) -> Option<Self> {
        match name {
            "int" => Some(ValueKind::I32),
            "float" => Some(ValueKind::F32),
            _ => None,
        }
    }

    /// Binary `valtype` byte.
    pub fn byte(self) -> u8 {
        match self {
            ValueKind::I32 => 0x7f,
            ValueKind::F32 => 0x7d,
        }
    }

    pub fn signature_char(self) -> char {
        match self {
            ValueKind::I32 => 'i',
            ValueKind::F32 => 'f',
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::I32 => f.write_str("i32"),
            ValueKind::F32 => f.write_str("f32"),
        }
    }
}

/// Parses a return type as spelled in source; `void` is `Some(None)`.
pub fn return_kind_from_source(name: &str) -> Option<Option<ValueKind>> {
    match name {
        "void" => Some(None),
        other => ValueKind::from_source(other).map(Some),
    }
}

/// Signature key: the result char (`v` for none) followed by one char per
/// parameter, e.g. `fii` returns `f32` and takes two `i32`.
pub fn signature(returns: Option<ValueKind>, params: impl IntoIterator<Item = ValueKind>) -> String {
    let mut key = String::new();
    key.push(returns.map_or('v', ValueKind::signature_char));
    key.extend(params.into_iter().map(ValueKind::signature_char));
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_spellings() {
        assert_eq!(ValueKind::from_source("int"), Some(ValueKind::I32));
        assert_eq!(ValueKind::from_source("void"), None);
        assert_eq!(return_kind_from_source("void"), Some(None));
        assert_eq!(return_kind_from_source("float"), Some(Some(ValueKind::F32)));
        assert_eq!(return_kind_from_source("double"), None);
    }

    #[test]
    fn builds_signature_keys() {
        assert_eq!(
            signature(Some(ValueKind::F32), [ValueKind::I32, ValueKind::I32]),
            "fii"
        );
        assert_eq!(signature(None, Vec::<ValueKind>::new()), "v");
        assert_eq!(signature(None, [ValueKind::F32]), "vf");
    }
}
