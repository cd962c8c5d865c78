use thiserror::Error;

use crate::diagnostic::Diagnostic;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("lex error at byte {offset}: no token pattern matches {found:?}")]
    Lex { offset: usize, found: char },
    #[error("syntax error: {0}")]
    Syntax(Diagnostic),
    #[error("unknown value type `{name}` at byte {offset} (expected void, int or float)")]
    UnknownValueKind { name: String, offset: usize },
    #[error("invalid number literal `{text}` at byte {offset}")]
    InvalidLiteral { text: String, offset: usize },
    #[error("call to unknown function `{0}`")]
    UnknownFunction(String),
    #[error("`{name}` takes {expected} arguments but {found} were given")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("function `{0}` is defined more than once")]
    DuplicateFunction(String),
    #[error("entry function `{0}` is not defined")]
    MissingEntry(String),
    #[error("internal compiler error: {0}")]
    Internal(String),
}
