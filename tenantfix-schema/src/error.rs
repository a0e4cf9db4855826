use thiserror::Error;

/// Structural problems that make block boundaries ambiguous.
///
/// Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{keyword} `{name}` opened at line {line} is never closed")]
    UnclosedBlock {
        keyword: String,
        name: String,
        line: usize,
    },

    #[error("unexpected `}}` at line {line}")]
    UnexpectedClose { line: usize },

    #[error("`{name}` at line {line} is declared inside `{parent}`")]
    NestedBlock {
        name: String,
        parent: String,
        line: usize,
    },
}
