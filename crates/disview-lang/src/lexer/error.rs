use thiserror::Error;

use crate::range::Range;

use super::token::Token;

#[derive(Error, Debug, PartialEq)]
pub enum LexerError {
    #[error("Unexpected character `{0}`")]
    UnexpectedCharacter(char, Range),
    #[error("Unexpected EOF detected")]
    UnexpectedEOFDetected(Token),
    #[error("Unindent does not match any outer indentation level")]
    InconsistentDedent(Token),
}

impl LexerError {
    pub fn range(&self) -> Range {
        match self {
            LexerError::UnexpectedCharacter(_, range) => *range,
            LexerError::UnexpectedEOFDetected(token) | LexerError::InconsistentDedent(token) => {
                token.range
            }
        }
    }
}
