use thiserror::Error;

use crate::lexer::token::Token;
use crate::range::Range;

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token `{}`", if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    UnexpectedToken(Token),
    #[error("Unexpected EOF detected")]
    UnexpectedEOFDetected(Range),
    #[error("Expected an indented block but got `{}`", if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    ExpectedIndentedBlock(Token),
    #[error("Expected a closing parenthesis `)` but got `{}` delimiter", if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    ExpectedClosingParen(Token),
    #[error("Expected a closing bracket `]` but got `{}` delimiter", if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    ExpectedClosingBracket(Token),
}

impl ParseError {
    pub fn range(&self) -> Range {
        match self {
            ParseError::UnexpectedToken(token)
            | ParseError::ExpectedIndentedBlock(token)
            | ParseError::ExpectedClosingParen(token)
            | ParseError::ExpectedClosingBracket(token) => token.range,
            ParseError::UnexpectedEOFDetected(range) => *range,
        }
    }
}
