use miette::{Diagnostic, SourceOffset, SourceSpan};

use crate::{
    ast::error::ParseError, compiler::error::CompileError, lexer::error::LexerError,
    range::Range,
};

#[allow(clippy::useless_conversion)]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl InnerError {
    pub fn range(&self) -> Range {
        match self {
            InnerError::Lexer(err) => err.range(),
            InnerError::Parse(err) => err.range(),
            InnerError::Compile(err) => err.range(),
        }
    }
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The source code related to the error.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: InnerError) -> Self {
        let source_code = source_code.into();
        let range = cause.range();
        let start = Self::offset(&source_code, range.start.line, range.start.column);
        let end = Self::offset(&source_code, range.end.line, range.end.column);
        let location = SourceSpan::new(
            SourceOffset::from(start),
            std::cmp::max(end.saturating_sub(start), 1),
        );

        Self {
            cause,
            source_code,
            location,
        }
    }

    /// The range of the offending code, using the same 1-based positions as the syntax tree.
    pub fn range(&self) -> Range {
        self.cause.range()
    }

    fn offset(source_code: &str, line: u32, column: usize) -> usize {
        SourceOffset::from_location(source_code, line as usize, column)
            .offset()
            .min(source_code.len())
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match self.cause {
            InnerError::Lexer(LexerError::UnexpectedCharacter(..)) => {
                "LexerError::UnexpectedCharacter"
            }
            InnerError::Lexer(LexerError::UnexpectedEOFDetected(_)) => {
                "LexerError::UnexpectedEOFDetected"
            }
            InnerError::Lexer(LexerError::InconsistentDedent(_)) => {
                "LexerError::InconsistentDedent"
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => "ParseError::UnexpectedToken",
            InnerError::Parse(ParseError::UnexpectedEOFDetected(_)) => {
                "ParseError::UnexpectedEOFDetected"
            }
            InnerError::Parse(ParseError::ExpectedIndentedBlock(_)) => {
                "ParseError::ExpectedIndentedBlock"
            }
            InnerError::Parse(ParseError::ExpectedClosingParen(_)) => {
                "ParseError::ExpectedClosingParen"
            }
            InnerError::Parse(ParseError::ExpectedClosingBracket(_)) => {
                "ParseError::ExpectedClosingBracket"
            }
            InnerError::Compile(CompileError::ReturnOutsideFunction(_)) => {
                "CompileError::ReturnOutsideFunction"
            }
            InnerError::Compile(CompileError::BreakOutsideLoop(_)) => {
                "CompileError::BreakOutsideLoop"
            }
            InnerError::Compile(CompileError::ContinueOutsideLoop(_)) => {
                "CompileError::ContinueOutsideLoop"
            }
            InnerError::Compile(CompileError::InvalidAssignmentTarget(..)) => {
                "CompileError::InvalidAssignmentTarget"
            }
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedCharacter(..)) => {
                Some("Check for stray characters or an unterminated string literal.".to_string())
            }
            InnerError::Lexer(LexerError::UnexpectedEOFDetected(_)) => {
                Some("Input ended inside brackets. Make sure every `(` and `[` is closed.".to_string())
            }
            InnerError::Lexer(LexerError::InconsistentDedent(_)) => {
                Some("Dedent to a column used by an enclosing block.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => {
                Some("Check for syntax errors or misplaced tokens.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedEOFDetected(_)) => {
                Some("Input ended unexpectedly. Check for incomplete statements.".to_string())
            }
            InnerError::Parse(ParseError::ExpectedIndentedBlock(_)) => {
                Some("Indent the statements that follow a `:`.".to_string())
            }
            InnerError::Compile(CompileError::InvalidAssignmentTarget(_, target)) => {
                Some(format!("A {target} cannot appear on the left of `=`."))
            }
            _ => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(
            miette::LabeledSpan::new_with_span(Some(format!("{}", self.cause)), self.location),
        )))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Position;
    use rstest::rstest;

    fn compile_error(range: Range) -> InnerError {
        InnerError::Compile(CompileError::BreakOutsideLoop(range))
    }

    #[rstest]
    #[case::first_line("break", Range::new(Position::new(1, 1), Position::new(1, 6)), 0, 5)]
    #[case::second_line(
        "x = 1\nbreak",
        Range::new(Position::new(2, 1), Position::new(2, 6)),
        6,
        5
    )]
    #[case::empty_range("x", Range::new(Position::new(1, 2), Position::new(1, 2)), 1, 1)]
    fn test_location(
        #[case] code: &str,
        #[case] range: Range,
        #[case] offset: usize,
        #[case] len: usize,
    ) {
        let err = Error::from_error(code, compile_error(range));
        assert_eq!(err.location.offset(), offset);
        assert_eq!(err.location.len(), len);
        assert_eq!(err.range(), range);
    }

    #[test]
    fn test_diagnostic_code() {
        let err = Error::from_error(
            "break",
            compile_error(Range::new(Position::new(1, 1), Position::new(1, 6))),
        );
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("CompileError::BreakOutsideLoop".to_string())
        );
        assert_eq!(err.to_string(), "'break' outside loop");
    }
}
