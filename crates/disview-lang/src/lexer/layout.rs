use crate::range::Range;

use super::error::LexerError;
use super::token::{Token, TokenKind};

/// Converts a raw token stream into the logical-line stream the parser expects.
///
/// Leading whitespace becomes `Indent`/`Dedent` tokens, blank and comment-only
/// lines disappear, and newlines inside brackets are dropped. The output ends
/// with `NewLine`, any pending `Dedent`s and `Eof`.
pub fn layout(tokens: Vec<Token>) -> Result<Vec<Token>, LexerError> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut indents = vec![0usize];
    let mut depth = 0usize;
    let mut at_line_start = true;
    let mut line_has_content = false;
    let mut width = 0usize;

    for token in tokens {
        match &token.kind {
            TokenKind::Whitespace(n) | TokenKind::Tab(n) => {
                if at_line_start && depth == 0 {
                    width += n;
                }
            }
            TokenKind::Comment(_) => {}
            TokenKind::NewLine => {
                if depth > 0 {
                    continue;
                }
                if line_has_content {
                    output.push(token);
                }
                line_has_content = false;
                at_line_start = true;
                width = 0;
            }
            TokenKind::Eof => {
                if depth > 0 {
                    return Err(LexerError::UnexpectedEOFDetected(token));
                }
                let eof = Range::new(token.range.start, token.range.start);
                if line_has_content {
                    output.push(Token {
                        range: eof,
                        kind: TokenKind::NewLine,
                    });
                }
                while indents.len() > 1 {
                    indents.pop();
                    output.push(Token {
                        range: eof,
                        kind: TokenKind::Dedent,
                    });
                }
                output.push(token);
                return Ok(output);
            }
            kind => {
                if at_line_start && depth == 0 {
                    let marker = Range::new(token.range.start, token.range.start);
                    let current = indents.last().copied().unwrap_or_default();

                    if width > current {
                        indents.push(width);
                        output.push(Token {
                            range: marker,
                            kind: TokenKind::Indent,
                        });
                    } else if width < current {
                        while indents.last().is_some_and(|&level| width < level) {
                            indents.pop();
                            output.push(Token {
                                range: marker,
                                kind: TokenKind::Dedent,
                            });
                        }
                        if indents.last().copied().unwrap_or_default() != width {
                            return Err(LexerError::InconsistentDedent(token));
                        }
                    }
                }

                match kind {
                    TokenKind::LParen | TokenKind::LBracket => depth += 1,
                    TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                    _ => {}
                }

                at_line_start = false;
                line_has_content = true;
                output.push(token);
            }
        }
    }

    Ok(output)
}
