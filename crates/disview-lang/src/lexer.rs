pub mod error;
mod layout;
pub mod token;

use error::LexerError;
use nom::Parser;
use nom::bytes::complete::take_while;
use nom::character::complete::{digit0, digit1, line_ending, one_of};
use nom::combinator::{consumed, opt};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, none_of},
    combinator::{map, map_res, recognize, value},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded},
};
use smol_str::SmolStr;
use token::{Token, TokenKind};

use crate::range::{Position, Range, Span};

pub use layout::layout;

const TAB_WIDTH: usize = 8;

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: span.into(),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

/// Splits source text into raw tokens, including whitespace, newlines and comments.
///
/// The result always ends with an `Eof` token. Use [`layout`] to turn the raw
/// stream into the indentation-aware stream the parser consumes.
#[derive(Debug, Default)]
pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Self
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexerError> {
        match many0(token).parse(Span::new(input)) {
            Ok((rest, mut tokens)) => {
                if let Some(c) = rest.fragment().chars().next() {
                    let start: Position = rest.into();
                    let end = Position::new(start.line, start.column + 1);
                    return Err(LexerError::UnexpectedCharacter(c, Range::new(start, end)));
                }

                let eof: Position = rest.into();
                tokens.push(Token {
                    range: Range::new(eof, eof),
                    kind: TokenKind::Eof,
                });
                Ok(tokens)
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let start: Position = e.input.into();
                let c = e.input.fragment().chars().next().unwrap_or(' ');
                Err(LexerError::UnexpectedCharacter(
                    c,
                    Range::new(start, Position::new(start.line, start.column + 1)),
                ))
            }
            Err(nom::Err::Incomplete(_)) => unreachable!(),
        }
    }
}

fn comment(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(char('#'), take_while(|c: char| c != '\n' && c != '\r'))),
        |span: Span| Token {
            range: span.into(),
            kind: TokenKind::Comment(span.fragment()[1..].to_string()),
        },
    )
    .parse(input)
}

fn newline(input: Span) -> IResult<Span, Token> {
    map(line_ending, |span: Span| Token {
        range: span.into(),
        kind: TokenKind::NewLine,
    })
    .parse(input)
}

fn line_continuation(input: Span) -> IResult<Span, Token> {
    map(recognize(pair(char('\\'), line_ending)), |span: Span| Token {
        range: span.into(),
        kind: TokenKind::Whitespace(1),
    })
    .parse(input)
}

fn tab(input: Span) -> IResult<Span, Token> {
    map(recognize(many1(char('\t'))), |span: Span| Token {
        range: span.into(),
        kind: TokenKind::Tab(span.fragment().len() * TAB_WIDTH),
    })
    .parse(input)
}

fn spaces(input: Span) -> IResult<Span, Token> {
    map(recognize(many1(one_of(" \x0c"))), |span: Span| Token {
        range: span.into(),
        kind: TokenKind::Whitespace(span.fragment().len()),
    })
    .parse(input)
}

define_token_parser!(double_asterisk, "**", TokenKind::DoubleAsterisk);
define_token_parser!(double_slash, "//", TokenKind::DoubleSlash);
define_token_parser!(eq_eq, "==", TokenKind::EqEq);
define_token_parser!(ne_eq, "!=", TokenKind::NeEq);
define_token_parser!(lte, "<=", TokenKind::Lte);
define_token_parser!(gte, ">=", TokenKind::Gte);
define_token_parser!(plus_equal, "+=", TokenKind::PlusEqual);
define_token_parser!(minus_equal, "-=", TokenKind::MinusEqual);
define_token_parser!(asterisk_equal, "*=", TokenKind::AsteriskEqual);
define_token_parser!(slash_equal, "/=", TokenKind::SlashEqual);
define_token_parser!(plus, "+", TokenKind::Plus);
define_token_parser!(minus, "-", TokenKind::Minus);
define_token_parser!(asterisk, "*", TokenKind::Asterisk);
define_token_parser!(slash, "/", TokenKind::Slash);
define_token_parser!(percent, "%", TokenKind::Percent);
define_token_parser!(lt, "<", TokenKind::Lt);
define_token_parser!(gt, ">", TokenKind::Gt);
define_token_parser!(equal, "=", TokenKind::Equal);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(l_bracket, "[", TokenKind::LBracket);
define_token_parser!(r_bracket, "]", TokenKind::RBracket);
define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(colon, ":", TokenKind::Colon);
define_token_parser!(dot, ".", TokenKind::Dot);

fn operators(input: Span) -> IResult<Span, Token> {
    alt((
        alt((
            double_asterisk,
            double_slash,
            eq_eq,
            ne_eq,
            lte,
            gte,
            plus_equal,
            minus_equal,
            asterisk_equal,
            slash_equal,
        )),
        alt((plus, minus, asterisk, slash, percent, lt, gt, equal)),
    ))
    .parse(input)
}

fn punctuations(input: Span) -> IResult<Span, Token> {
    alt((l_paren, r_paren, l_bracket, r_bracket, comma, colon, dot)).parse(input)
}

fn exponent(input: Span) -> IResult<Span, Span> {
    recognize((one_of("eE"), opt(one_of("+-")), digit1)).parse(input)
}

fn float_literal(input: Span) -> IResult<Span, Token> {
    map_res(
        recognize(alt((
            recognize((digit1, char('.'), digit0, opt(exponent))),
            recognize((char('.'), digit1, opt(exponent))),
            recognize((digit1, exponent)),
        ))),
        |span: Span| {
            span.fragment().parse::<f64>().map(|n| Token {
                range: span.into(),
                kind: TokenKind::FloatLiteral(n),
            })
        },
    )
    .parse(input)
}

fn int_literal(input: Span) -> IResult<Span, Token> {
    map_res(digit1, |span: Span| {
        span.fragment().parse::<i64>().map(|n| Token {
            range: span.into(),
            kind: TokenKind::IntLiteral(n),
        })
    })
    .parse(input)
}

fn escape(input: Span) -> IResult<Span, char> {
    alt((
        value('\\', char('\\')),
        value('"', char('"')),
        value('\'', char('\'')),
        value('\n', char('n')),
        value('\t', char('t')),
        value('\r', char('r')),
        value('\0', char('0')),
    ))
    .parse(input)
}

fn quoted(quote: char, input: Span) -> IResult<Span, String> {
    let stop = if quote == '"' { "\"\\\n" } else { "'\\\n" };
    delimited(
        char(quote),
        map(
            many0(alt((none_of(stop), preceded(char('\\'), escape)))),
            |chars: Vec<char>| chars.into_iter().collect(),
        ),
        char(quote),
    )
    .parse(input)
}

fn double_quoted(input: Span) -> IResult<Span, String> {
    quoted('"', input)
}

fn single_quoted(input: Span) -> IResult<Span, String> {
    quoted('\'', input)
}

fn string_literal(input: Span) -> IResult<Span, Token> {
    map(
        consumed(alt((double_quoted, single_quoted))),
        |(span, s): (Span, String)| Token {
            range: span.into(),
            kind: TokenKind::StringLiteral(s),
        },
    )
    .parse(input)
}

fn literals(input: Span) -> IResult<Span, Token> {
    alt((float_literal, int_literal, string_literal)).parse(input)
}

fn ident(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |span: Span| {
            let kind = TokenKind::keyword(span.fragment())
                .unwrap_or_else(|| TokenKind::Ident(SmolStr::new(span.fragment())));
            Token {
                range: span.into(),
                kind,
            }
        },
    )
    .parse(input)
}

fn token(input: Span) -> IResult<Span, Token> {
    alt((
        newline,
        line_continuation,
        spaces,
        tab,
        comment,
        literals,
        operators,
        punctuations,
        ident,
    ))
    .parse(input)
}
