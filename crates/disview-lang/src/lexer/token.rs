use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::range::Range;

#[derive(PartialEq, Debug, Clone)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum TokenKind {
    And,
    Asterisk,
    AsteriskEqual,
    Break,
    Class,
    Colon,
    Comma,
    Comment(String),
    Continue,
    Dedent,
    Def,
    Dot,
    DoubleAsterisk,
    DoubleSlash,
    Elif,
    Else,
    Eof,
    EqEq,
    Equal,
    False,
    FloatLiteral(f64),
    For,
    Gt,
    Gte,
    Ident(SmolStr),
    If,
    In,
    Indent,
    IntLiteral(i64),
    LBracket,
    LParen,
    Lambda,
    Lt,
    Lte,
    Minus,
    MinusEqual,
    NeEq,
    NewLine,
    None,
    Not,
    Or,
    Pass,
    Percent,
    Plus,
    PlusEqual,
    RBracket,
    RParen,
    Return,
    Slash,
    SlashEqual,
    StringLiteral(String),
    Tab(usize),
    True,
    While,
    Whitespace(usize),
}

impl TokenKind {
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        Some(match ident {
            "and" => TokenKind::And,
            "break" => TokenKind::Break,
            "class" => TokenKind::Class,
            "continue" => TokenKind::Continue,
            "def" => TokenKind::Def,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "False" => TokenKind::False,
            "for" => TokenKind::For,
            "if" => TokenKind::If,
            "in" => TokenKind::In,
            "lambda" => TokenKind::Lambda,
            "None" => TokenKind::None,
            "not" => TokenKind::Not,
            "or" => TokenKind::Or,
            "pass" => TokenKind::Pass,
            "return" => TokenKind::Return,
            "True" => TokenKind::True,
            "while" => TokenKind::While,
            _ => return None,
        })
    }

    /// Tokens that the layout pass consumes before the parser sees the stream.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Comment(_) | TokenKind::Whitespace(_) | TokenKind::Tab(_)
        )
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self {
            TokenKind::And => write!(f, "and"),
            TokenKind::Asterisk => write!(f, "*"),
            TokenKind::AsteriskEqual => write!(f, "*="),
            TokenKind::Break => write!(f, "break"),
            TokenKind::Class => write!(f, "class"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Comment(comment) => write!(f, "# {}", comment.trim()),
            TokenKind::Continue => write!(f, "continue"),
            TokenKind::Dedent => write!(f, "<dedent>"),
            TokenKind::Def => write!(f, "def"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::DoubleAsterisk => write!(f, "**"),
            TokenKind::DoubleSlash => write!(f, "//"),
            TokenKind::Elif => write!(f, "elif"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::Eof => write!(f, ""),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::Equal => write!(f, "="),
            TokenKind::False => write!(f, "False"),
            TokenKind::FloatLiteral(n) => write!(f, "{}", n),
            TokenKind::For => write!(f, "for"),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Gte => write!(f, ">="),
            TokenKind::Ident(ident) => write!(f, "{}", ident),
            TokenKind::If => write!(f, "if"),
            TokenKind::In => write!(f, "in"),
            TokenKind::Indent => write!(f, "<indent>"),
            TokenKind::IntLiteral(n) => write!(f, "{}", n),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::LParen => write!(f, "("),
            TokenKind::Lambda => write!(f, "lambda"),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Lte => write!(f, "<="),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::MinusEqual => write!(f, "-="),
            TokenKind::NeEq => write!(f, "!="),
            TokenKind::NewLine => write!(f, "<newline>"),
            TokenKind::None => write!(f, "None"),
            TokenKind::Not => write!(f, "not"),
            TokenKind::Or => write!(f, "or"),
            TokenKind::Pass => write!(f, "pass"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::PlusEqual => write!(f, "+="),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::SlashEqual => write!(f, "/="),
            TokenKind::StringLiteral(s) => write!(f, "{:?}", s),
            TokenKind::Tab(n) => write!(f, "{}", "\t".repeat(*n)),
            TokenKind::True => write!(f, "True"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Whitespace(n) => write!(f, "{}", " ".repeat(*n)),
        }
    }
}
