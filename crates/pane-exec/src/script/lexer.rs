//! Source lexer.
//!
//! Pull-based: the parser asks for one token at a time. Every token carries the
//! 1-based line and column it starts at, which is all the position info the
//! fault model needs.
use std::fmt;

use super::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    KwLet,
    KwFn,
    KwIf,
    KwElse,
    KwWhile,
    KwFor,
    KwIn,
    KwBreak,
    KwContinue,
    KwReturn,
    KwRaise,
    KwTry,
    KwCatch,
    KwTrue,
    KwFalse,
    KwNull,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Eq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Ident(name) => return write!(f, "identifier `{name}`"),
            TokenKind::Int(v) => return write!(f, "number `{v}`"),
            TokenKind::Float(v) => return write!(f, "number `{v}`"),
            TokenKind::Str(_) => "string literal",
            TokenKind::KwLet => "`let`",
            TokenKind::KwFn => "`fn`",
            TokenKind::KwIf => "`if`",
            TokenKind::KwElse => "`else`",
            TokenKind::KwWhile => "`while`",
            TokenKind::KwFor => "`for`",
            TokenKind::KwIn => "`in`",
            TokenKind::KwBreak => "`break`",
            TokenKind::KwContinue => "`continue`",
            TokenKind::KwReturn => "`return`",
            TokenKind::KwRaise => "`raise`",
            TokenKind::KwTry => "`try`",
            TokenKind::KwCatch => "`catch`",
            TokenKind::KwTrue => "`true`",
            TokenKind::KwFalse => "`false`",
            TokenKind::KwNull => "`null`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::Colon => "`:`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Dot => "`.`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Bang => "`!`",
            TokenKind::Eq => "`=`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::LtEq => "`<=`",
            TokenKind::Gt => "`>`",
            TokenKind::GtEq => "`>=`",
            TokenKind::AndAnd => "`&&`",
            TokenKind::OrOr => "`||`",
            TokenKind::PlusEq => "`+=`",
            TokenKind::MinusEq => "`-=`",
            TokenKind::StarEq => "`*=`",
            TokenKind::SlashEq => "`/=`",
            TokenKind::Eof => "end of file",
        };
        f.write_str(s)
    }
}

/// A token paired with where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Lex the whole input, ending with a single `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_trivia();

        let (line, column) = (self.line, self.column);
        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(ch) if is_ident_start(ch) => self.lex_word(),
            Some(ch) if ch.is_ascii_digit() => self.lex_number(line, column)?,
            Some(q @ ('"' | '\'')) => self.lex_string(q, line, column)?,
            Some(_) => self.lex_symbol(line, column)?,
        };
        Ok(Token { kind, line, column })
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if ch.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_line(),
                Some('/') if self.second() == Some('/') => self.skip_line(),
                _ => return,
            }
        }
    }

    fn second(&self) -> Option<char> {
        let mut it = self.chars.clone();
        it.next();
        it.next()
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.bump() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(ch) = self.peek().filter(|c| is_ident_continue(*c)) {
            word.push(ch);
            self.bump();
        }

        match word.as_str() {
            "let" => TokenKind::KwLet,
            "fn" => TokenKind::KwFn,
            "if" => TokenKind::KwIf,
            "else" => TokenKind::KwElse,
            "while" => TokenKind::KwWhile,
            "for" => TokenKind::KwFor,
            "in" => TokenKind::KwIn,
            "break" => TokenKind::KwBreak,
            "continue" => TokenKind::KwContinue,
            "return" => TokenKind::KwReturn,
            "raise" => TokenKind::KwRaise,
            "try" => TokenKind::KwTry,
            "catch" => TokenKind::KwCatch,
            "true" => TokenKind::KwTrue,
            "false" => TokenKind::KwFalse,
            "null" => TokenKind::KwNull,
            _ => TokenKind::Ident(word),
        }
    }

    fn lex_number(&mut self, line: u32, column: u32) -> Result<TokenKind, SyntaxError> {
        let mut literal = String::new();
        let mut is_float = false;
        self.digits(&mut literal);

        if self.peek() == Some('.') && self.second().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            literal.push('.');
            self.bump();
            self.digits(&mut literal);
        }
        if let Some(e @ ('e' | 'E')) = self.peek() {
            is_float = true;
            literal.push(e);
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                literal.push(sign);
                self.bump();
            }
            if self.digits(&mut literal) == 0 {
                return Err(SyntaxError::new("expected digits after exponent", line, column));
            }
        }

        if is_float {
            literal
                .parse()
                .map(TokenKind::Float)
                .map_err(|_| SyntaxError::new(format!("invalid number `{literal}`"), line, column))
        } else {
            literal.parse().map(TokenKind::Int).map_err(|_| {
                SyntaxError::new(format!("integer literal `{literal}` is too large"), line, column)
            })
        }
    }

    fn digits(&mut self, out: &mut String) -> usize {
        let mut n = 0;
        while let Some(ch) = self.peek().filter(|c| c.is_ascii_digit() || *c == '_') {
            if ch != '_' {
                out.push(ch);
                n += 1;
            }
            self.bump();
        }
        n
    }

    fn lex_string(&mut self, quote: char, line: u32, column: u32) -> Result<TokenKind, SyntaxError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(SyntaxError::new("unterminated string literal", line, column));
                }
                Some(ch) if ch == quote => return Ok(TokenKind::Str(value)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('0') => value.push('\0'),
                    Some(other) => value.push(other),
                    None => {
                        return Err(SyntaxError::new("unterminated escape sequence", line, column));
                    }
                },
                Some(ch) => value.push(ch),
            }
        }
    }

    fn lex_symbol(&mut self, line: u32, column: u32) -> Result<TokenKind, SyntaxError> {
        let Some(ch) = self.bump() else {
            return Ok(TokenKind::Eof);
        };
        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '%' => TokenKind::Percent,
            '+' if self.eat('=') => TokenKind::PlusEq,
            '+' => TokenKind::Plus,
            '-' if self.eat('=') => TokenKind::MinusEq,
            '-' => TokenKind::Minus,
            '*' if self.eat('=') => TokenKind::StarEq,
            '*' => TokenKind::Star,
            '/' if self.eat('=') => TokenKind::SlashEq,
            '/' => TokenKind::Slash,
            '=' if self.eat('=') => TokenKind::EqEq,
            '=' => TokenKind::Eq,
            '!' if self.eat('=') => TokenKind::NotEq,
            '!' => TokenKind::Bang,
            '<' if self.eat('=') => TokenKind::LtEq,
            '<' => TokenKind::Lt,
            '>' if self.eat('=') => TokenKind::GtEq,
            '>' => TokenKind::Gt,
            '&' if self.eat('&') => TokenKind::AndAnd,
            '|' if self.eat('|') => TokenKind::OrOr,
            other => {
                return Err(SyntaxError::new(
                    format!("unexpected character `{other}`"),
                    line,
                    column,
                ));
            }
        };
        Ok(kind)
    }
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

fn is_ident_continue(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_statement() {
        assert_eq!(
            kinds("let x = 1 + 2.5"),
            vec![
                TokenKind::KwLet,
                TokenKind::Ident("x".into()),
                TokenKind::Eq,
                TokenKind::Int(1),
                TokenKind::Plus,
                TokenKind::Float(2.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("# hash\nx // slashes\n// whole line"),
            vec![TokenKind::Ident("x".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            kinds("a += b == c && !d"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::PlusEq,
                TokenKind::Ident("b".into()),
                TokenKind::EqEq,
                TokenKind::Ident("c".into()),
                TokenKind::AndAnd,
                TokenKind::Bang,
                TokenKind::Ident("d".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strings_support_both_quotes_and_escapes() {
        assert_eq!(
            kinds(r#""a\n\"b\"" 'c'"#),
            vec![
                TokenKind::Str("a\n\"b\"".into()),
                TokenKind::Str("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = Lexer::new("x\n  y").tokenize().unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn unterminated_string_points_at_its_start() {
        let err = Lexer::new("let s = \"abc").tokenize().unwrap_err();
        assert_eq!((err.line, err.column), (1, 9));
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn stray_character_is_rejected() {
        let err = Lexer::new("a @ b").tokenize().unwrap_err();
        assert_eq!(err.column, 3);
    }
}
