//! Tokenizer for statement text. Quote-aware and operator-aware.

use crate::sql::quote_identifier;
use crate::sql::quote_literal;
use crate::sql::ParseError;
use std::fmt::Display;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    /// Bare identifier
    Ident(String),
    /// Backtick-quoted identifier, used verbatim
    QuotedIdent(String),
    /// Single- or double-quoted string literal
    String(String),
    /// Integer or floating-point literal
    Number(String),
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Period,
    Asterisk,
    Plus,
    Minus,
    Slash,
    Percent,
    /// `=` or `==`
    Equal,
    /// `!=` or `<>`
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl Token {
    /// Identifier text for bare and quoted identifiers.
    pub fn ident(&self) -> Option<&str> {
        match self {
            Token::Ident(name) | Token::QuotedIdent(name) => Some(name),
            _ => None,
        }
    }
}

/// Renders a token as it should reach the store: identifiers double-quoted, strings single-quoted.
impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Keyword(keyword) => f.write_str(keyword.as_str()),
            Token::Ident(name) | Token::QuotedIdent(name) => f.write_str(&quote_identifier(name)),
            Token::String(text) => f.write_str(&quote_literal(text)),
            Token::Number(number) => f.write_str(number),
            Token::OpenParen => f.write_str("("),
            Token::CloseParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Semicolon => f.write_str(";"),
            Token::Period => f.write_str("."),
            Token::Asterisk => f.write_str("*"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::Equal => f.write_str("="),
            Token::NotEqual => f.write_str("<>"),
            Token::LessThan => f.write_str("<"),
            Token::LessOrEqual => f.write_str("<="),
            Token::GreaterThan => f.write_str(">"),
            Token::GreaterOrEqual => f.write_str(">="),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Keyword {
    Select,
    Distinct,
    From,
    Where,
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    On,
    Limit,
    Order,
    Group,
    By,
    Having,
    Asc,
    Desc,
    As,
    And,
    Or,
    Not,
    Is,
    Null,
    Like,
    In,
    True,
    False,
    Update,
    Set,
    Delete,
    Show,
    Tables,
    Create,
    Table,
}

impl Keyword {
    /// Case-insensitive keyword lookup
    pub fn parse(ident: &str) -> Option<Keyword> {
        Some(match ident.to_ascii_uppercase().as_str() {
            "SELECT" => Keyword::Select,
            "DISTINCT" => Keyword::Distinct,
            "FROM" => Keyword::From,
            "WHERE" => Keyword::Where,
            "JOIN" => Keyword::Join,
            "INNER" => Keyword::Inner,
            "LEFT" => Keyword::Left,
            "RIGHT" => Keyword::Right,
            "FULL" => Keyword::Full,
            "OUTER" => Keyword::Outer,
            "ON" => Keyword::On,
            "LIMIT" => Keyword::Limit,
            "ORDER" => Keyword::Order,
            "GROUP" => Keyword::Group,
            "BY" => Keyword::By,
            "HAVING" => Keyword::Having,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "AS" => Keyword::As,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "IS" => Keyword::Is,
            "NULL" => Keyword::Null,
            "LIKE" => Keyword::Like,
            "IN" => Keyword::In,
            "TRUE" => Keyword::True,
            "FALSE" => Keyword::False,
            "UPDATE" => Keyword::Update,
            "SET" => Keyword::Set,
            "DELETE" => Keyword::Delete,
            "SHOW" => Keyword::Show,
            "TABLES" => Keyword::Tables,
            "CREATE" => Keyword::Create,
            "TABLE" => Keyword::Table,
            _ => return None,
        })
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::Distinct => "DISTINCT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Join => "JOIN",
            Keyword::Inner => "INNER",
            Keyword::Left => "LEFT",
            Keyword::Right => "RIGHT",
            Keyword::Full => "FULL",
            Keyword::Outer => "OUTER",
            Keyword::On => "ON",
            Keyword::Limit => "LIMIT",
            Keyword::Order => "ORDER",
            Keyword::Group => "GROUP",
            Keyword::By => "BY",
            Keyword::Having => "HAVING",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::As => "AS",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::Like => "LIKE",
            Keyword::In => "IN",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Update => "UPDATE",
            Keyword::Set => "SET",
            Keyword::Delete => "DELETE",
            Keyword::Show => "SHOW",
            Keyword::Tables => "TABLES",
            Keyword::Create => "CREATE",
            Keyword::Table => "TABLE",
        }
    }
}

pub struct Lexer<'a> {
    text: &'a str,
    iter: Peekable<Chars<'a>>,
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => None,
            Err(error) => Some(Err(error)),
        }
    }
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            iter: text.chars().peekable(),
        }
    }

    /// Tokenizes the whole text.
    pub fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
        Lexer::new(text).collect()
    }

    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.peek().filter(|&c| predicate(*c))?;
        self.iter.next()
    }

    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    fn skip_whitespace(&mut self) {
        self.next_while(|c| c.is_whitespace());
    }

    fn scan(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_whitespace();
        match self.iter.peek() {
            Some('\'') => self.scan_quoted('\'').map(|text| Some(Token::String(text))),
            Some('"') => self.scan_quoted('"').map(|text| Some(Token::String(text))),
            Some('`') => self.scan_quoted('`').map(|text| Some(Token::QuotedIdent(text))),
            Some(c) if c.is_ascii_digit() => Ok(self.scan_number()),
            Some(c) if c.is_alphabetic() || *c == '_' => Ok(self.scan_ident()),
            Some(_) => self.scan_symbol().map(Some),
            None => Ok(None),
        }
    }

    /// Reads a quoted run; a doubled quote character stands for itself.
    fn scan_quoted(&mut self, quote: char) -> Result<String, ParseError> {
        self.iter.next();
        let mut value = String::new();
        loop {
            match self.iter.next() {
                Some(c) if c == quote => {
                    if self.next_if(|next| next == quote).is_some() {
                        value.push(quote);
                    } else {
                        return Ok(value);
                    }
                }
                Some(c) => value.push(c),
                None => return Err(ParseError::new(self.text, format!("unterminated {quote}-quoted text"))),
            }
        }
    }

    fn scan_number(&mut self) -> Option<Token> {
        let mut number = self.next_while(|c| c.is_ascii_digit())?;
        if let Some(dot) = self.next_if(|c| c == '.') {
            number.push(dot);
            if let Some(fraction) = self.next_while(|c| c.is_ascii_digit()) {
                number.push_str(&fraction);
            }
        }
        if let Some(exponent) = self.next_if(|c| c == 'e' || c == 'E') {
            number.push(exponent);
            if let Some(sign) = self.next_if(|c| c == '+' || c == '-') {
                number.push(sign);
            }
            if let Some(digits) = self.next_while(|c| c.is_ascii_digit()) {
                number.push_str(&digits);
            }
        }
        Some(Token::Number(number))
    }

    fn scan_ident(&mut self) -> Option<Token> {
        let value = self.next_while(|c| c.is_alphanumeric() || c == '_' || c == '$')?;
        Some(match Keyword::parse(&value) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Ident(value),
        })
    }

    fn scan_symbol(&mut self) -> Result<Token, ParseError> {
        let text = self.text;
        let unexpected = |c: char| ParseError::new(text, format!("unexpected character '{c}'"));
        let Some(c) = self.iter.next() else {
            return Err(ParseError::new(text, "unexpected end of input"));
        };
        let token = match c {
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '.' => Token::Period,
            '*' => Token::Asterisk,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '=' => {
                self.next_if(|c| c == '=');
                Token::Equal
            }
            '!' => match self.next_if(|c| c == '=') {
                Some(_) => Token::NotEqual,
                None => return Err(unexpected(c)),
            },
            '<' => match self.next_if(|c| c == '=' || c == '>') {
                Some('=') => Token::LessOrEqual,
                Some(_) => Token::NotEqual,
                None => Token::LessThan,
            },
            '>' => match self.next_if(|c| c == '=') {
                Some(_) => Token::GreaterOrEqual,
                None => Token::GreaterThan,
            },
            _ => return Err(unexpected(c)),
        };
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_select() {
        let tokens = Lexer::tokenize("SELECT `from`, t.Name FROM Items WHERE Price >= 1.5e2 AND Name != 'O''Brien'").unwrap();
        assert_eq!(tokens, vec![
            Token::Keyword(Keyword::Select),
            Token::QuotedIdent("from".to_owned()),
            Token::Comma,
            Token::Ident("t".to_owned()),
            Token::Period,
            Token::Ident("Name".to_owned()),
            Token::Keyword(Keyword::From),
            Token::Ident("Items".to_owned()),
            Token::Keyword(Keyword::Where),
            Token::Ident("Price".to_owned()),
            Token::GreaterOrEqual,
            Token::Number("1.5e2".to_owned()),
            Token::Keyword(Keyword::And),
            Token::Ident("Name".to_owned()),
            Token::NotEqual,
            Token::String("O'Brien".to_owned()),
        ]);
    }

    #[test]
    fn tokenize_operators() {
        let tokens = Lexer::tokenize("a==1<>2<=3<4>5%\"x\"").unwrap();
        assert_eq!(tokens, vec![
            Token::Ident("a".to_owned()),
            Token::Equal,
            Token::Number("1".to_owned()),
            Token::NotEqual,
            Token::Number("2".to_owned()),
            Token::LessOrEqual,
            Token::Number("3".to_owned()),
            Token::LessThan,
            Token::Number("4".to_owned()),
            Token::GreaterThan,
            Token::Number("5".to_owned()),
            Token::Percent,
            Token::String("x".to_owned()),
        ]);
    }

    #[test]
    fn unicode_identifiers() {
        let tokens = Lexer::tokenize("SELECT 名称 FROM 商品").unwrap();
        assert_eq!(tokens[1], Token::Ident("名称".to_owned()));
        assert_eq!(tokens[3], Token::Ident("商品".to_owned()));
    }

    #[test]
    fn tokenize_errors() {
        assert!(Lexer::tokenize("SELECT 'open").is_err());
        assert!(Lexer::tokenize("SELECT a ? b").is_err());
        assert!(Lexer::tokenize("SELECT !a").is_err());
    }
}
