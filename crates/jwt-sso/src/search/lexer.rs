//! Tokenizer for attribute path expressions

use serde_json::Value;

use super::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Identifier(String),
    QuotedIdentifier(String),
    Number(i64),
    Literal(Value),
    RawString(String),
    Dot,
    Star,
    Flatten,
    Filter,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Colon,
    Pipe,
    Or,
    And,
    Not,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    At,
    Ampersand,
    Eof,
}

impl Token {
    /// Left binding power used by the Pratt parser
    pub(crate) const fn lbp(&self) -> usize {
        match self {
            Self::Pipe => 1,
            Self::Or => 2,
            Self::And => 3,
            Self::Eq | Self::Ne | Self::Lt | Self::Lte | Self::Gt | Self::Gte => 5,
            Self::Flatten => 9,
            Self::Star => 20,
            Self::Filter => 21,
            Self::Dot => 40,
            Self::Not => 45,
            Self::LBrace => 50,
            Self::LBracket => 55,
            Self::LParen => 60,
            _ => 0,
        }
    }
}

/// Token with its byte offset in the source expression
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    tokens: Vec<Spanned>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Spanned>, ParseError> {
        while let Some((pos, ch)) = self.chars.next() {
            let token = match ch {
                ' ' | '\t' | '\n' | '\r' => continue,
                '.' => Token::Dot,
                '*' => Token::Star,
                ']' => Token::RBracket,
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                '(' => Token::LParen,
                ')' => Token::RParen,
                ',' => Token::Comma,
                ':' => Token::Colon,
                '@' => Token::At,
                '[' => match self.chars.peek() {
                    Some((_, ']')) => {
                        self.chars.next();
                        Token::Flatten
                    }
                    Some((_, '?')) => {
                        self.chars.next();
                        Token::Filter
                    }
                    _ => Token::LBracket,
                },
                '|' => self.alternative('|', Token::Or, Token::Pipe),
                '&' => self.alternative('&', Token::And, Token::Ampersand),
                '!' => self.alternative('=', Token::Ne, Token::Not),
                '<' => self.alternative('=', Token::Lte, Token::Lt),
                '>' => self.alternative('=', Token::Gte, Token::Gt),
                '=' => {
                    if self.eat('=') {
                        Token::Eq
                    } else {
                        return Err(ParseError::new(pos, "expected '==' but found '='"));
                    }
                }
                '\'' => Token::RawString(self.raw_string(pos)?),
                '`' => Token::Literal(self.json_literal(pos)?),
                '"' => Token::QuotedIdentifier(self.quoted_identifier(pos)?),
                '-' | '0'..='9' => Token::Number(self.number(pos, ch)?),
                c if c.is_ascii_alphabetic() || c == '_' => {
                    Token::Identifier(self.identifier(pos))
                }
                other => {
                    return Err(ParseError::new(
                        pos,
                        format!("unexpected character {other:?}"),
                    ));
                }
            };
            self.tokens.push(Spanned {
                token,
                position: pos,
            });
        }

        self.tokens.push(Spanned {
            token: Token::Eof,
            position: self.source.len(),
        });
        Ok(self.tokens)
    }

    fn eat(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some((_, c)) if *c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn alternative(&mut self, next: char, double: Token, single: Token) -> Token {
        if self.eat(next) { double } else { single }
    }

    fn identifier(&mut self, start: usize) -> String {
        let mut end = start + 1;
        while let Some((pos, c)) = self.chars.peek().copied() {
            if c.is_ascii_alphanumeric() || c == '_' {
                end = pos + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        self.source[start..end].to_string()
    }

    fn number(&mut self, start: usize, first: char) -> Result<i64, ParseError> {
        let mut text = String::from(first);
        while let Some((_, c)) = self.chars.peek().copied() {
            if c.is_ascii_digit() {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        text.parse::<i64>()
            .map_err(|_| ParseError::new(start, format!("invalid number {text:?}")))
    }

    /// Consume up to the closing delimiter, keeping escape sequences intact
    fn delimited(&mut self, start: usize, delimiter: char) -> Result<String, ParseError> {
        let mut text = String::new();
        while let Some((_, c)) = self.chars.next() {
            if c == '\\' {
                match self.chars.next() {
                    Some((_, escaped)) => {
                        text.push('\\');
                        text.push(escaped);
                    }
                    None => break,
                }
            } else if c == delimiter {
                return Ok(text);
            } else {
                text.push(c);
            }
        }
        Err(ParseError::new(
            start,
            format!("unterminated {delimiter}-delimited token"),
        ))
    }

    fn raw_string(&mut self, start: usize) -> Result<String, ParseError> {
        let text = self.delimited(start, '\'')?;
        Ok(text.replace("\\'", "'"))
    }

    fn json_literal(&mut self, start: usize) -> Result<Value, ParseError> {
        let text = self.delimited(start, '`')?.replace("\\`", "`");
        serde_json::from_str(text.trim())
            .map_err(|e| ParseError::new(start, format!("invalid JSON literal: {e}")))
    }

    fn quoted_identifier(&mut self, start: usize) -> Result<String, ParseError> {
        let text = self.delimited(start, '"')?;
        serde_json::from_str(&format!("\"{text}\""))
            .map_err(|e| ParseError::new(start, format!("invalid quoted identifier: {e}")))
    }
}
