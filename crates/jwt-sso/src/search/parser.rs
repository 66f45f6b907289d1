//! Pratt parser turning tokens into an [`Ast`]

use serde_json::Value;

use super::ParseError;
use super::ast::{Ast, Comparator};
use super::lexer::{Spanned, Token, tokenize};

/// Tokens binding weaker than this end a projection
const PROJECTION_STOP: usize = 10;

pub(crate) fn parse(source: &str) -> Result<Ast, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, index: 0 };
    let ast = parser.expression(0)?;
    match parser.peek() {
        Token::Eof => Ok(ast),
        other => Err(parser.error(format!("unexpected trailing token {other:?}"))),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.index + offset).min(last)].token
    }

    fn position(&self) -> usize {
        let last = self.tokens.len() - 1;
        self.tokens[self.index.min(last)].position
    }

    fn advance(&mut self) -> Token {
        let last = self.tokens.len() - 1;
        let token = self.tokens[self.index.min(last)].token.clone();
        if self.index < last {
            self.index += 1;
        }
        token
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::new(self.position(), reason)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {expected:?}, found {:?}", self.peek())))
        }
    }

    fn expression(&mut self, rbp: usize) -> Result<Ast, ParseError> {
        let token = self.advance();
        let mut left = self.nud(token)?;
        while rbp < self.peek().lbp() {
            let token = self.advance();
            left = self.led(token, left)?;
        }
        Ok(left)
    }

    fn nud(&mut self, token: Token) -> Result<Ast, ParseError> {
        match token {
            Token::At => Ok(Ast::Identity),
            Token::Identifier(name) => {
                if self.peek() == &Token::LParen {
                    self.advance();
                    self.function(name)
                } else {
                    Ok(Ast::Field(name))
                }
            }
            Token::QuotedIdentifier(name) => {
                if self.peek() == &Token::LParen {
                    Err(self.error("quoted identifiers cannot be used as function names"))
                } else {
                    Ok(Ast::Field(name))
                }
            }
            Token::Literal(value) => Ok(Ast::Literal(value)),
            Token::RawString(text) => Ok(Ast::Literal(Value::String(text))),
            Token::Star => {
                let rhs = self.projection_rhs(Token::Star.lbp())?;
                Ok(Ast::projection(Ast::ObjectValues(Box::new(Ast::Identity)), rhs))
            }
            Token::Flatten => {
                let rhs = self.projection_rhs(Token::Flatten.lbp())?;
                Ok(Ast::projection(Ast::Flatten(Box::new(Ast::Identity)), rhs))
            }
            Token::Filter => self.filter(Ast::Identity),
            Token::LBracket => match self.peek() {
                Token::Number(_) | Token::Colon => self.index_or_slice(Ast::Identity),
                Token::Star if self.peek_at(1) == &Token::RBracket => {
                    self.advance();
                    self.advance();
                    let rhs = self.projection_rhs(Token::Star.lbp())?;
                    Ok(Ast::projection(Ast::Identity, rhs))
                }
                _ => self.multi_list(),
            },
            Token::LBrace => self.multi_hash(),
            Token::Not => {
                let inner = self.expression(Token::Not.lbp())?;
                Ok(Ast::Not(Box::new(inner)))
            }
            Token::LParen => {
                let inner = self.expression(0)?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ampersand => {
                let inner = self.expression(0)?;
                Ok(Ast::Expref(Box::new(inner)))
            }
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn led(&mut self, token: Token, left: Ast) -> Result<Ast, ParseError> {
        match token {
            Token::Dot => {
                if self.peek() == &Token::Star {
                    self.advance();
                    let rhs = self.projection_rhs(Token::Star.lbp())?;
                    Ok(Ast::projection(Ast::ObjectValues(Box::new(left)), rhs))
                } else {
                    let rhs = self.dot_rhs(Token::Dot.lbp())?;
                    Ok(Ast::subexpr(left, rhs))
                }
            }
            Token::Pipe => {
                let rhs = self.expression(Token::Pipe.lbp())?;
                Ok(Ast::subexpr(left, rhs))
            }
            Token::Or => {
                let rhs = self.expression(Token::Or.lbp())?;
                Ok(Ast::Or(Box::new(left), Box::new(rhs)))
            }
            Token::And => {
                let rhs = self.expression(Token::And.lbp())?;
                Ok(Ast::And(Box::new(left), Box::new(rhs)))
            }
            Token::Eq => self.comparison(Comparator::Eq, left),
            Token::Ne => self.comparison(Comparator::Ne, left),
            Token::Lt => self.comparison(Comparator::Lt, left),
            Token::Lte => self.comparison(Comparator::Lte, left),
            Token::Gt => self.comparison(Comparator::Gt, left),
            Token::Gte => self.comparison(Comparator::Gte, left),
            Token::Flatten => {
                let rhs = self.projection_rhs(Token::Flatten.lbp())?;
                Ok(Ast::projection(Ast::Flatten(Box::new(left)), rhs))
            }
            Token::Filter => self.filter(left),
            Token::LBracket => match self.peek() {
                Token::Number(_) | Token::Colon => self.index_or_slice(left),
                Token::Star => {
                    self.advance();
                    self.expect(&Token::RBracket)?;
                    let rhs = self.projection_rhs(Token::Star.lbp())?;
                    Ok(Ast::projection(left, rhs))
                }
                other => Err(self.error(format!("unexpected token {other:?} after '['"))),
            },
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    fn comparison(&mut self, op: Comparator, left: Ast) -> Result<Ast, ParseError> {
        let rhs = self.expression(Token::Eq.lbp())?;
        Ok(Ast::Comparison {
            op,
            lhs: Box::new(left),
            rhs: Box::new(rhs),
        })
    }

    /// Right-hand side of a projection: everything binding tighter than a pipe or comparator
    fn projection_rhs(&mut self, bp: usize) -> Result<Ast, ParseError> {
        match self.peek() {
            t if t.lbp() < PROJECTION_STOP => Ok(Ast::Identity),
            Token::LBracket | Token::Filter => self.expression(bp),
            Token::Dot => {
                self.advance();
                self.dot_rhs(bp)
            }
            other => Err(self.error(format!("unexpected token {other:?} in projection"))),
        }
    }

    fn dot_rhs(&mut self, bp: usize) -> Result<Ast, ParseError> {
        match self.peek() {
            Token::Identifier(_) | Token::QuotedIdentifier(_) | Token::Star | Token::LBrace => {
                self.expression(bp)
            }
            Token::LBracket => {
                self.advance();
                self.multi_list()
            }
            other => Err(self.error(format!("unexpected token {other:?} after '.'"))),
        }
    }

    fn filter(&mut self, left: Ast) -> Result<Ast, ParseError> {
        let predicate = self.expression(0)?;
        self.expect(&Token::RBracket)?;
        let then = self.projection_rhs(Token::Filter.lbp())?;
        Ok(Ast::projection(
            left,
            Ast::Condition {
                predicate: Box::new(predicate),
                then: Box::new(then),
            },
        ))
    }

    /// Parses `[n]` or `[start:stop:step]`; the opening bracket is already consumed
    fn index_or_slice(&mut self, left: Ast) -> Result<Ast, ParseError> {
        let mut parts: [Option<i64>; 3] = [None, None, None];
        let mut slot = 0;
        loop {
            match self.advance() {
                Token::Number(n) => {
                    if parts[slot].is_some() {
                        return Err(self.error("expected ':' or ']'"));
                    }
                    parts[slot] = Some(n);
                }
                Token::Colon => {
                    slot += 1;
                    if slot > 2 {
                        return Err(self.error("too many colons in slice"));
                    }
                }
                Token::RBracket => break,
                other => {
                    return Err(self.error(format!("unexpected token {other:?} in index")));
                }
            }
        }

        if slot == 0 {
            let index = parts[0].ok_or_else(|| self.error("expected index"))?;
            return Ok(Ast::subexpr(left, Ast::Index(index)));
        }

        let step = parts[2].unwrap_or(1);
        if step == 0 {
            return Err(self.error("slice step cannot be 0"));
        }
        let slice = Ast::Slice {
            start: parts[0],
            stop: parts[1],
            step,
        };
        let rhs = self.projection_rhs(Token::Star.lbp())?;
        Ok(Ast::projection(Ast::subexpr(left, slice), rhs))
    }

    fn multi_list(&mut self) -> Result<Ast, ParseError> {
        let mut items = Vec::new();
        loop {
            items.push(self.expression(0)?);
            match self.advance() {
                Token::Comma => {}
                Token::RBracket => break,
                other => {
                    return Err(self.error(format!("expected ',' or ']', found {other:?}")));
                }
            }
        }
        Ok(Ast::MultiList(items))
    }

    fn multi_hash(&mut self) -> Result<Ast, ParseError> {
        let mut entries = Vec::new();
        loop {
            let key = match self.advance() {
                Token::Identifier(name) | Token::QuotedIdentifier(name) => name,
                other => return Err(self.error(format!("expected key, found {other:?}"))),
            };
            self.expect(&Token::Colon)?;
            let value = self.expression(0)?;
            entries.push((key, value));
            match self.advance() {
                Token::Comma => {}
                Token::RBrace => break,
                other => {
                    return Err(self.error(format!("expected ',' or '}}', found {other:?}")));
                }
            }
        }
        Ok(Ast::MultiHash(entries))
    }

    fn function(&mut self, name: String) -> Result<Ast, ParseError> {
        let mut args = Vec::new();
        if self.peek() == &Token::RParen {
            self.advance();
            return Ok(Ast::Function { name, args });
        }
        loop {
            args.push(self.expression(0)?);
            match self.advance() {
                Token::Comma => {}
                Token::RParen => break,
                other => {
                    return Err(self.error(format!("expected ',' or ')', found {other:?}")));
                }
            }
        }
        Ok(Ast::Function { name, args })
    }
}
