//! Textual expressions
//!
//! A small tokenizer and recursive-descent parser for right-hand-side
//! expressions such as `-sin(x0) - u0` or `k * x^2 / (1 + exp(-t))`.
//! Parsed expressions are lowered onto the scalar graph against a table of
//! known symbols.

use std::collections::HashMap;

use crate::symbolic::errors::SymbolicError;
use crate::symbolic::expr::{BinaryOp, Sx, UnaryOp};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Num(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Number(f64),
    Ident(String),
    Neg(Box<Ast>),
    Binary {
        op: BinaryOp,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    Call {
        name: String,
        args: Vec<Ast>,
    },
}

fn parse_error(source: &str, pos: usize, message: impl Into<String>) -> SymbolicError {
    SymbolicError::Parse {
        source_text: source.to_string(),
        pos,
        message: message.into(),
    }
}

/// Split `s` into tokens, each paired with its character offset
pub fn tokenize(s: &str) -> Result<Vec<(Token, usize)>, SymbolicError> {
    let mut toks = Vec::new();
    let mut chars = s.char_indices().peekable();
    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c.is_ascii_digit() || c == '.' {
            let mut num = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_ascii_digit()
                    || d == '.'
                    || d == 'e'
                    || d == 'E'
                    || ((d == '+' || d == '-') && (num.ends_with('e') || num.ends_with('E')))
                {
                    num.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let value = num
                .parse::<f64>()
                .map_err(|_| parse_error(s, pos, format!("invalid number '{}'", num)))?;
            toks.push((Token::Num(value), pos));
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let mut id = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_ascii_alphanumeric() || d == '_' {
                    id.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            toks.push((Token::Ident(id), pos));
            continue;
        }
        let tok = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '+' | '-' | '*' | '/' | '^' => Token::Op(c),
            _ => return Err(parse_error(s, pos, format!("unexpected character '{}'", c))),
        };
        toks.push((tok, pos));
        chars.next();
    }
    Ok(toks)
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Result<Self, SymbolicError> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, p)| *p)
            .unwrap_or(self.source.len())
    }

    fn error(&self, message: impl Into<String>) -> SymbolicError {
        parse_error(self.source, self.offset(), message)
    }

    fn expect(&mut self, tok: Token, what: &str) -> Result<(), SymbolicError> {
        if self.peek() == Some(&tok) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    /// Parse the whole input as a single expression
    pub fn parse(mut self) -> Result<Ast, SymbolicError> {
        if self.tokens.is_empty() {
            return Err(self.error("empty expression"));
        }
        let ast = self.parse_sum()?;
        if self.pos < self.tokens.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(ast)
    }

    fn parse_sum(&mut self) -> Result<Ast, SymbolicError> {
        let mut node = self.parse_product()?;
        while let Some(Token::Op(c @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.parse_product()?;
            node = Ast::Binary {
                op: if c == '+' { BinaryOp::Add } else { BinaryOp::Sub },
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            };
        }
        Ok(node)
    }

    fn parse_product(&mut self) -> Result<Ast, SymbolicError> {
        let mut node = self.parse_unary()?;
        while let Some(Token::Op(c @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            node = Ast::Binary {
                op: if c == '*' { BinaryOp::Mul } else { BinaryOp::Div },
                lhs: Box::new(node),
                rhs: Box::new(rhs),
            };
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Ast, SymbolicError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(Ast::Neg(Box::new(self.parse_unary()?)))
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // `^` binds tighter than unary minus and associates to the right
    fn parse_power(&mut self) -> Result<Ast, SymbolicError> {
        let base = self.parse_primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.parse_unary()?;
            return Ok(Ast::Binary {
                op: BinaryOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Ast, SymbolicError> {
        match self.peek().cloned() {
            Some(Token::Num(v)) => {
                self.pos += 1;
                Ok(Ast::Number(v))
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if let Some(Token::RParen) = self.peek() {
                        self.pos += 1;
                        return Ok(Ast::Call { name, args });
                    }
                    loop {
                        args.push(self.parse_sum()?);
                        match self.peek() {
                            Some(Token::Comma) => self.pos += 1,
                            _ => break,
                        }
                    }
                    self.expect(Token::RParen, "')' after arguments")?;
                    return Ok(Ast::Call { name, args });
                }
                Ok(Ast::Ident(name))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_sum()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(tok) => Err(self.error(format!("unexpected token {:?}", tok))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

impl Ast {
    /// Build the scalar expression, resolving identifiers in `symbols`
    ///
    /// `pi` refers to the constant unless a symbol of that name exists.
    pub fn lower(&self, symbols: &HashMap<String, Sx>) -> Result<Sx, SymbolicError> {
        match self {
            Ast::Number(v) => Ok(Sx::constant(*v)),
            Ast::Ident(name) => match symbols.get(name) {
                Some(s) => Ok(s.clone()),
                None if name == "pi" => Ok(Sx::constant(std::f64::consts::PI)),
                None => Err(SymbolicError::UndefinedSymbol { name: name.clone() }),
            },
            Ast::Neg(inner) => Ok(-inner.lower(symbols)?),
            Ast::Binary { op, lhs, rhs } => {
                Ok(Sx::binary(*op, &lhs.lower(symbols)?, &rhs.lower(symbols)?))
            }
            Ast::Call { name, args } => match (name.as_str(), args.as_slice()) {
                ("pow", [base, exponent]) => Ok(base.lower(symbols)?.pow(&exponent.lower(symbols)?)),
                (_, [arg]) => match UnaryOp::from_name(name) {
                    Some(op) => Ok(Sx::unary(op, &arg.lower(symbols)?)),
                    None => Err(SymbolicError::UnsupportedFunction {
                        name: name.clone(),
                        arity: 1,
                    }),
                },
                _ => Err(SymbolicError::UnsupportedFunction {
                    name: name.clone(),
                    arity: args.len(),
                }),
            },
        }
    }
}

/// Parse `source` and lower it against `symbols`
pub fn parse_expression(source: &str, symbols: &HashMap<String, Sx>) -> Result<Sx, SymbolicError> {
    Parser::new(source)?.parse()?.lower(symbols)
}
