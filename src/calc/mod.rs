//! Arithmetic expressions over sibling CDE values.
//!
//! Calculated CDEs carry a small expression: numeric literals, CDE code
//! references, `+ - * /`, unary minus, and parentheses. Expressions are
//! compiled when the field descriptor is built (a parse failure there is
//! a configuration error) and evaluated at bind time against the values
//! of sibling fields.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("unexpected character `{0}` in expression")]
    UnexpectedChar(char),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected trailing input `{0}`")]
    TrailingInput(String),

    #[error("expression references `{0}` which has no numeric value")]
    UnknownReference(String),

    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Sub => 1,
            Self::Mul | Self::Div => 2,
        }
    }
}

/// A compiled calculation expression.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcExpr {
    Number(f64),
    Ref(String),
    Negate(Box<CalcExpr>),
    Binary(BinaryOp, Box<CalcExpr>, Box<CalcExpr>),
}

impl CalcExpr {
    /// Compile an expression source string.
    pub fn parse(src: &str) -> Result<Self, CalcError> {
        let tokens = tokenize(src)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expression(0)?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(CalcError::TrailingInput(format!("{tok:?}"))),
        }
    }

    /// Evaluate against a resolver from CDE code to numeric value.
    pub fn evaluate<F>(&self, resolve: &F) -> Result<f64, CalcError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Ref(code) => {
                resolve(code).ok_or_else(|| CalcError::UnknownReference(code.clone()))
            }
            Self::Negate(inner) => Ok(-inner.evaluate(resolve)?),
            Self::Binary(op, lhs, rhs) => {
                let l = lhs.evaluate(resolve)?;
                let r = rhs.evaluate(resolve)?;
                match op {
                    BinaryOp::Add => Ok(l + r),
                    BinaryOp::Sub => Ok(l - r),
                    BinaryOp::Mul => Ok(l * r),
                    BinaryOp::Div => {
                        if r == 0.0 {
                            Err(CalcError::DivisionByZero)
                        } else {
                            Ok(l / r)
                        }
                    }
                }
            }
        }
    }

    /// CDE codes referenced by this expression.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Number(_) => {}
            Self::Ref(code) => out.push(code),
            Self::Negate(inner) => inner.collect_references(out),
            Self::Binary(_, lhs, rhs) => {
                lhs.collect_references(out);
                rhs.collect_references(out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(BinaryOp),
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Op(BinaryOp::Add));
            }
            '-' => {
                chars.next();
                tokens.push(Token::Op(BinaryOp::Sub));
            }
            '*' => {
                chars.next();
                tokens.push(Token::Op(BinaryOp::Mul));
            }
            '/' => {
                chars.next();
                tokens.push(Token::Op(BinaryOp::Div));
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '0'..='9' | '.' => {
                let mut lit = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        lit.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = lit
                    .parse()
                    .map_err(|_| CalcError::UnexpectedChar(lit.chars().last().unwrap_or('.')))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(CalcError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    // Precedence climbing.
    fn expression(&mut self, min_precedence: u8) -> Result<CalcExpr, CalcError> {
        let mut lhs = self.primary()?;

        while let Some(Token::Op(op)) = self.peek().cloned() {
            if op.precedence() < min_precedence {
                break;
            }
            self.next();
            let rhs = self.expression(op.precedence() + 1)?;
            lhs = CalcExpr::Binary(op, Box::new(lhs), Box::new(rhs));
        }

        Ok(lhs)
    }

    fn primary(&mut self) -> Result<CalcExpr, CalcError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(CalcExpr::Number(n)),
            Some(Token::Ident(code)) => Ok(CalcExpr::Ref(code)),
            Some(Token::Op(BinaryOp::Sub)) => {
                let inner = self.primary()?;
                Ok(CalcExpr::Negate(Box::new(inner)))
            }
            Some(Token::LParen) => {
                let inner = self.expression(0)?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(tok) => Err(CalcError::TrailingInput(format!("{tok:?}"))),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(tok) => Err(CalcError::TrailingInput(format!("{tok:?}"))),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str, resolve: impl Fn(&str) -> Option<f64>) -> Result<f64, CalcError> {
        CalcExpr::parse(src).unwrap().evaluate(&resolve)
    }

    #[test]
    fn literal_arithmetic() {
        assert_eq!(eval("1 + 2 * 3", |_| None).unwrap(), 7.0);
        assert_eq!(eval("(1 + 2) * 3", |_| None).unwrap(), 9.0);
        assert_eq!(eval("-2 + 5", |_| None).unwrap(), 3.0);
        assert_eq!(eval("10 / 4", |_| None).unwrap(), 2.5);
    }

    #[test]
    fn sibling_references() {
        let resolve = |code: &str| match code {
            "WEIGHT" => Some(80.0),
            "HEIGHT" => Some(2.0),
            _ => None,
        };
        assert_eq!(eval("WEIGHT / (HEIGHT * HEIGHT)", resolve).unwrap(), 20.0);
    }

    #[test]
    fn unknown_reference_is_reported() {
        let err = eval("MISSING + 1", |_| None).unwrap_err();
        assert_eq!(err, CalcError::UnknownReference("MISSING".into()));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let err = eval("1 / 0", |_| None).unwrap_err();
        assert_eq!(err, CalcError::DivisionByZero);
    }

    #[test]
    fn parse_errors() {
        assert!(CalcExpr::parse("1 +").is_err());
        assert!(CalcExpr::parse("AGE ^ 2").is_err());
        assert!(CalcExpr::parse("(1 + 2").is_err());
    }

    #[test]
    fn references_collects_in_order() {
        let expr = CalcExpr::parse("WEIGHT / (HEIGHT * HEIGHT)").unwrap();
        assert_eq!(expr.references(), vec!["WEIGHT", "HEIGHT", "HEIGHT"]);
    }
}
