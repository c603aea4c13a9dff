//! Parser for the formula surface syntax:
//!
//! ```text
//! formula  ::= conj ("or" conj)*
//! conj     ::= unary ("and" unary)*
//! unary    ::= "not" unary
//!            | ("exists" | "forall") ident+ "." unary
//!            | "(" formula ")"
//!            | ident "(" ident ("," ident)* ")"
//! ```
//!
//! `and`/`or` chains associate to the left; a quantifier binds the formula
//! immediately following the dot, so composite bodies are parenthesized.
//! Multi-binder quantifiers (`exists x y.(…)`) desugar into nested single
//! binders.

use crate::error::EvalError;
use crate::formula::Formula;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    LParen,
    RParen,
    Comma,
    Dot,
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, EvalError> {
    let mut tokens = vec![];
    let mut chars = input.char_indices().peekable();
    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((offset, Token::LParen));
            }
            ')' => {
                chars.next();
                tokens.push((offset, Token::RParen));
            }
            ',' => {
                chars.next();
                tokens.push((offset, Token::Comma));
            }
            '.' => {
                chars.next();
                tokens.push((offset, Token::Dot));
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((offset, Token::Ident(ident)));
            }
            other => {
                return Err(EvalError::Parse {
                    message: format!("unexpected character {other:?}"),
                    offset,
                });
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.len, |(o, _)| *o)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> EvalError {
        EvalError::Parse {
            message: message.into(),
            offset: self.offset(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), EvalError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w == keyword)
    }

    fn formula(&mut self) -> Result<Formula, EvalError> {
        let mut lhs = self.conjunction()?;
        while self.at_keyword("or") {
            self.pos += 1;
            lhs = lhs.or(self.conjunction()?);
        }
        Ok(lhs)
    }

    fn conjunction(&mut self) -> Result<Formula, EvalError> {
        let mut lhs = self.unary()?;
        while self.at_keyword("and") {
            self.pos += 1;
            lhs = lhs.and(self.unary()?);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Formula, EvalError> {
        if self.at_keyword("not") {
            self.pos += 1;
            return Ok(self.unary()?.negated());
        }
        if self.at_keyword("exists") || self.at_keyword("forall") {
            let universal = self.at_keyword("forall");
            self.pos += 1;
            let mut binders = vec![];
            while let Some(Token::Ident(name)) = self.peek() {
                if name == "and" || name == "or" || name == "not" {
                    return Err(self.error("keyword cannot be used as a variable"));
                }
                binders.push(name.clone());
                self.pos += 1;
            }
            if binders.is_empty() {
                return Err(self.error("expected at least one bound variable"));
            }
            self.expect(Token::Dot, "`.` after the bound variables")?;
            let mut body = self.unary()?;
            for var in binders.into_iter().rev() {
                body = if universal {
                    Formula::forall(var, body)
                } else {
                    Formula::exists(var, body)
                };
            }
            return Ok(body);
        }
        match self.bump() {
            Some(Token::LParen) => {
                let inner = self.formula()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::Ident(relation)) => {
                self.expect(Token::LParen, "`(` after a relation symbol")?;
                let mut args = vec![];
                loop {
                    match self.bump() {
                        Some(Token::Ident(arg)) => args.push(arg),
                        _ => {
                            self.pos -= 1;
                            return Err(self.error("expected a variable"));
                        }
                    }
                    match self.bump() {
                        Some(Token::Comma) => continue,
                        Some(Token::RParen) => break,
                        _ => {
                            self.pos -= 1;
                            return Err(self.error("expected `,` or `)`"));
                        }
                    }
                }
                Ok(Formula::Apply { relation, args })
            }
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error("expected a formula"))
            }
        }
    }
}

/// Parses a formula in the surface syntax.
pub fn parse(input: &str) -> Result<Formula, EvalError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        len: input.len(),
    };
    let formula = parser.formula()?;
    if parser.peek().is_some() {
        return Err(parser.error("trailing input after the formula"));
    }
    Ok(formula)
}

#[cfg(test)]
mod tests {
    use super::parse;
    use crate::formula::Formula;

    #[test]
    fn atoms_and_connectives() {
        assert_eq!(parse("A(x,y,z)").unwrap(), Formula::apply("A", ["x", "y", "z"]));
        assert_eq!(
            parse("Z(x) and B(x,y)").unwrap(),
            Formula::apply("Z", ["x"]).and(Formula::apply("B", ["x", "y"]))
        );
        // `and` binds tighter than `or`, both chain to the left.
        assert_eq!(
            parse("U(x) or U(y) and U(z) or U(w)").unwrap(),
            Formula::apply("U", ["x"])
                .or(Formula::apply("U", ["y"]).and(Formula::apply("U", ["z"])))
                .or(Formula::apply("U", ["w"]))
        );
    }

    #[test]
    fn negation_and_quantifiers() {
        assert_eq!(
            parse("not Z(z)").unwrap(),
            Formula::apply("Z", ["z"]).negated()
        );
        assert_eq!(
            parse("exists z.(Z(z) and A(x,z,y))").unwrap(),
            Formula::exists(
                "z",
                Formula::apply("Z", ["z"]).and(Formula::apply("A", ["x", "z", "y"]))
            )
        );
        assert_eq!(
            parse("exists a z0.(A0(x,y,a))").unwrap(),
            Formula::exists("a", Formula::exists("z0", Formula::apply("A0", ["x", "y", "a"])))
        );
        assert_eq!(
            parse("forall x.(U(x))").unwrap(),
            Formula::forall("x", Formula::apply("U", ["x"]))
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("").is_err());
        assert!(parse("A(x,)").is_err());
        assert!(parse("exists .(U(x))").is_err());
        assert!(parse("A(x) and").is_err());
        assert!(parse("A(x))").is_err());
        assert!(parse("A(x) ∧ B(y)").is_err());
    }
}
