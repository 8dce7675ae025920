//! Condition parser.
//!
//! Grammar (case-insensitive): `<operand> <op> <operand>` where `op` is one of
//! `>`, `<`, `==` and an operand is `price`, `sma` or a decimal literal.
//!
//! The operator is located first: `>` is searched for, then `<`, then `==`, and
//! the text is split at the first occurrence of the first operator found. Each
//! side must then hold exactly one operand. Anything else is a [`ParseError`]
//! carrying the byte offset of the fault.

use crate::domain::condition::{Comparator, Condition, Operand};
use crate::domain::error::ParseError;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, start: usize, end: usize) -> Self {
        Self {
            input,
            pos: start,
            end,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..self.end]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if matches!(self.peek(), Some('-') | Some('+')) {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.'))
        {
            return self.parse_number().map(Operand::Constant);
        }

        let word = self.peek_word();
        let operand = match word.as_str() {
            "price" => Operand::Price,
            "sma" => Operand::Sma,
            _ => {
                return Err(ParseError {
                    message: format!("expected price, sma or a number, found '{}'", word),
                    position: self.pos,
                });
            }
        };
        self.pos += word.len();
        Ok(operand)
    }

    /// Parse the whole slice as a single operand.
    fn parse_side(&mut self) -> Result<Operand, ParseError> {
        let operand = self.parse_operand()?;
        self.skip_whitespace();
        if self.pos < self.end {
            return Err(ParseError {
                message: format!("unexpected input after operand: '{}'", self.remaining()),
                position: self.pos,
            });
        }
        Ok(operand)
    }
}

fn find_operator(input: &str) -> Option<(Comparator, usize)> {
    Comparator::PRIORITY
        .iter()
        .find_map(|&op| input.find(op.symbol()).map(|at| (op, at)))
}

pub fn parse(input: &str) -> Result<Condition, ParseError> {
    let lowered = input.to_ascii_lowercase();

    let (op, at) = find_operator(&lowered).ok_or_else(|| ParseError {
        message: "expected comparison operator ('>', '<' or '==')".to_string(),
        position: lowered.len(),
    })?;

    let left = Parser::new(&lowered, 0, at).parse_side()?;
    let right = Parser::new(&lowered, at + op.symbol().len(), lowered.len()).parse_side()?;

    Ok(Condition { left, op, right })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(left: Operand, op: Comparator, right: Operand) -> Condition {
        Condition { left, op, right }
    }

    #[test]
    fn parse_price_above_sma() {
        assert_eq!(
            parse("price > sma").unwrap(),
            cond(Operand::Price, Comparator::Greater, Operand::Sma)
        );
    }

    #[test]
    fn parse_less_than_constant() {
        assert_eq!(
            parse("sma < 101.5").unwrap(),
            cond(Operand::Sma, Comparator::Less, Operand::Constant(101.5))
        );
    }

    #[test]
    fn parse_equality() {
        assert_eq!(
            parse("price == 100").unwrap(),
            cond(Operand::Price, Comparator::Equal, Operand::Constant(100.0))
        );
    }

    #[test]
    fn parse_case_insensitive() {
        assert_eq!(
            parse("PRICE > Sma").unwrap(),
            cond(Operand::Price, Comparator::Greater, Operand::Sma)
        );
    }

    #[test]
    fn parse_without_whitespace() {
        assert_eq!(
            parse("price<sma").unwrap(),
            cond(Operand::Price, Comparator::Less, Operand::Sma)
        );
    }

    #[test]
    fn parse_signed_and_fractional_literals() {
        assert_eq!(
            parse("-5 < price").unwrap(),
            cond(Operand::Constant(-5.0), Comparator::Less, Operand::Price)
        );
        assert_eq!(
            parse("price > .5").unwrap(),
            cond(Operand::Price, Comparator::Greater, Operand::Constant(0.5))
        );
        assert_eq!(
            parse("+2 == sma").unwrap(),
            cond(Operand::Constant(2.0), Comparator::Equal, Operand::Sma)
        );
    }

    #[test]
    fn parse_literal_on_both_sides() {
        assert_eq!(
            parse("3 > 2").unwrap(),
            cond(
                Operand::Constant(3.0),
                Comparator::Greater,
                Operand::Constant(2.0)
            )
        );
    }

    #[test]
    fn greater_wins_over_less_when_both_present() {
        // '>' is located first, so the right side "sma < 3" is rejected.
        let err = parse("price > sma < 3").unwrap_err();
        assert_eq!(err.position, 12);
    }

    #[test]
    fn double_operator_rejected() {
        let err = parse("price >> sma").unwrap_err();
        assert!(err.message.contains("expected price, sma or a number"));
        assert_eq!(err.position, 7);
    }

    #[test]
    fn greater_equal_not_supported() {
        assert!(parse("price >= sma").is_err());
        assert!(parse("price <= sma").is_err());
    }

    #[test]
    fn single_equals_has_no_operator() {
        let err = parse("price = sma").unwrap_err();
        assert!(err.message.contains("expected comparison operator"));
        assert_eq!(err.position, 11);
    }

    #[test]
    fn empty_input() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn missing_operand() {
        let err = parse("price > ").unwrap_err();
        assert!(err.message.contains("end of input"));
        assert_eq!(err.position, 8);

        assert!(parse("> sma").is_err());
    }

    #[test]
    fn identifier_with_token_prefix_rejected() {
        let err = parse("price2 > sma").unwrap_err();
        assert!(err.message.contains("'price2'"));

        assert!(parse("price > smas").is_err());
        assert!(parse("my_price > sma").is_err());
    }

    #[test]
    fn unknown_identifier_rejected() {
        let err = parse("volume > 100").unwrap_err();
        assert!(err.message.contains("'volume'"));
        assert_eq!(err.position, 0);
    }

    #[test]
    fn boolean_composition_rejected() {
        assert!(parse("price > sma and sma > 10").is_err());
    }

    #[test]
    fn malformed_numbers_rejected() {
        assert!(parse("price > 1.2.3").is_err());
        assert!(parse("price > -").is_err());
        assert!(parse("price > 5abc").is_err());
        assert!(parse("price > nan").is_err());
    }
}
