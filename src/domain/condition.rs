//! Condition AST.
//!
//! A condition is a single binary comparison between two operands:
//! - `Operand`: the current close (`price`), the moving average (`sma`), or a constant
//! - `Comparator`: `>`, `<` or `==`
//! - `Condition`: `<left> <op> <right>`

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Price,
    Sma,
    Constant(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Greater,
    Less,
    Equal,
}

impl Comparator {
    /// Operators in the order the parser looks for them.
    pub const PRIORITY: [Comparator; 3] = [Comparator::Greater, Comparator::Less, Comparator::Equal];

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Greater => ">",
            Comparator::Less => "<",
            Comparator::Equal => "==",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub left: Operand,
    pub op: Comparator,
    pub right: Operand,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Price => write!(f, "price"),
            Operand::Sma => write!(f, "sma"),
            Operand::Constant(v) => write!(f, "{}", v),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}
