//! Condition evaluation against a per-bar context.
//!
//! # Evaluation Semantics
//!
//! - `>` and `<` are strict comparisons
//! - `==` is exact floating-point equality, with no tolerance
//! - Evaluating raw text never fails: text that does not parse evaluates to `false`

use crate::domain::condition::{Comparator, Condition, Operand};
use crate::domain::condition_parser;

/// Values visible to a condition on the current bar. Rebuilt every bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationContext {
    pub price: f64,
    pub sma: f64,
    pub position_size: u64,
}

pub fn evaluate_condition(condition: &Condition, ctx: &EvaluationContext) -> bool {
    let left = resolve_operand(condition.left, ctx);
    let right = resolve_operand(condition.right, ctx);
    match condition.op {
        Comparator::Greater => left > right,
        Comparator::Less => left < right,
        Comparator::Equal => left == right,
    }
}

/// Parse and evaluate `condition` in one go. Any parse failure yields `false`.
pub fn evaluate(condition: &str, ctx: &EvaluationContext) -> bool {
    condition_parser::parse(condition)
        .map(|c| evaluate_condition(&c, ctx))
        .unwrap_or(false)
}

fn resolve_operand(operand: Operand, ctx: &EvaluationContext) -> f64 {
    match operand {
        Operand::Price => ctx.price,
        Operand::Sma => ctx.sma,
        Operand::Constant(v) => v,
    }
}
