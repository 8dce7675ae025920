//! Bar-by-bar strategy execution.
//!
//! The engine owns every piece of per-run state (moving-average window, broker,
//! trade tracker) so independent runs never share anything. Each call to
//! [`StrategyEngine::step`] consumes exactly one bar, in chronological order,
//! and only ever looks at that bar and the ones already pushed.
//!
//! Warm-up: until `sma_period` closes have been seen the bar is only fed to the
//! moving average, with no decision and no equity point.
//! Active: compute the SMA, evaluate the condition, dispatch the THEN or ELSE
//! action to the broker, record the post-decision equity point.

use tracing::{debug, warn};

use super::broker::{Broker, Fill};
use super::condition::Condition;
use super::condition_eval::{evaluate_condition, EvaluationContext};
use super::condition_parser;
use super::indicator::SmaWindow;
use super::ohlcv::Bar;
use super::strategy::{Action, RuleSpec};
use super::trade_tracker::{BacktestSummary, EquityPoint, TradeTracker};

/// What happened on one active bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarDecision {
    pub context: EvaluationContext,
    pub condition: bool,
    pub action: Action,
    pub fill: Fill,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct StrategyEngine {
    rule: RuleSpec,
    condition: Option<Condition>,
    sma: SmaWindow,
    broker: Broker,
    tracker: TradeTracker,
    bars_seen: usize,
    last_close: Option<f64>,
}

impl StrategyEngine {
    /// The condition text is parsed once here. Text that does not parse makes
    /// the condition false on every bar, so the ELSE action always runs.
    pub fn new(rule: RuleSpec, sma_period: usize, broker: Broker) -> Self {
        let condition = match condition_parser::parse(&rule.if_condition) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(
                    condition = %rule.if_condition,
                    error = %e,
                    "condition does not parse, it will evaluate to false on every bar"
                );
                None
            }
        };
        let tracker = TradeTracker::new(broker.value(0.0));

        StrategyEngine {
            rule,
            condition,
            sma: SmaWindow::new(sma_period),
            broker,
            tracker,
            bars_seen: 0,
            last_close: None,
        }
    }

    pub fn rule(&self) -> &RuleSpec {
        &self.rule
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn tracker(&self) -> &TradeTracker {
        &self.tracker
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn is_warm(&self) -> bool {
        self.sma.is_warm()
    }

    /// Process one bar. Returns `None` while warming up.
    pub fn step(&mut self, bar: &Bar) -> Option<BarDecision> {
        self.bars_seen += 1;
        self.last_close = Some(bar.close);

        let sma = self.sma.push(bar.close)?;

        let context = EvaluationContext {
            price: bar.close,
            sma,
            position_size: self.broker.position_size(),
        };
        let condition = self
            .condition
            .as_ref()
            .is_some_and(|c| evaluate_condition(c, &context));
        let action = self.rule.action_for(condition);

        debug!(
            date = %bar.date,
            price = bar.close,
            sma,
            condition,
            position = context.position_size,
            %action,
            "bar"
        );

        let fill = self.broker.execute(action, bar);
        if let Fill::Exited(ref closed) = fill {
            self.tracker.record_close(closed);
        }

        let value = self.broker.value(bar.close);
        self.tracker.record_bar(EquityPoint {
            date: bar.date,
            value,
            price: bar.close,
            sma,
        });

        Some(BarDecision {
            context,
            condition,
            action,
            fill,
            value,
        })
    }

    /// Mark-to-market value at the last close seen. An open position is
    /// valued, never closed.
    pub fn final_value(&self) -> f64 {
        match self.last_close {
            Some(close) => self.broker.value(close),
            None => self.broker.cash(),
        }
    }

    pub fn finish(self) -> BacktestSummary {
        let final_value = self.final_value();
        self.tracker.into_summary(final_value)
    }
}
