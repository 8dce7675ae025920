//! Simulated broker: cash account, a single long-only position, and fills.
//!
//! The position is a two-state machine, FLAT (no position) and LONG (size > 0):
//!
//! | action | FLAT                  | LONG                  |
//! |--------|-----------------------|-----------------------|
//! | buy    | enter long            | no-op (no averaging)  |
//! | sell   | no-op                 | close, emit round trip|
//! | exit   | no-op                 | close, emit round trip|
//! | hold   | no-op                 | no-op                 |
//!
//! Fills happen at the current bar's close. Commission is charged on both legs
//! as `notional * commission_rate`. Cash never goes below zero: there is no margin.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::ohlcv::Bar;
use super::strategy::Action;

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub commission_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub size: u64,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub entry_commission: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.size as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.size as f64 * (price - self.entry_price)
    }

    pub fn entry_notional(&self) -> f64 {
        self.size as f64 * self.entry_price
    }
}

/// How many units a `buy` acquires.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum PositionSizing {
    /// As many whole units as the cash covers, commission included.
    #[default]
    AllIn,
    /// A fixed number of units.
    Units(u64),
    /// All-in sizing applied to this fraction of the cash.
    CashFraction(f64),
}

impl PositionSizing {
    /// Units to buy at `price`. Zero means the buy cannot be afforded.
    pub fn units(&self, cash: f64, price: f64, commission_rate: f64) -> u64 {
        let unit_cost = price * (1.0 + commission_rate);
        if !(unit_cost > 0.0) || cash <= 0.0 {
            return 0;
        }

        let affordable = |budget: f64| -> u64 {
            let mut units = (budget / unit_cost).floor() as u64;
            // Floor division can land one unit high after rounding.
            if units > 0 && units as f64 * unit_cost > budget {
                units -= 1;
            }
            units
        };

        match *self {
            PositionSizing::AllIn => affordable(cash),
            PositionSizing::CashFraction(fraction) => affordable(cash * fraction.clamp(0.0, 1.0)),
            PositionSizing::Units(n) => {
                if n as f64 * unit_cost <= cash {
                    n
                } else {
                    0
                }
            }
        }
    }
}

pub fn calculate_commission(notional: f64, commission_rate: f64) -> f64 {
    notional * commission_rate
}

/// A LONG -> FLAT transition: one finished round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedPosition {
    pub size: u64,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Net of both commissions.
    pub pnl: f64,
    /// `pnl` relative to entry notional, in percent.
    pub pnl_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Hold,
    AlreadyLong,
    NoPosition,
    InsufficientFunds,
}

/// What the broker did with one action.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Entered {
        size: u64,
        price: f64,
        commission: f64,
    },
    Exited(ClosedPosition),
    Skipped(SkipReason),
}

#[derive(Debug, Clone)]
pub struct Broker {
    account: Account,
    position: Option<Position>,
    sizing: PositionSizing,
}

impl Broker {
    pub fn new(initial_cash: f64, commission_rate: f64, sizing: PositionSizing) -> Self {
        Broker {
            account: Account {
                cash: initial_cash,
                commission_rate,
            },
            position: None,
            sizing,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn cash(&self) -> f64 {
        self.account.cash
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn position_size(&self) -> u64 {
        self.position.as_ref().map_or(0, |p| p.size)
    }

    pub fn is_long(&self) -> bool {
        self.position.is_some()
    }

    /// Mark-to-market account value at `price`.
    pub fn value(&self, price: f64) -> f64 {
        self.account.cash + self.position.as_ref().map_or(0.0, |p| p.market_value(price))
    }

    /// Dispatch one action at the bar's close.
    pub fn execute(&mut self, action: Action, bar: &Bar) -> Fill {
        match action {
            Action::Buy => self.buy(bar),
            Action::Sell | Action::Exit => match self.close(bar) {
                Some(closed) => Fill::Exited(closed),
                None => Fill::Skipped(SkipReason::NoPosition),
            },
            Action::Hold => Fill::Skipped(SkipReason::Hold),
        }
    }

    /// Enter a long position sized by the broker's sizing policy.
    ///
    /// A buy while already long is ignored. A buy that cannot afford a single
    /// unit is logged and ignored.
    pub fn buy(&mut self, bar: &Bar) -> Fill {
        if self.position.is_some() {
            return Fill::Skipped(SkipReason::AlreadyLong);
        }

        let price = bar.close;
        let rate = self.account.commission_rate;
        let size = self.sizing.units(self.account.cash, price, rate);

        if size == 0 {
            warn!(
                date = %bar.date,
                cash = self.account.cash,
                price,
                "insufficient funds to buy one unit, skipping"
            );
            return Fill::Skipped(SkipReason::InsufficientFunds);
        }

        let cost = size as f64 * price;
        let commission = calculate_commission(cost, rate);
        self.account.cash -= cost + commission;

        self.position = Some(Position {
            size,
            entry_price: price,
            entry_date: bar.date,
            entry_commission: commission,
        });

        debug!(date = %bar.date, size, price, commission, cash = self.account.cash, "buy filled");

        Fill::Entered {
            size,
            price,
            commission,
        }
    }

    /// Sell the whole position. `None` when flat.
    pub fn sell(&mut self, bar: &Bar) -> Option<ClosedPosition> {
        let position = self.position.take()?;

        let exit_price = bar.close;
        let exit_value = position.market_value(exit_price);
        let exit_commission = calculate_commission(exit_value, self.account.commission_rate);

        self.account.cash += exit_value - exit_commission;

        let pnl = position.unrealized_pnl(exit_price) - position.entry_commission - exit_commission;
        let entry_notional = position.entry_notional();
        let pnl_pct = if entry_notional > 0.0 {
            pnl / entry_notional * 100.0
        } else {
            0.0
        };

        debug!(
            date = %bar.date,
            size = position.size,
            price = exit_price,
            commission = exit_commission,
            pnl,
            cash = self.account.cash,
            "sell filled"
        );

        Some(ClosedPosition {
            size: position.size,
            entry_date: position.entry_date,
            exit_date: bar.date,
            entry_price: position.entry_price,
            exit_price,
            pnl,
            pnl_pct,
        })
    }

    /// Explicit close. Same effect as [`Broker::sell`].
    pub fn close(&mut self, bar: &Bar) -> Option<ClosedPosition> {
        self.sell(bar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bar(d: u32, close: f64) -> Bar {
        Bar::flat(NaiveDate::from_ymd_opt(2024, 1, d).unwrap(), close)
    }

    #[test]
    fn commission_is_proportional() {
        assert_abs_diff_eq!(calculate_commission(10_000.0, 0.001), 10.0, epsilon = 1e-12);
        assert_eq!(calculate_commission(10_000.0, 0.0), 0.0);
    }

    #[test]
    fn all_in_sizing_includes_commission() {
        // 10_000 / (100 * 1.01) = 99.0099 -> 99
        assert_eq!(PositionSizing::AllIn.units(10_000.0, 100.0, 0.01), 99);
        assert_eq!(PositionSizing::AllIn.units(10_000.0, 100.0, 0.0), 100);
    }

    #[test]
    fn all_in_sizing_zero_when_unaffordable() {
        assert_eq!(PositionSizing::AllIn.units(50.0, 100.0, 0.0), 0);
        assert_eq!(PositionSizing::AllIn.units(0.0, 100.0, 0.0), 0);
    }

    #[test]
    fn fixed_units_sizing() {
        assert_eq!(PositionSizing::Units(10).units(10_000.0, 100.0, 0.01), 10);
        assert_eq!(PositionSizing::Units(100).units(10_000.0, 100.0, 0.01), 0);
    }

    #[test]
    fn cash_fraction_sizing() {
        assert_eq!(PositionSizing::CashFraction(0.25).units(10_000.0, 100.0, 0.0), 25);
        assert_eq!(PositionSizing::CashFraction(2.0).units(10_000.0, 100.0, 0.0), 100);
    }

    #[test]
    fn buy_from_flat_enters_long() {
        let mut broker = Broker::new(10_000.0, 0.0, PositionSizing::AllIn);
        let fill = broker.buy(&bar(1, 100.0));

        assert_eq!(
            fill,
            Fill::Entered {
                size: 100,
                price: 100.0,
                commission: 0.0
            }
        );
        assert!(broker.is_long());
        assert_eq!(broker.position_size(), 100);
        assert_abs_diff_eq!(broker.cash(), 0.0, epsilon = 1e-9);
        let pos = broker.position().unwrap();
        assert_eq!(pos.entry_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(pos.entry_price, 100.0);
    }

    #[test]
    fn buy_while_long_is_noop() {
        let mut broker = Broker::new(10_000.0, 0.0, PositionSizing::Units(10));
        broker.buy(&bar(1, 100.0));
        let cash = broker.cash();

        assert_eq!(broker.buy(&bar(2, 90.0)), Fill::Skipped(SkipReason::AlreadyLong));
        assert_eq!(broker.position_size(), 10);
        assert_eq!(broker.cash(), cash);
        assert_eq!(broker.position().unwrap().entry_price, 100.0);
    }

    #[test]
    fn buy_with_insufficient_funds_is_noop() {
        let mut broker = Broker::new(50.0, 0.0, PositionSizing::AllIn);
        assert_eq!(
            broker.buy(&bar(1, 100.0)),
            Fill::Skipped(SkipReason::InsufficientFunds)
        );
        assert!(!broker.is_long());
        assert_eq!(broker.cash(), 50.0);
    }

    #[test]
    fn buy_debits_cost_plus_commission() {
        let mut broker = Broker::new(10_000.0, 0.01, PositionSizing::Units(10));
        broker.buy(&bar(1, 100.0));
        // 10 * 100 * 1.01 = 1010
        assert_abs_diff_eq!(broker.cash(), 8_990.0, epsilon = 1e-9);
    }

    #[test]
    fn round_trip_pnl_net_of_commission() {
        let mut broker = Broker::new(10_000.0, 0.01, PositionSizing::Units(10));
        broker.buy(&bar(1, 100.0));
        let closed = broker.sell(&bar(5, 110.0)).unwrap();

        // gross 100, entry commission 10, exit commission 11
        assert_abs_diff_eq!(closed.pnl, 79.0, epsilon = 1e-9);
        assert_abs_diff_eq!(closed.pnl_pct, 7.9, epsilon = 1e-9);
        assert_eq!(closed.size, 10);
        assert_eq!(closed.entry_price, 100.0);
        assert_eq!(closed.exit_price, 110.0);
        assert_eq!(closed.entry_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(closed.exit_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_abs_diff_eq!(broker.cash(), 10_079.0, epsilon = 1e-9);
        assert!(!broker.is_long());
    }

    #[test]
    fn sell_while_flat_is_none() {
        let mut broker = Broker::new(10_000.0, 0.0, PositionSizing::AllIn);
        assert!(broker.sell(&bar(1, 100.0)).is_none());
        assert_eq!(broker.cash(), 10_000.0);
    }

    #[test]
    fn execute_dispatches_each_action() {
        let mut broker = Broker::new(1_000.0, 0.0, PositionSizing::AllIn);

        assert_eq!(broker.execute(Action::Hold, &bar(1, 10.0)), Fill::Skipped(SkipReason::Hold));
        assert_eq!(
            broker.execute(Action::Sell, &bar(1, 10.0)),
            Fill::Skipped(SkipReason::NoPosition)
        );
        assert_eq!(
            broker.execute(Action::Exit, &bar(1, 10.0)),
            Fill::Skipped(SkipReason::NoPosition)
        );
        assert!(matches!(
            broker.execute(Action::Buy, &bar(2, 10.0)),
            Fill::Entered { size: 100, .. }
        ));
        assert_eq!(broker.execute(Action::Hold, &bar(3, 12.0)), Fill::Skipped(SkipReason::Hold));
        assert!(broker.is_long());
        assert!(matches!(broker.execute(Action::Exit, &bar(4, 12.0)), Fill::Exited(_)));
        assert!(!broker.is_long());
        assert_abs_diff_eq!(broker.cash(), 1_200.0, epsilon = 1e-9);
    }

    #[test]
    fn sell_and_exit_are_equivalent() {
        let run = |action: Action| {
            let mut broker = Broker::new(1_000.0, 0.002, PositionSizing::AllIn);
            broker.buy(&bar(1, 10.0));
            let fill = broker.execute(action, &bar(2, 11.0));
            (fill, broker.cash())
        };
        assert_eq!(run(Action::Sell), run(Action::Exit));
    }

    #[test]
    fn value_is_mark_to_market() {
        let mut broker = Broker::new(1_000.0, 0.0, PositionSizing::Units(5));
        assert_eq!(broker.value(10.0), 1_000.0);
        broker.buy(&bar(1, 100.0));
        assert_abs_diff_eq!(broker.value(120.0), 500.0 + 600.0, epsilon = 1e-9);
    }

    #[test]
    fn cash_never_negative_after_all_in_buy() {
        for &(cash, price, rate) in &[
            (10_000.0, 3.0, 0.001),
            (9_999.99, 0.07, 0.0025),
            (1_234.56, 7.89, 0.01),
            (100.0, 33.333333, 0.0),
        ] {
            let mut broker = Broker::new(cash, rate, PositionSizing::AllIn);
            broker.buy(&bar(1, price));
            assert!(broker.cash() >= -1e-9, "cash {} went negative", broker.cash());
        }
    }

    #[test]
    fn zero_pnl_round_trip() {
        let mut broker = Broker::new(1_000.0, 0.0, PositionSizing::Units(1));
        broker.buy(&bar(1, 50.0));
        let closed = broker.close(&bar(2, 50.0)).unwrap();
        assert_eq!(closed.pnl, 0.0);
        assert_eq!(closed.pnl_pct, 0.0);
    }
}
