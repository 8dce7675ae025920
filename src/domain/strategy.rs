//! Trading rule specification: an IF condition with THEN/ELSE actions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::RuletraderError;

/// Action dispatched to the broker for a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Exit,
    Hold,
}

impl FromStr for Action {
    type Err = RuletraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Action::Buy),
            "sell" => Ok(Action::Sell),
            "exit" => Ok(Action::Exit),
            "hold" => Ok(Action::Hold),
            _ => Err(RuletraderError::InvalidAction {
                token: s.trim().to_string(),
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
            Action::Exit => "exit",
            Action::Hold => "hold",
        };
        f.write_str(s)
    }
}

/// User-supplied rule. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub if_condition: String,
    pub then_action: Action,
    pub else_action: Action,
}

impl RuleSpec {
    pub fn new(if_condition: impl Into<String>, then_action: Action, else_action: Action) -> Self {
        RuleSpec {
            if_condition: if_condition.into(),
            then_action,
            else_action,
        }
    }

    /// Build a rule from raw action tokens, rejecting anything outside
    /// buy/sell/exit/hold.
    pub fn from_tokens(
        if_condition: &str,
        then_token: &str,
        else_token: &str,
    ) -> Result<Self, RuletraderError> {
        Ok(RuleSpec {
            if_condition: if_condition.to_string(),
            then_action: then_token.parse()?,
            else_action: else_token.parse()?,
        })
    }

    pub fn action_for(&self, condition: bool) -> Action {
        if condition {
            self.then_action
        } else {
            self.else_action
        }
    }
}

impl Default for RuleSpec {
    fn default() -> Self {
        RuleSpec::new("price > sma", Action::Buy, Action::Hold)
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IF {} THEN {} ELSE {}",
            self.if_condition, self.then_action, self.else_action
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parse_case_insensitive_and_trimmed() {
        assert_eq!("BUY".parse::<Action>().unwrap(), Action::Buy);
        assert_eq!(" Sell ".parse::<Action>().unwrap(), Action::Sell);
        assert_eq!("exit".parse::<Action>().unwrap(), Action::Exit);
        assert_eq!("Hold".parse::<Action>().unwrap(), Action::Hold);
    }

    #[test]
    fn action_parse_rejects_unknown() {
        let err = "short".parse::<Action>().unwrap_err();
        assert!(matches!(err, RuletraderError::InvalidAction { ref token } if token == "short"));
        assert!("".parse::<Action>().is_err());
    }

    #[test]
    fn action_display_roundtrips_token() {
        for action in [Action::Buy, Action::Sell, Action::Exit, Action::Hold] {
            assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn rule_from_tokens() {
        let rule = RuleSpec::from_tokens("price > sma", "buy", "exit").unwrap();
        assert_eq!(rule.then_action, Action::Buy);
        assert_eq!(rule.else_action, Action::Exit);
        assert!(RuleSpec::from_tokens("price > sma", "buy", "cover").is_err());
    }

    #[test]
    fn action_for_branches() {
        let rule = RuleSpec::new("price > sma", Action::Buy, Action::Sell);
        assert_eq!(rule.action_for(true), Action::Buy);
        assert_eq!(rule.action_for(false), Action::Sell);
    }

    #[test]
    fn default_rule() {
        let rule = RuleSpec::default();
        assert_eq!(rule.to_string(), "IF price > sma THEN buy ELSE hold");
    }

    #[test]
    fn action_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Action::Exit).unwrap(), "\"exit\"");
    }
}
