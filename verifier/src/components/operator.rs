//! Comparison operators carried by restrictions

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Contains,
    Excludes,
    Matches,
    MemberOf,
    SoundsLike,
}

impl Evaluator {
    /// Source-level symbol of the evaluator
    pub fn symbol(&self) -> &'static str {
        match self {
            Evaluator::Equal => "==",
            Evaluator::NotEqual => "!=",
            Evaluator::Less => "<",
            Evaluator::LessOrEqual => "<=",
            Evaluator::Greater => ">",
            Evaluator::GreaterOrEqual => ">=",
            Evaluator::Contains => "contains",
            Evaluator::Excludes => "excludes",
            Evaluator::Matches => "matches",
            Evaluator::MemberOf => "memberOf",
            Evaluator::SoundsLike => "soundslike",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "==" => Evaluator::Equal,
            "!=" => Evaluator::NotEqual,
            "<" => Evaluator::Less,
            "<=" => Evaluator::LessOrEqual,
            ">" => Evaluator::Greater,
            ">=" => Evaluator::GreaterOrEqual,
            "contains" => Evaluator::Contains,
            "excludes" => Evaluator::Excludes,
            "matches" => Evaluator::Matches,
            "memberOf" => Evaluator::MemberOf,
            "soundslike" => Evaluator::SoundsLike,
            _ => return None,
        })
    }

    /// The evaluator that holds exactly when this one does not, if the language has one
    fn complement(&self) -> Option<Self> {
        Some(match self {
            Evaluator::Equal => Evaluator::NotEqual,
            Evaluator::NotEqual => Evaluator::Equal,
            Evaluator::Less => Evaluator::GreaterOrEqual,
            Evaluator::LessOrEqual => Evaluator::Greater,
            Evaluator::Greater => Evaluator::LessOrEqual,
            Evaluator::GreaterOrEqual => Evaluator::Less,
            Evaluator::Contains => Evaluator::Excludes,
            Evaluator::Excludes => Evaluator::Contains,
            Evaluator::Matches | Evaluator::MemberOf | Evaluator::SoundsLike => return None,
        })
    }
}

/// A resolved comparison operator
///
/// Negation is folded into the evaluator whenever a complementary evaluator exists,
/// so `not ==` resolves to `!=` and `not <` to `>=`. Only `matches`, `memberOf` and
/// `soundslike` keep an explicit negation flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Operator {
    pub evaluator: Evaluator,
    pub negated: bool,
}

impl Operator {
    /// Resolve an evaluator symbol and its negation flag.
    ///
    /// The symbol may itself carry a `not ` prefix (`not matches`), which toggles the
    /// flag. Returns `None` for symbols that are not comparison operators.
    pub fn determine(symbol: &str, negated: bool) -> Option<Self> {
        let symbol = symbol.trim();
        let (symbol, negated) = match symbol.strip_prefix("not ") {
            Some(rest) => (rest.trim_start(), !negated),
            None => (symbol, negated),
        };
        let evaluator = Evaluator::from_symbol(symbol)?;

        if !negated {
            return Some(Self {
                evaluator,
                negated: false,
            });
        }

        Some(match evaluator.complement() {
            Some(complement) => Self {
                evaluator: complement,
                negated: false,
            },
            None => Self {
                evaluator,
                negated: true,
            },
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not {}", self.evaluator.symbol())
        } else {
            write!(f, "{}", self.evaluator.symbol())
        }
    }
}
