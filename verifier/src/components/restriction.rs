//! Restrictions and the literal typing that refines field types

use super::{ComponentId, Operator};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Date layout accepted for date literals, e.g. `27-Oct-2009`
pub const DATE_FORMAT: &str = "%d-%b-%Y";

/// Inferred kind of value a field is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Unknown,
    Null,
    Boolean,
    String,
    Int,
    Decimal,
    Date,
    Variable,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Unknown => "unknown",
            FieldType::Null => "null",
            FieldType::Boolean => "boolean",
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Decimal => "decimal",
            FieldType::Date => "date",
            FieldType::Variable => "variable",
        }
    }

    /// Whether a later restriction may still refine this type
    pub fn is_refinable(&self) -> bool {
        matches!(self, FieldType::Unknown | FieldType::Null)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed value of a literal restriction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LiteralValue {
    Null,
    Int(i64),
    Decimal(Decimal),
    Date(NaiveDate),
    Boolean(bool),
    Text(String),
}

impl LiteralValue {
    /// Type a literal's source text: integer, then decimal, then date, then boolean,
    /// falling back to text. An absent literal is `null`.
    pub fn infer(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return LiteralValue::Null;
        };

        if let Ok(int) = text.parse::<i64>() {
            return LiteralValue::Int(int);
        }
        if let Ok(decimal) = Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)) {
            return LiteralValue::Decimal(decimal);
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
            return LiteralValue::Date(date);
        }
        match text {
            "true" => LiteralValue::Boolean(true),
            "false" => LiteralValue::Boolean(false),
            _ => LiteralValue::Text(text.to_string()),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            LiteralValue::Null => FieldType::Null,
            LiteralValue::Int(_) => FieldType::Int,
            LiteralValue::Decimal(_) => FieldType::Decimal,
            LiteralValue::Date(_) => FieldType::Date,
            LiteralValue::Boolean(_) => FieldType::Boolean,
            LiteralValue::Text(_) => FieldType::String,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Null => write!(f, "null"),
            LiteralValue::Int(int) => write!(f, "{}", int),
            LiteralValue::Decimal(decimal) => write!(f, "{}", decimal),
            LiteralValue::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            LiteralValue::Boolean(b) => write!(f, "{}", b),
            LiteralValue::Text(text) => write!(f, "\"{}\"", text),
        }
    }
}

/// A single comparison narrowing a constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Restriction {
    pub rule: ComponentId,
    pub rule_name: String,
    pub pattern: ComponentId,
    pub pattern_is_not: bool,
    pub constraint: ComponentId,
    pub field: ComponentId,
    pub operator: Operator,
    #[serde(flatten)]
    pub kind: RestrictionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "restriction", rename_all = "snake_case")]
pub enum RestrictionKind {
    Literal {
        text: Option<String>,
        value: LiteralValue,
    },
    Variable {
        variable: ComponentId,
        variable_name: String,
    },
    ReturnValue {
        content: String,
        declarations: Vec<String>,
        class_method_name: Option<String>,
    },
    QualifiedIdentifier {
        variable: ComponentId,
        variable_name: String,
        /// Everything from the first dot on, e.g. `.address.city`
        variable_path: String,
    },
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RestrictionKind::Literal { value, .. } => write!(f, "{} {}", self.operator, value),
            RestrictionKind::Variable { variable_name, .. } => {
                write!(f, "{} {}", self.operator, variable_name)
            }
            RestrictionKind::ReturnValue { content, .. } => {
                write!(f, "{} ( {} )", self.operator, content)
            }
            RestrictionKind::QualifiedIdentifier {
                variable_name,
                variable_path,
                ..
            } => write!(f, "{} {}{}", self.operator, variable_name, variable_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_typing_order() {
        assert_eq!(LiteralValue::infer(Some("10")), LiteralValue::Int(10));
        assert_eq!(
            LiteralValue::infer(Some("1.5")).field_type(),
            FieldType::Decimal
        );
        assert_eq!(
            LiteralValue::infer(Some("27-Oct-2009")),
            LiteralValue::Date(NaiveDate::from_ymd_opt(2009, 10, 27).unwrap())
        );
        assert_eq!(LiteralValue::infer(Some("true")), LiteralValue::Boolean(true));
        assert_eq!(
            LiteralValue::infer(Some("Toni")),
            LiteralValue::Text("Toni".to_string())
        );
        assert_eq!(LiteralValue::infer(None), LiteralValue::Null);
    }

    #[test]
    fn null_stays_refinable() {
        assert!(FieldType::Null.is_refinable());
        assert!(!FieldType::Int.is_refinable());
    }
}
