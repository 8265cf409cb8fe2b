//! The flattened component model
//!
//! Every node of the analytic graph is a [`Component`]: a store-assigned id, an
//! optional parent id, the node's position among its siblings and a [`ComponentKind`]
//! payload. Components reference each other only by id; the store owns them all.

pub mod operator;
pub mod restriction;

pub use operator::{Evaluator, Operator};
pub use restriction::{FieldType, LiteralValue, Restriction, RestrictionKind};

use crate::descr::Connective;
use serde::Serialize;
use std::fmt;

/// Store-assigned identity of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ComponentId(u64);

impl ComponentId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the analytic graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub id: ComponentId,
    pub parent: Option<ComponentId>,
    pub order_number: usize,
    #[serde(flatten)]
    pub kind: ComponentKind,
}

/// Discriminant of [`ComponentKind`], used where a reference must say what it points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    RulePackage,
    Rule,
    Pattern,
    Constraint,
    Restriction,
    Variable,
    Class,
    Field,
    Consequence,
    Operator,
    Eval,
    Predicate,
    Accumulate,
    Collect,
    From,
    FieldAccess,
    MethodAccess,
    FunctionCall,
    Accessor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKind {
    RulePackage(RulePackage),
    Rule(AnalyticsRule),
    Pattern(Pattern),
    Constraint(Constraint),
    Restriction(Restriction),
    Variable(Variable),
    Class(AnalyticsClass),
    Field(Field),
    Consequence(Consequence),
    Operator(OperatorDescr),
    Eval(AnalyticsEval),
    Predicate(AnalyticsPredicate),
    Accumulate(AnalyticsAccumulate),
    Collect(AnalyticsCollect),
    From(AnalyticsFrom),
    FieldAccess(FieldAccess),
    MethodAccess(MethodAccess),
    FunctionCall(FunctionCall),
    Accessor(Accessor),
}

impl ComponentKind {
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentKind::RulePackage(_) => ComponentType::RulePackage,
            ComponentKind::Rule(_) => ComponentType::Rule,
            ComponentKind::Pattern(_) => ComponentType::Pattern,
            ComponentKind::Constraint(_) => ComponentType::Constraint,
            ComponentKind::Restriction(_) => ComponentType::Restriction,
            ComponentKind::Variable(_) => ComponentType::Variable,
            ComponentKind::Class(_) => ComponentType::Class,
            ComponentKind::Field(_) => ComponentType::Field,
            ComponentKind::Consequence(_) => ComponentType::Consequence,
            ComponentKind::Operator(_) => ComponentType::Operator,
            ComponentKind::Eval(_) => ComponentType::Eval,
            ComponentKind::Predicate(_) => ComponentType::Predicate,
            ComponentKind::Accumulate(_) => ComponentType::Accumulate,
            ComponentKind::Collect(_) => ComponentType::Collect,
            ComponentKind::From(_) => ComponentType::From,
            ComponentKind::FieldAccess(_) => ComponentType::FieldAccess,
            ComponentKind::MethodAccess(_) => ComponentType::MethodAccess,
            ComponentKind::FunctionCall(_) => ComponentType::FunctionCall,
            ComponentKind::Accessor(_) => ComponentType::Accessor,
        }
    }

    pub fn as_package(&self) -> Option<&RulePackage> {
        match self {
            ComponentKind::RulePackage(package) => Some(package),
            _ => None,
        }
    }

    pub fn as_rule(&self) -> Option<&AnalyticsRule> {
        match self {
            ComponentKind::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            ComponentKind::Pattern(pattern) => Some(pattern),
            _ => None,
        }
    }

    pub fn as_constraint(&self) -> Option<&Constraint> {
        match self {
            ComponentKind::Constraint(constraint) => Some(constraint),
            _ => None,
        }
    }

    pub fn as_restriction(&self) -> Option<&Restriction> {
        match self {
            ComponentKind::Restriction(restriction) => Some(restriction),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            ComponentKind::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&AnalyticsClass> {
        match self {
            ComponentKind::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            ComponentKind::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_consequence(&self) -> Option<&Consequence> {
        match self {
            ComponentKind::Consequence(consequence) => Some(consequence),
            _ => None,
        }
    }

    pub fn as_operator(&self) -> Option<&OperatorDescr> {
        match self {
            ComponentKind::Operator(operator) => Some(operator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulePackage {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsRule {
    pub name: String,
    pub salience: i32,
    pub line: usize,
    pub package: ComponentId,
    /// Set once the consequence has been flattened
    pub consequence: Option<ComponentId>,
}

/// A pattern with its logical context frozen at creation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    pub rule: ComponentId,
    pub rule_name: String,
    pub class: ComponentId,
    pub name: String,
    pub identifier: Option<String>,
    pub is_not: bool,
    pub is_exists: bool,
    pub is_forall: bool,
    pub source: Option<ComponentId>,
    pub source_type: Option<ComponentType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraint {
    pub rule: ComponentId,
    pub pattern: ComponentId,
    pub pattern_is_not: bool,
    pub field: ComponentId,
    pub field_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub rule: ComponentId,
    pub rule_name: String,
    pub name: String,
    /// `Class` for pattern bindings, `Field` for field bindings and for variables used
    /// through a qualified identifier
    pub object_type: ComponentType,
    pub object_id: Option<ComponentId>,
    pub object_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsClass {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub class: ComponentId,
    pub class_name: String,
    pub name: String,
    pub line: usize,
    pub field_type: FieldType,
}

impl Field {
    /// Settle the field type from the first restriction that says something about it
    pub fn refine_type(&mut self, field_type: FieldType) {
        if self.field_type.is_refinable() {
            self.field_type = field_type;
        }
    }
}

/// Consequence text with comments and whitespace stripped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consequence {
    pub rule: ComponentId,
    pub rule_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorDescr {
    pub connective: Connective,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEval {
    pub rule: ComponentId,
    pub rule_name: String,
    pub content: String,
    pub class_method_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsPredicate {
    pub rule: ComponentId,
    pub rule_name: String,
    pub content: String,
    pub class_method_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsAccumulate {
    pub input_pattern: Option<ComponentId>,
    pub init_code: Option<String>,
    pub action_code: Option<String>,
    pub reverse_code: Option<String>,
    pub result_code: Option<String>,
    pub class_name: Option<String>,
    pub external_function: bool,
    pub function_identifier: Option<String>,
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsCollect {
    pub input_pattern: Option<ComponentId>,
    pub class_method_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsFrom {
    pub data_source: Option<ComponentId>,
    pub data_source_type: Option<ComponentType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAccess {
    pub field_name: String,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodAccess {
    pub method_name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accessor {
    pub variable_name: String,
}
