//! Rule-base AST as handed over by the parser
//!
//! These types mirror the descriptor tree a rule-language parser produces: packages
//! own rules, rules own a left-hand side of conditional elements and a textual
//! consequence. The tree is assumed to be syntactically valid.
//!
//! Every node enum is tagged by `"kind"` in its JSON form. A `kind` the engine does
//! not know deserializes to `Unknown` and is skipped during flattening, so documents
//! produced by a newer grammar still load.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean connective shared by conditional elements and restriction connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connective {
    And,
    Or,
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connective::And => write!(f, "AND"),
            Connective::Or => write!(f, "OR"),
        }
    }
}

/// A package of rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDescr {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<RuleDescr>,
}

impl PackageDescr {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: RuleDescr) -> Self {
        self.rules.push(rule);
        self
    }
}

/// A rule declaration: an implicit conjunction of conditional elements plus a consequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDescr {
    pub name: String,
    #[serde(default)]
    pub salience: i32,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub lhs: Vec<Descr>,
    #[serde(default)]
    pub consequence: String,
}

impl RuleDescr {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            salience: 0,
            line: 0,
            lhs: Vec::new(),
            consequence: String::new(),
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn with_salience(mut self, salience: i32) -> Self {
        self.salience = salience;
        self
    }

    pub fn with_lhs(mut self, lhs: Vec<Descr>) -> Self {
        self.lhs = lhs;
        self
    }

    pub fn with_consequence(mut self, consequence: impl Into<String>) -> Self {
        self.consequence = consequence.into();
        self
    }
}

/// Conditional elements and the constraint-level nodes that may appear in a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Descr {
    Pattern(PatternDescr),
    And(ConnectiveDescr),
    Or(ConnectiveDescr),
    Not(ConnectiveDescr),
    Exists(ConnectiveDescr),
    Forall(ConnectiveDescr),
    Eval(EvalDescr),
    FieldConstraint(FieldConstraintDescr),
    FieldBinding(FieldBindingDescr),
    Predicate(PredicateDescr),
    #[serde(other)]
    Unknown,
}

impl Descr {
    pub fn and(descrs: Vec<Descr>) -> Self {
        Descr::And(ConnectiveDescr { descrs })
    }

    pub fn or(descrs: Vec<Descr>) -> Self {
        Descr::Or(ConnectiveDescr { descrs })
    }

    pub fn not(descrs: Vec<Descr>) -> Self {
        Descr::Not(ConnectiveDescr { descrs })
    }

    pub fn exists(descrs: Vec<Descr>) -> Self {
        Descr::Exists(ConnectiveDescr { descrs })
    }

    pub fn forall(descrs: Vec<Descr>) -> Self {
        Descr::Forall(ConnectiveDescr { descrs })
    }

    pub fn pattern(pattern: PatternDescr) -> Self {
        Descr::Pattern(pattern)
    }

    /// `field <restrictions>` with the restrictions joined by an implicit AND
    pub fn constraint(field_name: impl Into<String>, restrictions: Vec<RestrictionDescr>) -> Self {
        Descr::FieldConstraint(FieldConstraintDescr {
            field_name: field_name.into(),
            restrictions,
            line: 0,
        })
    }

    /// `identifier : field`
    pub fn binding(identifier: impl Into<String>, field_name: impl Into<String>) -> Self {
        Descr::FieldBinding(FieldBindingDescr {
            identifier: identifier.into(),
            field_name: field_name.into(),
            line: 0,
        })
    }

    pub fn eval(content: impl Into<String>) -> Self {
        Descr::Eval(EvalDescr {
            content: content.into(),
            class_method_name: None,
        })
    }

    pub fn predicate(content: impl Into<String>) -> Self {
        Descr::Predicate(PredicateDescr {
            content: content.into(),
            class_method_name: None,
        })
    }
}

/// Children of an `and`, `or`, `not`, `exists` or `forall` element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectiveDescr {
    #[serde(default)]
    pub descrs: Vec<Descr>,
}

/// `Type( constraints ) from source`, optionally bound to an identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDescr {
    pub object_type: String,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub source: Option<PatternSourceDescr>,
    #[serde(default)]
    pub constraints: Vec<Descr>,
    #[serde(default)]
    pub line: usize,
}

impl PatternDescr {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            identifier: None,
            source: None,
            constraints: Vec::new(),
            line: 0,
        }
    }

    pub fn bound_to(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_constraints(mut self, constraints: Vec<Descr>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_source(mut self, source: PatternSourceDescr) -> Self {
        self.source = Some(source);
        self
    }
}

/// Where a pattern draws its facts from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternSourceDescr {
    Accumulate(AccumulateDescr),
    Collect(CollectDescr),
    From(FromDescr),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulateDescr {
    pub input: Box<PatternDescr>,
    #[serde(default)]
    pub init_code: Option<String>,
    #[serde(default)]
    pub action_code: Option<String>,
    #[serde(default)]
    pub reverse_code: Option<String>,
    #[serde(default)]
    pub result_code: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub external_function: bool,
    #[serde(default)]
    pub function_identifier: Option<String>,
    #[serde(default)]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectDescr {
    pub input: Box<PatternDescr>,
    #[serde(default)]
    pub class_method_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromDescr {
    pub data_source: InvokerDescr,
}

/// Declarative invokers usable as a `from` data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvokerDescr {
    FieldAccess {
        field_name: String,
        #[serde(default)]
        argument: Option<String>,
    },
    MethodAccess {
        method_name: String,
        #[serde(default)]
        arguments: String,
    },
    FunctionCall {
        name: String,
        #[serde(default)]
        arguments: String,
    },
    Accessor {
        variable_name: String,
        #[serde(default)]
        invokers: Vec<InvokerDescr>,
    },
    #[serde(other)]
    Unknown,
}

/// `eval( expression )`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalDescr {
    pub content: String,
    #[serde(default)]
    pub class_method_name: Option<String>,
}

/// Inline predicate inside a pattern, `-> ( expression )`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateDescr {
    pub content: String,
    #[serde(default)]
    pub class_method_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraintDescr {
    pub field_name: String,
    #[serde(default)]
    pub restrictions: Vec<RestrictionDescr>,
    #[serde(default)]
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBindingDescr {
    pub identifier: String,
    pub field_name: String,
    #[serde(default)]
    pub line: usize,
}

/// A single comparison narrowing a field constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestrictionDescr {
    /// `age > 10`
    Literal {
        evaluator: String,
        #[serde(default)]
        negated: bool,
        #[serde(default)]
        text: Option<String>,
    },
    /// `name == $n`
    Variable {
        evaluator: String,
        #[serde(default)]
        negated: bool,
        identifier: String,
    },
    /// `total > ( $a * 2 )`
    ReturnValue {
        evaluator: String,
        #[serde(default)]
        negated: bool,
        content: String,
        #[serde(default)]
        declarations: Vec<String>,
        #[serde(default)]
        class_method_name: Option<String>,
    },
    /// `owner == $p.name`
    QualifiedIdentifier {
        evaluator: String,
        #[serde(default)]
        negated: bool,
        text: String,
    },
    /// `> 10 || < 5`
    Connective {
        connective: Connective,
        #[serde(default)]
        restrictions: Vec<RestrictionDescr>,
    },
    #[serde(other)]
    Unknown,
}

impl RestrictionDescr {
    pub fn literal(evaluator: impl Into<String>, text: impl Into<String>) -> Self {
        RestrictionDescr::Literal {
            evaluator: evaluator.into(),
            negated: false,
            text: Some(text.into()),
        }
    }

    pub fn variable(evaluator: impl Into<String>, identifier: impl Into<String>) -> Self {
        RestrictionDescr::Variable {
            evaluator: evaluator.into(),
            negated: false,
            identifier: identifier.into(),
        }
    }

    pub fn return_value(
        evaluator: impl Into<String>,
        content: impl Into<String>,
        declarations: Vec<String>,
    ) -> Self {
        RestrictionDescr::ReturnValue {
            evaluator: evaluator.into(),
            negated: false,
            content: content.into(),
            declarations,
            class_method_name: None,
        }
    }

    pub fn qualified(evaluator: impl Into<String>, text: impl Into<String>) -> Self {
        RestrictionDescr::QualifiedIdentifier {
            evaluator: evaluator.into(),
            negated: false,
            text: text.into(),
        }
    }

    pub fn and(restrictions: Vec<RestrictionDescr>) -> Self {
        RestrictionDescr::Connective {
            connective: Connective::And,
            restrictions,
        }
    }

    pub fn or(restrictions: Vec<RestrictionDescr>) -> Self {
        RestrictionDescr::Connective {
            connective: Connective::Or,
            restrictions,
        }
    }

    /// Flip the negation flag of a comparison restriction; connectives are unchanged
    pub fn negate(mut self) -> Self {
        match &mut self {
            RestrictionDescr::Literal { negated, .. }
            | RestrictionDescr::Variable { negated, .. }
            | RestrictionDescr::ReturnValue { negated, .. }
            | RestrictionDescr::QualifiedIdentifier { negated, .. } => *negated = !*negated,
            RestrictionDescr::Connective { .. } | RestrictionDescr::Unknown => {}
        }
        self
    }
}

/// A rule base document: a single package or a list of packages
#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Many(Vec<PackageDescr>),
    One(PackageDescr),
}

/// Decode a JSON rule base document into its packages
pub fn from_json(json: &str) -> Result<Vec<PackageDescr>, serde_json::Error> {
    let document: Document = serde_json::from_str(json)?;
    Ok(match document {
        Document::Many(packages) => packages,
        Document::One(package) => vec![package],
    })
}
