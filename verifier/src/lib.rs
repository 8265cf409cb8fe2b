//! # Verifier Engine
//!
//! **Flattening and possibility analysis for business rule bases**
//!
//! The engine takes the parsed syntax tree of a rule base and lowers it into a flat
//! analytic graph of uniquely identified components, together with the possibilities:
//! the concrete ways each pattern and each rule condition can be satisfied. Conflict
//! and redundancy checks run on top of that output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use verifier::{Verifier, VerifierResult};
//!
//! fn main() -> VerifierResult<()> {
//!     let mut verifier = Verifier::new();
//!
//!     verifier.add_json(r#"
//!         {
//!           "name": "shop",
//!           "rules": [{
//!             "name": "adult",
//!             "lhs": [{
//!               "kind": "pattern",
//!               "object_type": "Person",
//!               "constraints": [{
//!                 "kind": "field_constraint",
//!                 "field_name": "age",
//!                 "restrictions": [{ "kind": "literal", "evaluator": ">=", "text": "18" }]
//!               }]
//!             }],
//!             "consequence": "approve(p);"
//!           }]
//!         }
//!     "#)?;
//!
//!     let data = verifier.data();
//!     assert_eq!(data.rule_possibilities().len(), 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Components
//! Packages, rules, patterns, constraints, restrictions, variables, classes and
//! fields all become components with an id, a parent and an order number among
//! their siblings. Classes and fields are shared between every rule that uses them.
//!
//! ### Logical context
//! Patterns remember whether they were written under `not`, `exists` or `forall`.
//! `and` / `or` connectives decide how restrictions and patterns combine.
//!
//! ### Possibilities
//! A pattern possibility is one conjunction of restrictions that can hold together.
//! A rule possibility picks one pattern possibility per pattern so the rule's whole
//! condition holds.

pub mod components;
pub mod data;
pub mod descr;
pub mod engine;
pub mod error;
pub mod flattener;
pub mod limits;
pub mod solver;

pub use components::{
    Component, ComponentId, ComponentKind, ComponentType, Evaluator, FieldType, LiteralValue,
    Operator, Restriction, RestrictionKind,
};
pub use data::AnalyticsData;
pub use descr::{from_json, Connective, Descr, PackageDescr, PatternDescr, RestrictionDescr, RuleDescr};
pub use engine::Verifier;
pub use error::VerifierError;
pub use flattener::{normalize_consequence, PackageDescrFlattener};
pub use limits::AnalysisLimits;
pub use solver::{LogicalContextSolver, PatternPossibility, PossibilityId, RulePossibility, Scope};

/// Result type for verifier operations
pub type VerifierResult<T> = Result<T, VerifierError>;

#[cfg(test)]
mod tests;
