//! Logical context solver
//!
//! A stack machine driven by the flattener. Scopes are opened and closed in strict
//! LIFO order while the condition tree is walked:
//! - NOT / EXISTS / FORALL scopes only annotate the patterns created inside them
//! - AND / OR scopes, the rule scope and the pattern scope collect children and
//!   combine them into possibilities when they close
//!
//! Restrictions feed the innermost pattern-level group; closed patterns feed their
//! possibilities, as one set of alternatives, into the innermost rule-level group.

mod possibility;

pub(crate) use possibility::Group;
pub use possibility::{PatternPossibility, PossibilityId, RulePossibility};

use crate::components::ComponentId;
use crate::descr::Connective;
use crate::limits::AnalysisLimits;
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// A scope the flattener can open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Rule(ComponentId),
    Pattern(ComponentId),
    Operator(Connective),
    Not,
    Exists,
    Forall,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Rule(id) => write!(f, "rule {}", id),
            Scope::Pattern(id) => write!(f, "pattern {}", id),
            Scope::Operator(connective) => write!(f, "{}", connective),
            Scope::Not => write!(f, "NOT"),
            Scope::Exists => write!(f, "EXISTS"),
            Scope::Forall => write!(f, "FORALL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("{scope} closed out of order: opened at depth {expected}, stack depth is {actual}")]
    Unbalanced {
        scope: String,
        expected: usize,
        actual: usize,
    },

    #[error("{what} has no enclosing {expected} scope")]
    NoEnclosingScope {
        what: &'static str,
        expected: &'static str,
    },

    #[error("{scope} cannot be opened inside another {scope} scope")]
    Nested { scope: &'static str },

    #[error("{level} possibilities would number {actual}, above the limit of {limit}")]
    PossibilityLimit {
        level: &'static str,
        limit: usize,
        actual: usize,
    },
}

/// Proof that a scope is open; must be handed back to [`LogicalContextSolver::close`]
/// or [`LogicalContextSolver::abandon`]
#[must_use]
#[derive(Debug)]
pub struct ScopeToken {
    depth: usize,
    scope: Scope,
}

impl ScopeToken {
    pub fn scope(&self) -> Scope {
        self.scope
    }
}

/// What closing a scope produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closed {
    /// NOT, EXISTS and FORALL produce nothing
    Quantifier,
    /// Operators hand their combined alternatives to the enclosing group
    Operator,
    /// Restriction conjunctions of a finished pattern
    Pattern {
        pattern: ComponentId,
        possibilities: Vec<Vec<ComponentId>>,
    },
    /// Pattern possibility combinations of a finished rule
    Rule {
        rule: ComponentId,
        possibilities: Vec<Vec<PossibilityId>>,
    },
}

#[derive(Debug)]
enum Frame {
    Rule {
        rule: ComponentId,
        group: Group<PossibilityId>,
    },
    Pattern {
        pattern: ComponentId,
        group: Group<ComponentId>,
    },
    RuleOperator(Group<PossibilityId>),
    PatternOperator(Group<ComponentId>),
    Not,
    Exists,
    Forall,
}

impl Frame {
    fn is_pattern_level(&self) -> bool {
        matches!(self, Frame::Pattern { .. } | Frame::PatternOperator(_))
    }
}

pub struct LogicalContextSolver {
    stack: Vec<Frame>,
    max_pattern_possibilities: usize,
    max_rule_possibilities: usize,
}

impl LogicalContextSolver {
    pub fn new(limits: &AnalysisLimits) -> Self {
        Self {
            stack: Vec::new(),
            max_pattern_possibilities: limits.max_pattern_possibilities,
            max_rule_possibilities: limits.max_rule_possibilities,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn open(&mut self, scope: Scope) -> Result<ScopeToken, SolverError> {
        let frame = match scope {
            Scope::Rule(rule) => {
                if self.rule_is_open() {
                    return Err(SolverError::Nested { scope: "rule" });
                }
                Frame::Rule {
                    rule,
                    group: Group::new(Connective::And),
                }
            }
            Scope::Pattern(pattern) => {
                self.require_rule("pattern")?;
                if self.pattern_is_open() {
                    return Err(SolverError::Nested { scope: "pattern" });
                }
                Frame::Pattern {
                    pattern,
                    group: Group::new(Connective::And),
                }
            }
            Scope::Operator(connective) => {
                self.require_rule("operator")?;
                if self.pattern_is_open() {
                    Frame::PatternOperator(Group::new(connective))
                } else {
                    Frame::RuleOperator(Group::new(connective))
                }
            }
            Scope::Not => {
                self.require_rule("NOT")?;
                Frame::Not
            }
            Scope::Exists => {
                self.require_rule("EXISTS")?;
                Frame::Exists
            }
            Scope::Forall => {
                self.require_rule("FORALL")?;
                Frame::Forall
            }
        };

        let depth = self.stack.len();
        trace!(%scope, depth, "open scope");
        self.stack.push(frame);
        Ok(ScopeToken { depth, scope })
    }

    pub fn close(&mut self, token: ScopeToken) -> Result<Closed, SolverError> {
        if token.depth + 1 != self.stack.len() {
            return Err(SolverError::Unbalanced {
                scope: token.scope.to_string(),
                expected: token.depth,
                actual: self.stack.len(),
            });
        }
        let Some(frame) = self.stack.pop() else {
            return Err(SolverError::Unbalanced {
                scope: token.scope.to_string(),
                expected: token.depth,
                actual: 0,
            });
        };
        trace!(scope = %token.scope, depth = token.depth, "close scope");

        match frame {
            Frame::Rule { rule, group } => {
                check_limit(&group, "rule", self.max_rule_possibilities)?;
                Ok(Closed::Rule {
                    rule,
                    possibilities: group.resolve(),
                })
            }
            Frame::Pattern { pattern, group } => {
                check_limit(&group, "pattern", self.max_pattern_possibilities)?;
                Ok(Closed::Pattern {
                    pattern,
                    possibilities: group.resolve(),
                })
            }
            Frame::RuleOperator(group) => {
                check_limit(&group, "rule", self.max_rule_possibilities)?;
                let alternatives = group.resolve();
                self.rule_group_mut("operator")?
                    .push_alternatives(alternatives);
                Ok(Closed::Operator)
            }
            Frame::PatternOperator(group) => {
                check_limit(&group, "pattern", self.max_pattern_possibilities)?;
                let alternatives = group.resolve();
                self.pattern_group_mut("operator")?
                    .push_alternatives(alternatives);
                Ok(Closed::Operator)
            }
            Frame::Not | Frame::Exists | Frame::Forall => Ok(Closed::Quantifier),
        }
    }

    /// Drop the scope behind `token` and everything opened above it
    pub fn abandon(&mut self, token: ScopeToken) {
        trace!(scope = %token.scope, depth = token.depth, "abandon scope");
        self.stack.truncate(token.depth);
    }

    pub fn add_restriction(&mut self, restriction: ComponentId) -> Result<(), SolverError> {
        self.pattern_group_mut("restriction")?.push_item(restriction);
        Ok(())
    }

    /// Register the possibilities of a closed pattern as alternatives of one child
    pub fn add_pattern_possibilities(
        &mut self,
        possibilities: &[PossibilityId],
    ) -> Result<(), SolverError> {
        let alternatives = possibilities.iter().map(|id| vec![*id]).collect();
        self.rule_group_mut("pattern possibility")?
            .push_alternatives(alternatives);
        Ok(())
    }

    /// Is any NOT scope open inside the current rule
    pub fn is_not(&self) -> bool {
        self.any_in_rule(|frame| matches!(frame, Frame::Not))
    }

    pub fn is_exists(&self) -> bool {
        self.any_in_rule(|frame| matches!(frame, Frame::Exists))
    }

    pub fn is_forall(&self) -> bool {
        self.any_in_rule(|frame| matches!(frame, Frame::Forall))
    }

    fn any_in_rule(&self, predicate: impl Fn(&Frame) -> bool) -> bool {
        self.stack
            .iter()
            .rev()
            .take_while(|frame| !matches!(frame, Frame::Rule { .. }))
            .any(predicate)
    }

    fn rule_is_open(&self) -> bool {
        self.stack
            .iter()
            .any(|frame| matches!(frame, Frame::Rule { .. }))
    }

    fn pattern_is_open(&self) -> bool {
        self.stack.iter().any(Frame::is_pattern_level)
    }

    fn require_rule(&self, what: &'static str) -> Result<(), SolverError> {
        if self.rule_is_open() {
            Ok(())
        } else {
            Err(SolverError::NoEnclosingScope {
                what,
                expected: "rule",
            })
        }
    }

    fn pattern_group_mut(
        &mut self,
        what: &'static str,
    ) -> Result<&mut Group<ComponentId>, SolverError> {
        for frame in self.stack.iter_mut().rev() {
            match frame {
                Frame::Pattern { group, .. } | Frame::PatternOperator(group) => return Ok(group),
                Frame::Not | Frame::Exists | Frame::Forall => continue,
                Frame::Rule { .. } | Frame::RuleOperator(_) => break,
            }
        }
        Err(SolverError::NoEnclosingScope {
            what,
            expected: "pattern",
        })
    }

    fn rule_group_mut(
        &mut self,
        what: &'static str,
    ) -> Result<&mut Group<PossibilityId>, SolverError> {
        for frame in self.stack.iter_mut().rev() {
            match frame {
                Frame::Rule { group, .. } | Frame::RuleOperator(group) => return Ok(group),
                Frame::Not | Frame::Exists | Frame::Forall => continue,
                Frame::Pattern { .. } | Frame::PatternOperator(_) => break,
            }
        }
        Err(SolverError::NoEnclosingScope {
            what,
            expected: "rule",
        })
    }
}

fn check_limit<T: Clone>(
    group: &Group<T>,
    level: &'static str,
    limit: usize,
) -> Result<(), SolverError> {
    let actual = group.count();
    if actual > limit {
        return Err(SolverError::PossibilityLimit {
            level,
            limit,
            actual,
        });
    }
    Ok(())
}
