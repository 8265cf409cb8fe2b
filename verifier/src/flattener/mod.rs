//! Flattening of package descriptors into the analytic graph
//!
//! [`PackageDescrFlattener`] walks a [`PackageDescr`] depth first. Every node it
//! understands becomes one component in the store, parented to the component of its
//! enclosing node. While walking it drives a [`LogicalContextSolver`]: each rule,
//! pattern, connective and quantifier opens a scope for the duration of its children,
//! and closing the rule and pattern scopes yields the possibilities that are stored
//! alongside the graph.

mod consequence;
mod restriction;
mod source;

pub use consequence::normalize_consequence;

use crate::components::{
    AnalyticsClass, AnalyticsEval, AnalyticsPredicate, AnalyticsRule, ComponentId,
    ComponentKind, ComponentType, Consequence, Field, FieldType, OperatorDescr, Pattern,
    RulePackage, Variable,
};
use crate::data::AnalyticsData;
use crate::descr::{Connective, Descr, EvalDescr, PackageDescr, PatternDescr, PredicateDescr, RuleDescr};
use crate::error::VerifierError;
use crate::limits::AnalysisLimits;
use crate::solver::{Closed, LogicalContextSolver, Scope, SolverError};
use crate::VerifierResult;
use tracing::{debug, warn};

/// The rule being flattened, named in every error raised while inside it
#[derive(Debug, Clone, Copy)]
struct RuleSite<'a> {
    id: ComponentId,
    name: &'a str,
    line: usize,
}

impl RuleSite<'_> {
    fn missing(&self, node: &'static str, expected: &'static str) -> VerifierError {
        VerifierError::MissingContext {
            node,
            expected,
            rule: self.name.to_string(),
            line: self.line,
        }
    }

    fn unresolved(&self, name: &str) -> VerifierError {
        VerifierError::UnresolvedVariable {
            name: name.to_string(),
            rule: self.name.to_string(),
            line: self.line,
        }
    }

    fn unknown_operator(&self, operator: &str) -> VerifierError {
        VerifierError::UnknownOperator {
            operator: operator.to_string(),
            rule: self.name.to_string(),
            line: self.line,
        }
    }

    fn malformed(&self, text: &str) -> VerifierError {
        VerifierError::MalformedIdentifier {
            text: text.to_string(),
            rule: self.name.to_string(),
            line: self.line,
        }
    }

    fn limit(&self, limit_name: &'static str, limit_value: usize, actual: usize) -> VerifierError {
        VerifierError::LimitExceeded {
            limit_name,
            limit_value,
            actual,
            rule: self.name.to_string(),
            line: self.line,
        }
    }

    /// Possibility caps surface as limit errors; anything else is a solver failure
    fn solver(&self, error: SolverError) -> VerifierError {
        match error {
            SolverError::PossibilityLimit {
                level,
                limit,
                actual,
            } => {
                let limit_name = if level == "rule" {
                    "max_rule_possibilities"
                } else {
                    "max_pattern_possibilities"
                };
                self.limit(limit_name, limit, actual)
            }
            source => VerifierError::Solver {
                rule: self.name.to_string(),
                line: self.line,
                source,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PatternSite<'a> {
    id: ComponentId,
    class: ComponentId,
    class_name: &'a str,
    is_not: bool,
}

#[derive(Debug, Clone, Copy)]
struct ConstraintSite {
    id: ComponentId,
    field: ComponentId,
}

/// Where the traversal currently is. Copied into every recursive call, so an inner
/// pattern never leaks its state back to the enclosing one.
#[derive(Debug, Clone, Copy)]
struct Context<'a> {
    rule: RuleSite<'a>,
    pattern: Option<PatternSite<'a>>,
    constraint: Option<ConstraintSite>,
    depth: usize,
}

impl<'a> Context<'a> {
    fn new(rule: RuleSite<'a>) -> Self {
        Self {
            rule,
            pattern: None,
            constraint: None,
            depth: 0,
        }
    }

    fn pattern_site(&self, node: &'static str) -> VerifierResult<PatternSite<'a>> {
        self.pattern
            .ok_or_else(|| self.rule.missing(node, "pattern"))
    }

    fn constraint_site(
        &self,
        node: &'static str,
    ) -> VerifierResult<(PatternSite<'a>, ConstraintSite)> {
        let pattern = self.pattern_site(node)?;
        let constraint = self
            .constraint
            .ok_or_else(|| self.rule.missing(node, "field constraint"))?;
        Ok((pattern, constraint))
    }
}

pub struct PackageDescrFlattener<'s> {
    data: &'s mut AnalyticsData,
    solver: LogicalContextSolver,
    limits: &'s AnalysisLimits,
}

impl<'s> PackageDescrFlattener<'s> {
    pub fn new(data: &'s mut AnalyticsData, limits: &'s AnalysisLimits) -> Self {
        Self {
            data,
            solver: LogicalContextSolver::new(limits),
            limits,
        }
    }

    /// Flatten a package and all of its rules. A package name seen before reuses the
    /// existing package component.
    pub fn flatten(&mut self, descr: &PackageDescr) -> VerifierResult<ComponentId> {
        let package = match self.data.find_package(&descr.name) {
            Some(id) => id,
            None => self.data.add(
                None,
                ComponentKind::RulePackage(RulePackage {
                    name: descr.name.clone(),
                }),
            ),
        };
        debug!(package = %descr.name, rules = descr.rules.len(), "flattening package");

        for rule in &descr.rules {
            self.flatten_rule(package, rule)?;
        }
        Ok(package)
    }

    fn flatten_rule(&mut self, package: ComponentId, descr: &RuleDescr) -> VerifierResult<ComponentId> {
        let id = self.data.add(
            Some(package),
            ComponentKind::Rule(AnalyticsRule {
                name: descr.name.clone(),
                salience: descr.salience,
                line: descr.line,
                package,
                consequence: None,
            }),
        );
        debug!(rule = %descr.name, line = descr.line, "flattening rule");

        let rule = RuleSite {
            id,
            name: &descr.name,
            line: descr.line,
        };
        let ctx = Context::new(rule);
        let closed = self.within(rule, Scope::Rule(id), |this| {
            this.flatten_descrs(&descr.lhs, id, ctx)
        })?;

        if let Closed::Rule { possibilities, .. } = closed {
            debug!(rule = %descr.name, possibilities = possibilities.len(), "rule possibilities");
            for patterns in possibilities {
                self.data.add_rule_possibility(id, patterns);
            }
        }

        let consequence = self.data.add(
            Some(id),
            ComponentKind::Consequence(Consequence {
                rule: id,
                rule_name: descr.name.clone(),
                text: normalize_consequence(&descr.consequence),
            }),
        );
        if let Some(ComponentKind::Rule(analytics_rule)) = self.data.kind_mut(id) {
            analytics_rule.consequence = Some(consequence);
        }

        Ok(id)
    }

    fn flatten_descrs<'a>(
        &mut self,
        descrs: &'a [Descr],
        parent: ComponentId,
        ctx: Context<'a>,
    ) -> VerifierResult<()> {
        for descr in descrs {
            self.flatten_descr(descr, parent, ctx)?;
        }
        Ok(())
    }

    fn flatten_descr<'a>(
        &mut self,
        descr: &'a Descr,
        parent: ComponentId,
        ctx: Context<'a>,
    ) -> VerifierResult<()> {
        match descr {
            Descr::Pattern(pattern) => self.flatten_pattern(pattern, parent, ctx).map(|_| ()),
            Descr::And(and) => self.flatten_operator(Connective::And, &and.descrs, parent, ctx),
            Descr::Or(or) => self.flatten_operator(Connective::Or, &or.descrs, parent, ctx),
            Descr::Not(not) => self.flatten_quantifier(Scope::Not, &not.descrs, parent, ctx),
            Descr::Exists(exists) => {
                self.flatten_quantifier(Scope::Exists, &exists.descrs, parent, ctx)
            }
            Descr::Forall(forall) => {
                self.flatten_quantifier(Scope::Forall, &forall.descrs, parent, ctx)
            }
            Descr::Eval(eval) => {
                self.flatten_eval(eval, parent, ctx);
                Ok(())
            }
            Descr::Predicate(predicate) => self.flatten_predicate(predicate, parent, ctx),
            Descr::FieldConstraint(constraint) => {
                self.flatten_field_constraint(constraint, parent, ctx)
            }
            Descr::FieldBinding(binding) => self.flatten_field_binding(binding, parent, ctx),
            Descr::Unknown => {
                warn!(rule = ctx.rule.name, "skipping conditional element of unknown kind");
                Ok(())
            }
        }
    }

    /// Patterns freeze their NOT / EXISTS / FORALL context at creation. The source is
    /// flattened before the pattern scope opens, so an inner pattern contributes its
    /// own possibilities to the rule.
    fn flatten_pattern<'a>(
        &mut self,
        descr: &'a PatternDescr,
        parent: ComponentId,
        ctx: Context<'a>,
    ) -> VerifierResult<ComponentId> {
        let ctx = self.descend(ctx)?;
        let rule = ctx.rule;
        let class = self.class_for(&descr.object_type);
        let is_not = self.solver.is_not();

        let id = self.data.add(
            Some(parent),
            ComponentKind::Pattern(Pattern {
                rule: rule.id,
                rule_name: rule.name.to_string(),
                class,
                name: descr.object_type.clone(),
                identifier: descr.identifier.clone(),
                is_not,
                is_exists: self.solver.is_exists(),
                is_forall: self.solver.is_forall(),
                source: None,
                source_type: None,
            }),
        );
        debug!(rule = rule.name, pattern = %id, class = %descr.object_type, is_not, "flattening pattern");

        if let Some(identifier) = &descr.identifier {
            self.data.add(
                Some(id),
                ComponentKind::Variable(Variable {
                    rule: rule.id,
                    rule_name: rule.name.to_string(),
                    name: identifier.clone(),
                    object_type: ComponentType::Class,
                    object_id: Some(class),
                    object_name: descr.object_type.clone(),
                }),
            );
        }

        if let Some(source) = &descr.source {
            if let Some((source_id, source_type)) = self.flatten_source(source, id, ctx)? {
                if let Some(ComponentKind::Pattern(pattern)) = self.data.kind_mut(id) {
                    pattern.source = Some(source_id);
                    pattern.source_type = Some(source_type);
                }
            }
        }

        let inner = Context {
            pattern: Some(PatternSite {
                id,
                class,
                class_name: &descr.object_type,
                is_not,
            }),
            constraint: None,
            ..ctx
        };
        let closed = self.within(rule, Scope::Pattern(id), |this| {
            this.flatten_descrs(&descr.constraints, id, inner)
        })?;

        if let Closed::Pattern { possibilities, .. } = closed {
            let ids: Vec<_> = possibilities
                .into_iter()
                .map(|restrictions| self.data.add_pattern_possibility(rule.id, id, restrictions))
                .collect();
            self.solver
                .add_pattern_possibilities(&ids)
                .map_err(|e| rule.solver(e))?;
        }

        Ok(id)
    }

    fn flatten_operator<'a>(
        &mut self,
        connective: Connective,
        descrs: &'a [Descr],
        parent: ComponentId,
        ctx: Context<'a>,
    ) -> VerifierResult<()> {
        let ctx = self.descend(ctx)?;
        let operator = self.data.add(
            Some(parent),
            ComponentKind::Operator(OperatorDescr { connective }),
        );
        self.within(ctx.rule, Scope::Operator(connective), |this| {
            this.flatten_descrs(descrs, operator, ctx)
        })?;
        Ok(())
    }

    /// NOT, EXISTS and FORALL create no component; their children keep the parent
    fn flatten_quantifier<'a>(
        &mut self,
        scope: Scope,
        descrs: &'a [Descr],
        parent: ComponentId,
        ctx: Context<'a>,
    ) -> VerifierResult<()> {
        let ctx = self.descend(ctx)?;
        self.within(ctx.rule, scope, |this| this.flatten_descrs(descrs, parent, ctx))?;
        Ok(())
    }

    fn flatten_eval(&mut self, descr: &EvalDescr, parent: ComponentId, ctx: Context<'_>) {
        self.data.add(
            Some(parent),
            ComponentKind::Eval(AnalyticsEval {
                rule: ctx.rule.id,
                rule_name: ctx.rule.name.to_string(),
                content: descr.content.clone(),
                class_method_name: descr.class_method_name.clone(),
            }),
        );
    }

    fn flatten_predicate(
        &mut self,
        descr: &PredicateDescr,
        parent: ComponentId,
        ctx: Context<'_>,
    ) -> VerifierResult<()> {
        ctx.pattern_site("predicate")?;
        self.data.add(
            Some(parent),
            ComponentKind::Predicate(AnalyticsPredicate {
                rule: ctx.rule.id,
                rule_name: ctx.rule.name.to_string(),
                content: descr.content.clone(),
                class_method_name: descr.class_method_name.clone(),
            }),
        );
        Ok(())
    }

    /// Run `body` inside a solver scope. The scope is closed when `body` succeeds and
    /// abandoned when it fails, so the solver stack never outlives an error.
    fn within<F>(&mut self, rule: RuleSite<'_>, scope: Scope, body: F) -> VerifierResult<Closed>
    where
        F: FnOnce(&mut Self) -> VerifierResult<()>,
    {
        let token = self.solver.open(scope).map_err(|e| rule.solver(e))?;
        match body(self) {
            Ok(()) => self.solver.close(token).map_err(|e| rule.solver(e)),
            Err(err) => {
                self.solver.abandon(token);
                Err(err)
            }
        }
    }

    fn descend<'a>(&self, ctx: Context<'a>) -> VerifierResult<Context<'a>> {
        let depth = ctx.depth + 1;
        if depth > self.limits.max_nesting_depth {
            return Err(ctx
                .rule
                .limit("max_nesting_depth", self.limits.max_nesting_depth, depth));
        }
        Ok(Context { depth, ..ctx })
    }

    fn class_for(&mut self, name: &str) -> ComponentId {
        match self.data.find_class(name) {
            Some(id) => id,
            None => self.data.add(
                None,
                ComponentKind::Class(AnalyticsClass {
                    name: name.to_string(),
                }),
            ),
        }
    }

    /// Fields are owned by their class and shared by every rule that constrains them.
    /// The first mention that carries a line number supplies the field's line.
    fn field_for(&mut self, pattern: PatternSite<'_>, name: &str, line: usize) -> ComponentId {
        match self.data.find_field(pattern.class, name) {
            Some(id) => {
                if line != 0 {
                    if let Some(ComponentKind::Field(field)) = self.data.kind_mut(id) {
                        if field.line == 0 {
                            field.line = line;
                        }
                    }
                }
                id
            }
            None => self.data.add(
                Some(pattern.class),
                ComponentKind::Field(Field {
                    class: pattern.class,
                    class_name: pattern.class_name.to_string(),
                    name: name.to_string(),
                    line,
                    field_type: FieldType::Unknown,
                }),
            ),
        }
    }

    fn refine_field(&mut self, field: ComponentId, field_type: FieldType) {
        if let Some(ComponentKind::Field(field)) = self.data.kind_mut(field) {
            field.refine_type(field_type);
        }
    }
}
