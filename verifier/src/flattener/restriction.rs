//! Field constraints, field bindings and the restrictions under them

use super::{ConstraintSite, Context, PackageDescrFlattener, RuleSite};
use crate::components::{
    ComponentId, ComponentKind, ComponentType, Constraint, FieldType, LiteralValue, Operator,
    Restriction, RestrictionKind, Variable,
};
use crate::descr::{Connective, FieldBindingDescr, FieldConstraintDescr, RestrictionDescr};
use crate::solver::Scope;
use crate::VerifierResult;
use tracing::warn;

impl PackageDescrFlattener<'_> {
    /// The field is looked up (or created) before any restriction under it is seen
    pub(super) fn flatten_field_constraint<'a>(
        &mut self,
        descr: &'a FieldConstraintDescr,
        parent: ComponentId,
        ctx: Context<'a>,
    ) -> VerifierResult<()> {
        let pattern = ctx.pattern_site("field constraint")?;
        let field = self.field_for(pattern, &descr.field_name, descr.line);

        let id = self.data.add(
            Some(parent),
            ComponentKind::Constraint(Constraint {
                rule: ctx.rule.id,
                pattern: pattern.id,
                pattern_is_not: pattern.is_not,
                field,
                field_name: descr.field_name.clone(),
            }),
        );

        let ctx = Context {
            constraint: Some(ConstraintSite { id, field }),
            ..ctx
        };
        for restriction in &descr.restrictions {
            self.flatten_restriction(restriction, id, ctx)?;
        }
        Ok(())
    }

    /// `$n : name` declares a variable denoting the field's value
    pub(super) fn flatten_field_binding(
        &mut self,
        descr: &FieldBindingDescr,
        parent: ComponentId,
        ctx: Context<'_>,
    ) -> VerifierResult<()> {
        let pattern = ctx.pattern_site("field binding")?;
        let field = self.field_for(pattern, &descr.field_name, descr.line);

        self.data.add(
            Some(parent),
            ComponentKind::Variable(Variable {
                rule: ctx.rule.id,
                rule_name: ctx.rule.name.to_string(),
                name: descr.identifier.clone(),
                object_type: ComponentType::Field,
                object_id: Some(field),
                object_name: descr.field_name.clone(),
            }),
        );
        Ok(())
    }

    fn flatten_restriction<'a>(
        &mut self,
        descr: &'a RestrictionDescr,
        parent: ComponentId,
        ctx: Context<'a>,
    ) -> VerifierResult<()> {
        let rule = ctx.rule;
        let (pattern, constraint) = ctx.constraint_site("restriction")?;

        let (operator, kind, refinement) = match descr {
            RestrictionDescr::Literal {
                evaluator,
                negated,
                text,
            } => {
                let operator = resolve_operator(rule, evaluator, *negated)?;
                let value = LiteralValue::infer(text.as_deref());
                let refinement = Some(value.field_type());
                let kind = RestrictionKind::Literal {
                    text: text.clone(),
                    value,
                };
                (operator, kind, refinement)
            }
            RestrictionDescr::Variable {
                evaluator,
                negated,
                identifier,
            } => {
                let operator = resolve_operator(rule, evaluator, *negated)?;
                let variable = self
                    .data
                    .find_variable(rule.id, identifier)
                    .ok_or_else(|| rule.unresolved(identifier))?;
                let kind = RestrictionKind::Variable {
                    variable,
                    variable_name: identifier.clone(),
                };
                (operator, kind, Some(FieldType::Variable))
            }
            RestrictionDescr::ReturnValue {
                evaluator,
                negated,
                content,
                declarations,
                class_method_name,
            } => {
                let operator = resolve_operator(rule, evaluator, *negated)?;
                let kind = RestrictionKind::ReturnValue {
                    content: content.clone(),
                    declarations: declarations.clone(),
                    class_method_name: class_method_name.clone(),
                };
                (operator, kind, None)
            }
            RestrictionDescr::QualifiedIdentifier {
                evaluator,
                negated,
                text,
            } => {
                let operator = resolve_operator(rule, evaluator, *negated)?;
                let (name, path) = split_qualified(text).ok_or_else(|| rule.malformed(text))?;
                let variable = self
                    .data
                    .find_variable(rule.id, name)
                    .ok_or_else(|| rule.unresolved(name))?;
                if let Some(ComponentKind::Variable(declared)) = self.data.kind_mut(variable) {
                    declared.object_type = ComponentType::Field;
                }
                let kind = RestrictionKind::QualifiedIdentifier {
                    variable,
                    variable_name: name.to_string(),
                    variable_path: path.to_string(),
                };
                (operator, kind, Some(FieldType::Variable))
            }
            RestrictionDescr::Connective {
                connective,
                restrictions,
            } => return self.flatten_restriction_connective(*connective, restrictions, parent, ctx),
            RestrictionDescr::Unknown => {
                warn!(rule = rule.name, "skipping restriction of unknown kind");
                return Ok(());
            }
        };

        let id = self.data.add(
            Some(parent),
            ComponentKind::Restriction(Restriction {
                rule: rule.id,
                rule_name: rule.name.to_string(),
                pattern: pattern.id,
                pattern_is_not: pattern.is_not,
                constraint: constraint.id,
                field: constraint.field,
                operator,
                kind,
            }),
        );
        if let Some(field_type) = refinement {
            self.refine_field(constraint.field, field_type);
        }

        self.solver.add_restriction(id).map_err(|e| rule.solver(e))
    }

    /// `> 10 || < 5`: no component of its own, the restrictions stay children of the
    /// constraint while the solver combines them under the connective
    fn flatten_restriction_connective<'a>(
        &mut self,
        connective: Connective,
        restrictions: &'a [RestrictionDescr],
        parent: ComponentId,
        ctx: Context<'a>,
    ) -> VerifierResult<()> {
        let ctx = self.descend(ctx)?;
        self.within(ctx.rule, Scope::Operator(connective), |this| {
            for restriction in restrictions {
                this.flatten_restriction(restriction, parent, ctx)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

fn resolve_operator(rule: RuleSite<'_>, evaluator: &str, negated: bool) -> VerifierResult<Operator> {
    Operator::determine(evaluator, negated).ok_or_else(|| rule.unknown_operator(evaluator))
}

/// Split `$p.address.city` at the first dot into `$p` and `.address.city`
fn split_qualified(text: &str) -> Option<(&str, &str)> {
    let dot = text.find('.')?;
    Some(text.split_at(dot))
}
