//! Pattern sources: `accumulate`, `collect` and `from` with its invokers

use super::{Context, PackageDescrFlattener};
use crate::components::{
    Accessor, AnalyticsAccumulate, AnalyticsCollect, AnalyticsFrom, ComponentId, ComponentKind,
    ComponentType, FieldAccess, FunctionCall, MethodAccess,
};
use crate::descr::{InvokerDescr, PatternSourceDescr};
use crate::VerifierResult;
use tracing::warn;

impl PackageDescrFlattener<'_> {
    /// Returns the source component and its type, or `None` for a source kind that
    /// was skipped
    pub(super) fn flatten_source<'a>(
        &mut self,
        descr: &'a PatternSourceDescr,
        parent: ComponentId,
        ctx: Context<'a>,
    ) -> VerifierResult<Option<(ComponentId, ComponentType)>> {
        let ctx = self.descend(ctx)?;

        match descr {
            PatternSourceDescr::Accumulate(accumulate) => {
                let id = self.data.add(
                    Some(parent),
                    ComponentKind::Accumulate(AnalyticsAccumulate {
                        input_pattern: None,
                        init_code: accumulate.init_code.clone(),
                        action_code: accumulate.action_code.clone(),
                        reverse_code: accumulate.reverse_code.clone(),
                        result_code: accumulate.result_code.clone(),
                        class_name: accumulate.class_name.clone(),
                        external_function: accumulate.external_function,
                        function_identifier: accumulate.function_identifier.clone(),
                        expression: accumulate.expression.clone(),
                    }),
                );
                let input = self.flatten_pattern(&accumulate.input, id, ctx)?;
                if let Some(ComponentKind::Accumulate(component)) = self.data.kind_mut(id) {
                    component.input_pattern = Some(input);
                }
                Ok(Some((id, ComponentType::Accumulate)))
            }
            PatternSourceDescr::Collect(collect) => {
                let id = self.data.add(
                    Some(parent),
                    ComponentKind::Collect(AnalyticsCollect {
                        input_pattern: None,
                        class_method_name: collect.class_method_name.clone(),
                    }),
                );
                let input = self.flatten_pattern(&collect.input, id, ctx)?;
                if let Some(ComponentKind::Collect(component)) = self.data.kind_mut(id) {
                    component.input_pattern = Some(input);
                }
                Ok(Some((id, ComponentType::Collect)))
            }
            PatternSourceDescr::From(from) => {
                let id = self.data.add(
                    Some(parent),
                    ComponentKind::From(AnalyticsFrom {
                        data_source: None,
                        data_source_type: None,
                    }),
                );
                if let Some((source, source_type)) =
                    self.flatten_invoker(&from.data_source, id, ctx)?
                {
                    if let Some(ComponentKind::From(component)) = self.data.kind_mut(id) {
                        component.data_source = Some(source);
                        component.data_source_type = Some(source_type);
                    }
                }
                Ok(Some((id, ComponentType::From)))
            }
            PatternSourceDescr::Unknown => {
                warn!(rule = ctx.rule.name, "skipping pattern source of unknown kind");
                Ok(None)
            }
        }
    }

    /// Accessors keep their chained invokers as ordered children
    fn flatten_invoker(
        &mut self,
        descr: &InvokerDescr,
        parent: ComponentId,
        ctx: Context<'_>,
    ) -> VerifierResult<Option<(ComponentId, ComponentType)>> {
        let kind = match descr {
            InvokerDescr::FieldAccess {
                field_name,
                argument,
            } => ComponentKind::FieldAccess(FieldAccess {
                field_name: field_name.clone(),
                argument: argument.clone(),
            }),
            InvokerDescr::MethodAccess {
                method_name,
                arguments,
            } => ComponentKind::MethodAccess(MethodAccess {
                method_name: method_name.clone(),
                arguments: arguments.clone(),
            }),
            InvokerDescr::FunctionCall { name, arguments } => {
                ComponentKind::FunctionCall(FunctionCall {
                    name: name.clone(),
                    arguments: arguments.clone(),
                })
            }
            InvokerDescr::Accessor {
                variable_name,
                invokers,
            } => {
                let ctx = self.descend(ctx)?;
                let id = self.data.add(
                    Some(parent),
                    ComponentKind::Accessor(Accessor {
                        variable_name: variable_name.clone(),
                    }),
                );
                for invoker in invokers {
                    self.flatten_invoker(invoker, id, ctx)?;
                }
                return Ok(Some((id, ComponentType::Accessor)));
            }
            InvokerDescr::Unknown => {
                warn!(rule = ctx.rule.name, "skipping invoker of unknown kind");
                return Ok(None);
            }
        };

        let component_type = kind.component_type();
        Ok(Some((self.data.add(Some(parent), kind), component_type)))
    }
}
