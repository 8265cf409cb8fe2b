use crate::components::ComponentKind;
use crate::descr::{
    AccumulateDescr, CollectDescr, Descr, FromDescr, InvokerDescr, PackageDescr, PatternDescr,
    PatternSourceDescr, RestrictionDescr, RuleDescr,
};
use crate::{AnalyticsData, ComponentType, Verifier};

fn flatten_rule(rule: RuleDescr) -> AnalyticsData {
    let mut verifier = Verifier::new();
    verifier
        .add_package(&PackageDescr::new("p").with_rule(rule))
        .unwrap();
    verifier.into_data()
}

fn item_pattern() -> PatternDescr {
    PatternDescr::new("Item").with_constraints(vec![Descr::constraint(
        "price",
        vec![RestrictionDescr::or(vec![
            RestrictionDescr::literal(">", "10"),
            RestrictionDescr::literal("<", "2"),
        ])],
    )])
}

#[test]
fn test_accumulate_source_is_flattened_before_constraints() {
    let source = PatternSourceDescr::Accumulate(AccumulateDescr {
        input: Box::new(item_pattern()),
        init_code: Some("int total = 0;".to_string()),
        action_code: Some("total += $i.price;".to_string()),
        reverse_code: None,
        result_code: Some("new Integer(total)".to_string()),
        class_name: None,
        external_function: false,
        function_identifier: None,
        expression: None,
    });
    let rule = RuleDescr::new("totals").with_lhs(vec![Descr::pattern(
        PatternDescr::new("Number")
            .with_source(source)
            .with_constraints(vec![Descr::constraint(
                "intValue",
                vec![RestrictionDescr::literal(">", "100")],
            )]),
    )]);
    let data = flatten_rule(rule);

    let (outer_id, outer) = data.patterns().find(|(_, p)| p.name == "Number").unwrap();
    let (inner_id, _) = data.patterns().find(|(_, p)| p.name == "Item").unwrap();
    assert_eq!(outer.source_type, Some(ComponentType::Accumulate));

    let accumulate = data.get(outer.source.unwrap()).unwrap();
    assert_eq!(accumulate.parent, Some(outer_id));
    let ComponentKind::Accumulate(accumulate_kind) = &accumulate.kind else {
        panic!("expected an accumulate component");
    };
    assert_eq!(accumulate_kind.input_pattern, Some(inner_id));
    assert_eq!(accumulate_kind.action_code.as_deref(), Some("total += $i.price;"));
    assert_eq!(data.get(inner_id).unwrap().parent, Some(accumulate.id));

    // Source first, then the outer pattern's own constraint
    let kinds: Vec<_> = data
        .children(outer_id)
        .map(|c| c.kind.component_type())
        .collect();
    assert_eq!(kinds, vec![ComponentType::Accumulate, ComponentType::Constraint]);

    // The inner pattern has two possibilities of its own and both reach the rule
    assert_eq!(data.pattern_possibilities_of(inner_id).len(), 2);
    assert_eq!(data.pattern_possibilities_of(outer_id).len(), 1);
    assert_eq!(data.rule_possibilities().len(), 2);
}

#[test]
fn test_inner_pattern_does_not_leak_into_outer_constraints() {
    let rule = RuleDescr::new("r").with_lhs(vec![Descr::pattern(
        PatternDescr::new("List")
            .with_source(PatternSourceDescr::Collect(CollectDescr {
                input: Box::new(item_pattern()),
                class_method_name: None,
            }))
            .with_constraints(vec![Descr::constraint(
                "size",
                vec![RestrictionDescr::literal(">", "3")],
            )]),
    )]);
    let data = flatten_rule(rule);

    let list = data.find_class("List").unwrap();
    let item = data.find_class("Item").unwrap();
    assert!(data.find_field(list, "size").is_some());
    assert!(data.find_field(item, "size").is_none());
    assert!(data.find_field(item, "price").is_some());

    let (outer_id, outer) = data.patterns().find(|(_, p)| p.name == "List").unwrap();
    assert_eq!(outer.source_type, Some(ComponentType::Collect));
    let size = data
        .restrictions()
        .find(|(_, r)| r.pattern == outer_id)
        .map(|(_, r)| r.field)
        .unwrap();
    assert_eq!(data.field(size).unwrap().name, "size");
}

#[test]
fn test_from_accessor_keeps_invoker_chain() {
    let source = PatternSourceDescr::From(FromDescr {
        data_source: InvokerDescr::Accessor {
            variable_name: "$order".to_string(),
            invokers: vec![
                InvokerDescr::MethodAccess {
                    method_name: "getLines".to_string(),
                    arguments: "()".to_string(),
                },
                InvokerDescr::FieldAccess {
                    field_name: "items".to_string(),
                    argument: None,
                },
            ],
        },
    });
    let rule = RuleDescr::new("r").with_lhs(vec![
        Descr::pattern(PatternDescr::new("Order").bound_to("$order")),
        Descr::pattern(PatternDescr::new("Line").with_source(source)),
    ]);
    let data = flatten_rule(rule);

    let (_, line) = data.patterns().find(|(_, p)| p.name == "Line").unwrap();
    assert_eq!(line.source_type, Some(ComponentType::From));

    let from = data.get(line.source.unwrap()).unwrap();
    let ComponentKind::From(from_kind) = &from.kind else {
        panic!("expected a from component");
    };
    assert_eq!(from_kind.data_source_type, Some(ComponentType::Accessor));

    let accessor = from_kind.data_source.unwrap();
    let chain: Vec<_> = data
        .children(accessor)
        .map(|c| (c.order_number, c.kind.component_type()))
        .collect();
    assert_eq!(
        chain,
        vec![
            (0, ComponentType::MethodAccess),
            (1, ComponentType::FieldAccess),
        ]
    );
}

#[test]
fn test_from_function_call() {
    let source = PatternSourceDescr::From(FromDescr {
        data_source: InvokerDescr::FunctionCall {
            name: "lookup".to_string(),
            arguments: "(\"x\")".to_string(),
        },
    });
    let data = flatten_rule(
        RuleDescr::new("r").with_lhs(vec![Descr::pattern(
            PatternDescr::new("Entry").with_source(source),
        )]),
    );

    let (_, entry) = data.patterns().next().unwrap();
    let from = data.get(entry.source.unwrap()).unwrap();
    let call = data.children(from.id).next().unwrap();
    let ComponentKind::FunctionCall(call) = &call.kind else {
        panic!("expected a function call component");
    };
    assert_eq!(call.name, "lookup");
}

#[test]
fn test_unknown_source_leaves_pattern_without_source() {
    let data = flatten_rule(RuleDescr::new("r").with_lhs(vec![Descr::pattern(
        PatternDescr::new("Entry").with_source(PatternSourceDescr::Unknown),
    )]));

    let (id, entry) = data.patterns().next().unwrap();
    assert_eq!(entry.source, None);
    assert_eq!(entry.source_type, None);
    assert_eq!(data.children(id).count(), 0);
}
