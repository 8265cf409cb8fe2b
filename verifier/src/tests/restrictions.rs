use crate::components::{Evaluator, LiteralValue, RestrictionKind};
use crate::descr::{Descr, PackageDescr, PatternDescr, RestrictionDescr, RuleDescr};
use crate::{AnalyticsData, ComponentType, FieldType, Verifier, VerifierError};
use rust_decimal::Decimal;
use std::str::FromStr;

fn flatten_rule(rule: RuleDescr) -> AnalyticsData {
    let mut verifier = Verifier::new();
    verifier
        .add_package(&PackageDescr::new("p").with_rule(rule))
        .unwrap();
    verifier.into_data()
}

fn single_pattern(class: &str, constraints: Vec<Descr>) -> RuleDescr {
    RuleDescr::new("r").with_lhs(vec![Descr::pattern(
        PatternDescr::new(class).with_constraints(constraints),
    )])
}

fn restriction_texts(data: &AnalyticsData, restrictions: &[crate::ComponentId]) -> Vec<String> {
    restrictions
        .iter()
        .map(|id| data.restriction(*id).unwrap().to_string())
        .collect()
}

#[test]
fn test_literal_restriction_refines_field_type() {
    let data = flatten_rule(single_pattern(
        "Invoice",
        vec![
            Descr::constraint("count", vec![RestrictionDescr::literal(">", "10")]),
            Descr::constraint("amount", vec![RestrictionDescr::literal("<=", "99.95")]),
            Descr::constraint("due", vec![RestrictionDescr::literal("<", "27-Oct-2009")]),
            Descr::constraint("paid", vec![RestrictionDescr::literal("==", "false")]),
            Descr::constraint("customer", vec![RestrictionDescr::literal("==", "ACME")]),
        ],
    ));

    let class = data.find_class("Invoice").unwrap();
    let field_type = |name: &str| data.field(data.find_field(class, name).unwrap()).unwrap().field_type;
    assert_eq!(field_type("count"), FieldType::Int);
    assert_eq!(field_type("amount"), FieldType::Decimal);
    assert_eq!(field_type("due"), FieldType::Date);
    assert_eq!(field_type("paid"), FieldType::Boolean);
    assert_eq!(field_type("customer"), FieldType::String);

    let (_, amount) = data
        .restrictions()
        .find(|(_, r)| matches!(&r.kind, RestrictionKind::Literal { text: Some(t), .. } if t == "99.95"))
        .unwrap();
    assert_eq!(
        amount.kind,
        RestrictionKind::Literal {
            text: Some("99.95".to_string()),
            value: LiteralValue::Decimal(Decimal::from_str("99.95").unwrap()),
        }
    );
}

#[test]
fn test_field_type_refined_only_once() {
    let data = flatten_rule(single_pattern(
        "Person",
        vec![
            Descr::constraint(
                "age",
                vec![RestrictionDescr::Literal {
                    evaluator: "!=".to_string(),
                    negated: false,
                    text: None,
                }],
            ),
            Descr::constraint("age", vec![RestrictionDescr::literal(">", "18")]),
            Descr::constraint("age", vec![RestrictionDescr::literal("!=", "unknown")]),
        ],
    ));

    let field = data.find_field_by_names("Person", "age").unwrap();
    assert_eq!(data.field(field).unwrap().field_type, FieldType::Int);
    assert_eq!(data.fields().count(), 1);
}

#[test]
fn test_negated_operators_fold_into_complement() {
    let data = flatten_rule(single_pattern(
        "Person",
        vec![
            Descr::constraint("age", vec![RestrictionDescr::literal("<", "18").negate()]),
            Descr::constraint("name", vec![RestrictionDescr::literal("matches", "A.*").negate()]),
        ],
    ));

    let operators: Vec<_> = data.restrictions().map(|(_, r)| r.operator).collect();
    assert_eq!(operators[0].evaluator, Evaluator::GreaterOrEqual);
    assert!(!operators[0].negated);
    assert_eq!(operators[1].evaluator, Evaluator::Matches);
    assert!(operators[1].negated);
}

#[test]
fn test_unknown_operator_is_fatal() {
    let mut verifier = Verifier::new();
    let rule = single_pattern(
        "Person",
        vec![Descr::constraint("age", vec![RestrictionDescr::literal("~=", "1")])],
    )
    .with_line(21);

    let err = verifier
        .add_package(&PackageDescr::new("p").with_rule(rule))
        .unwrap_err();
    match err {
        VerifierError::UnknownOperator { operator, line, .. } => {
            assert_eq!(operator, "~=");
            assert_eq!(line, 21);
        }
        other => panic!("expected unknown operator, got {:?}", other),
    }
}

#[test]
fn test_restriction_connective_splits_pattern_possibilities() {
    let data = flatten_rule(single_pattern(
        "Person",
        vec![
            Descr::constraint("name", vec![RestrictionDescr::literal("==", "Toni")]),
            Descr::constraint(
                "age",
                vec![RestrictionDescr::or(vec![
                    RestrictionDescr::literal(">", "10"),
                    RestrictionDescr::literal("<", "5"),
                ])],
            ),
        ],
    ));

    let possibilities = data.pattern_possibilities();
    assert_eq!(possibilities.len(), 2);
    assert_eq!(
        restriction_texts(&data, &possibilities[0].restrictions),
        vec!["== \"Toni\"", "> 10"]
    );
    assert_eq!(
        restriction_texts(&data, &possibilities[1].restrictions),
        vec!["== \"Toni\"", "< 5"]
    );

    // The connective creates no component: both restrictions hang off the constraint
    let (age_constraint, _) = data
        .constraints()
        .find(|(_, c)| c.field_name == "age")
        .unwrap();
    assert_eq!(data.children(age_constraint).count(), 2);
}

#[test]
fn test_constraint_level_or_inside_pattern() {
    // Person( a == 1, b == 2 || c == 3 )
    let data = flatten_rule(single_pattern(
        "Person",
        vec![
            Descr::constraint("a", vec![RestrictionDescr::literal("==", "1")]),
            Descr::or(vec![
                Descr::constraint("b", vec![RestrictionDescr::literal("==", "2")]),
                Descr::constraint("c", vec![RestrictionDescr::literal("==", "3")]),
            ]),
        ],
    ));

    let possibilities: Vec<_> = data
        .pattern_possibilities()
        .iter()
        .map(|p| restriction_texts(&data, &p.restrictions))
        .collect();
    assert_eq!(
        possibilities,
        vec![vec!["== 1", "== 2"], vec!["== 1", "== 3"]]
    );

    let (pattern, _) = data.patterns().next().unwrap();
    let kinds: Vec<_> = data
        .children(pattern)
        .map(|c| c.kind.component_type())
        .collect();
    assert_eq!(kinds, vec![ComponentType::Constraint, ComponentType::Operator]);
}

#[test]
fn test_qualified_identifier_marks_variable_as_field() {
    let rule = RuleDescr::new("r").with_lhs(vec![
        Descr::pattern(PatternDescr::new("Person").bound_to("$p")),
        Descr::pattern(PatternDescr::new("Order").with_constraints(vec![Descr::constraint(
            "city",
            vec![RestrictionDescr::qualified("==", "$p.address.city")],
        )])),
    ]);
    let data = flatten_rule(rule);

    let (_, restriction) = data.restrictions().next().unwrap();
    let RestrictionKind::QualifiedIdentifier {
        variable,
        variable_name,
        variable_path,
    } = &restriction.kind
    else {
        panic!("expected a qualified identifier restriction");
    };
    assert_eq!(variable_name, "$p");
    assert_eq!(variable_path, ".address.city");
    assert_eq!(restriction.to_string(), "== $p.address.city");
    assert_eq!(
        data.variable(*variable).unwrap().object_type,
        ComponentType::Field
    );
    assert_eq!(
        data.field(restriction.field).unwrap().field_type,
        FieldType::Variable
    );
}

#[test]
fn test_malformed_qualified_identifier() {
    let mut verifier = Verifier::new();
    let rule = RuleDescr::new("r").with_lhs(vec![
        Descr::pattern(PatternDescr::new("Person").bound_to("$p")),
        Descr::pattern(PatternDescr::new("Order").with_constraints(vec![Descr::constraint(
            "city",
            vec![RestrictionDescr::qualified("==", "$p")],
        )])),
    ]);

    let err = verifier
        .add_package(&PackageDescr::new("p").with_rule(rule))
        .unwrap_err();
    assert!(matches!(err, VerifierError::MalformedIdentifier { text, .. } if text == "$p"));
}

#[test]
fn test_qualified_identifier_with_bare_dot() {
    let rule = RuleDescr::new("r").with_lhs(vec![
        Descr::pattern(PatternDescr::new("Person").bound_to("$p")),
        Descr::pattern(PatternDescr::new("Order").with_constraints(vec![Descr::constraint(
            "buyer",
            vec![RestrictionDescr::qualified("==", "$p.")],
        )])),
    ]);
    let data = flatten_rule(rule);

    let (_, restriction) = data.restrictions().next().unwrap();
    assert!(matches!(
        &restriction.kind,
        RestrictionKind::QualifiedIdentifier { variable_name, variable_path, .. }
            if variable_name == "$p" && variable_path == "."
    ));
}

#[test]
fn test_qualified_identifier_without_name_is_unresolved() {
    let mut verifier = Verifier::new();
    let rule = RuleDescr::new("r").with_line(2).with_lhs(vec![Descr::pattern(
        PatternDescr::new("Order").with_constraints(vec![Descr::constraint(
            "city",
            vec![RestrictionDescr::qualified("==", ".city")],
        )]),
    )]);

    let err = verifier
        .add_package(&PackageDescr::new("p").with_rule(rule))
        .unwrap_err();
    assert!(matches!(err, VerifierError::UnresolvedVariable { name, line: 2, .. } if name.is_empty()));
}

#[test]
fn test_return_value_restriction_keeps_expression() {
    let data = flatten_rule(single_pattern(
        "Order",
        vec![Descr::constraint(
            "total",
            vec![RestrictionDescr::return_value(">", "$a * 2", vec!["$a".to_string()])],
        )],
    ));

    let (_, restriction) = data.restrictions().next().unwrap();
    assert_eq!(restriction.to_string(), "> ( $a * 2 )");
    assert_eq!(
        data.field(restriction.field).unwrap().field_type,
        FieldType::Unknown
    );
}

#[test]
fn test_field_binding_denotes_field() {
    let data = flatten_rule(single_pattern("Person", vec![Descr::binding("$age", "age")]));

    let rule = data.find_rules("r")[0];
    let variable = data.variable(data.find_variable(rule, "$age").unwrap()).unwrap();
    assert_eq!(variable.object_type, ComponentType::Field);
    assert_eq!(variable.object_id, data.find_field_by_names("Person", "age"));

    // A binding restricts nothing, so the pattern has one empty possibility
    assert_eq!(data.pattern_possibilities().len(), 1);
    assert!(data.pattern_possibilities()[0].restrictions.is_empty());
}

#[test]
fn test_predicate_inside_pattern() {
    let data = flatten_rule(single_pattern(
        "Person",
        vec![Descr::binding("$a", "age"), Descr::predicate("$a > 18")],
    ));

    let (pattern, _) = data.patterns().next().unwrap();
    let kinds: Vec<_> = data
        .children(pattern)
        .map(|c| c.kind.component_type())
        .collect();
    assert_eq!(kinds, vec![ComponentType::Variable, ComponentType::Predicate]);
}
