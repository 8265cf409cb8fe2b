use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Row, Table};
use verifier::{
    AnalyticsData, Component, ComponentId, ComponentKind, PatternPossibility, RestrictionKind,
};

enum LineType {
    Branch,
    Last,
}

impl LineType {
    fn format_line(&self, base_prefix: &str, content: &str) -> String {
        let symbol = match self {
            LineType::Branch => "├─",
            LineType::Last => "└─",
        };
        format!("{}{} {}\n", base_prefix, symbol, content)
    }

    fn continuation(&self) -> &'static str {
        match self {
            LineType::Branch => "│  ",
            LineType::Last => "   ",
        }
    }
}

pub struct Formatter {}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {}
    }

    /// Per-package counts of the flattened graph
    pub fn format_summary(&self, file_count: usize, data: &AnalyticsData) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "Flattened {} files into {} components\n\n",
            file_count,
            data.len()
        ));

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("Package").set_alignment(CellAlignment::Left),
            Cell::new("Rules").set_alignment(CellAlignment::Right),
            Cell::new("Patterns").set_alignment(CellAlignment::Right),
            Cell::new("Restrictions").set_alignment(CellAlignment::Right),
            Cell::new("Rule possibilities").set_alignment(CellAlignment::Right),
        ]));

        for (package_id, package) in data.packages() {
            let rules: Vec<ComponentId> = data
                .rules()
                .filter(|(_, rule)| rule.package == package_id)
                .map(|(id, _)| id)
                .collect();
            let patterns: usize = rules.iter().map(|r| data.patterns_of_rule(*r).len()).sum();
            let restrictions = data
                .restrictions()
                .filter(|(_, restriction)| rules.contains(&restriction.rule))
                .count();
            let possibilities: usize = rules
                .iter()
                .map(|r| data.rule_possibilities_of(*r).len())
                .sum();

            table.add_row(Row::from(vec![
                Cell::new(&package.name),
                Cell::new(rules.len()).set_alignment(CellAlignment::Right),
                Cell::new(patterns).set_alignment(CellAlignment::Right),
                Cell::new(restrictions).set_alignment(CellAlignment::Right),
                Cell::new(possibilities).set_alignment(CellAlignment::Right),
            ]));
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&format!(
            "\n{} classes, {} fields, {} variables\n",
            data.classes().count(),
            data.fields().count(),
            data.variables().count()
        ));
        output
    }

    /// One table per rule listing its possibilities, optionally restricted to a rule name
    pub fn format_possibilities(&self, data: &AnalyticsData, rule_name: Option<&str>) -> String {
        let mut output = String::new();

        for (rule_id, rule) in data.rules() {
            if rule_name.is_some_and(|name| name != rule.name) {
                continue;
            }

            let possibilities = data.rule_possibilities_of(rule_id);
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(Row::from(vec![Cell::new(format!(
                "{} (line {}, {} possibilities)",
                rule.name,
                rule.line,
                possibilities.len()
            ))]));

            for possibility in possibilities {
                let patterns: Vec<String> = possibility
                    .patterns
                    .iter()
                    .filter_map(|id| data.pattern_possibility(*id))
                    .map(|p| self.format_pattern_possibility(data, p))
                    .collect();
                let line = if patterns.is_empty() {
                    "(no patterns)".to_string()
                } else {
                    patterns.join("\n& ")
                };
                table.add_row(Row::from(vec![Cell::new(line)]));
            }

            output.push_str(&table.to_string());
            output.push('\n');
        }

        output
    }

    fn format_pattern_possibility(&self, data: &AnalyticsData, possibility: &PatternPossibility) -> String {
        let Some(pattern) = data.pattern(possibility.pattern) else {
            return String::new();
        };

        let restrictions: Vec<String> = possibility
            .restrictions
            .iter()
            .filter_map(|id| data.restriction(*id))
            .map(|restriction| {
                let field = data
                    .field(restriction.field)
                    .map(|f| f.name.as_str())
                    .unwrap_or("?");
                format!("{} {}", field, restriction)
            })
            .collect();

        let quantifier = if pattern.is_not {
            "not "
        } else if pattern.is_exists {
            "exists "
        } else if pattern.is_forall {
            "forall "
        } else {
            ""
        };
        format!("{}{}({})", quantifier, pattern.name, restrictions.join(", "))
    }

    /// Component tree below a rule, children in order-number order
    pub fn format_rule_tree(&self, data: &AnalyticsData, rule_id: ComponentId) -> String {
        let mut output = String::new();
        if let Some(component) = data.get(rule_id) {
            output.push_str(&self.describe(data, component));
            output.push('\n');
            self.format_children(data, rule_id, "", &mut output);
        }
        output
    }

    fn format_children(&self, data: &AnalyticsData, parent: ComponentId, prefix: &str, output: &mut String) {
        let children: Vec<&Component> = data.children(parent).collect();
        for (i, child) in children.iter().enumerate() {
            let line_type = if i + 1 == children.len() {
                LineType::Last
            } else {
                LineType::Branch
            };
            output.push_str(&line_type.format_line(prefix, &self.describe(data, child)));
            let nested = format!("{}{}", prefix, line_type.continuation());
            self.format_children(data, child.id, &nested, output);
        }
    }

    fn describe(&self, data: &AnalyticsData, component: &Component) -> String {
        let body = match &component.kind {
            ComponentKind::RulePackage(package) => format!("package {}", package.name),
            ComponentKind::Rule(rule) => {
                format!("rule {} (salience {}, line {})", rule.name, rule.salience, rule.line)
            }
            ComponentKind::Pattern(pattern) => {
                let mut flags = Vec::new();
                if pattern.is_not {
                    flags.push("not");
                }
                if pattern.is_exists {
                    flags.push("exists");
                }
                if pattern.is_forall {
                    flags.push("forall");
                }
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                };
                match &pattern.identifier {
                    Some(identifier) => format!("pattern {} : {}{}", identifier, pattern.name, flags),
                    None => format!("pattern {}{}", pattern.name, flags),
                }
            }
            ComponentKind::Constraint(constraint) => format!("constraint {}", constraint.field_name),
            ComponentKind::Restriction(restriction) => {
                let kind = match restriction.kind {
                    RestrictionKind::Literal { .. } => "literal",
                    RestrictionKind::Variable { .. } => "variable",
                    RestrictionKind::ReturnValue { .. } => "return value",
                    RestrictionKind::QualifiedIdentifier { .. } => "qualified identifier",
                };
                format!("{} restriction {}", kind, restriction)
            }
            ComponentKind::Variable(variable) => {
                let object = object_name(data, variable.object_id)
                    .unwrap_or_else(|| variable.object_name.clone());
                format!("variable {} -> {}", variable.name, object)
            }
            ComponentKind::Class(class) => format!("class {}", class.name),
            ComponentKind::Field(field) => format!("field {}.{} : {}", field.class_name, field.name, field.field_type),
            ComponentKind::Consequence(consequence) => format!("consequence {}", consequence.text),
            ComponentKind::Operator(operator) => operator.connective.to_string(),
            ComponentKind::Eval(eval) => format!("eval {}", eval.content),
            ComponentKind::Predicate(predicate) => format!("predicate {}", predicate.content),
            ComponentKind::Accumulate(_) => "accumulate".to_string(),
            ComponentKind::Collect(_) => "collect".to_string(),
            ComponentKind::From(_) => "from".to_string(),
            ComponentKind::FieldAccess(access) => match &access.argument {
                Some(argument) => format!("field access {}[{}]", access.field_name, argument),
                None => format!("field access {}", access.field_name),
            },
            ComponentKind::MethodAccess(access) => {
                format!("method access {}({})", access.method_name, access.arguments)
            }
            ComponentKind::FunctionCall(call) => format!("function call {}({})", call.name, call.arguments),
            ComponentKind::Accessor(accessor) => format!("accessor {}", accessor.variable_name),
        };
        format!("#{} {}", component.id, body)
    }
}

/// Display name of the class or field a variable points at
fn object_name(data: &AnalyticsData, id: Option<ComponentId>) -> Option<String> {
    let id = id?;
    if let Some(class) = data.class(id) {
        return Some(class.name.clone());
    }
    data.field(id)
        .map(|field| format!("{}.{}", field.class_name, field.name))
}
