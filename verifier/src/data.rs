//! In-memory analytic graph store
//!
//! An arena of components addressed by store-assigned ids, plus the lookup indexes
//! the flattener needs: packages and classes by name, fields by owning class and
//! variables by declaring rule. Ids are allocated monotonically starting at 1, and
//! each new component takes the next free order number under its parent.

use crate::components::{
    AnalyticsClass, AnalyticsRule, Component, ComponentId, ComponentKind, Constraint,
    Consequence, Field, Pattern, Restriction, RulePackage, Variable,
};
use crate::solver::{PatternPossibility, PossibilityId, RulePossibility};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyticsData {
    components: Vec<Component>,
    pattern_possibilities: Vec<PatternPossibility>,
    rule_possibilities: Vec<RulePossibility>,
    #[serde(skip)]
    next_possibility: u64,
    #[serde(skip)]
    children: HashMap<Option<ComponentId>, Vec<ComponentId>>,
    #[serde(skip)]
    packages_by_name: HashMap<String, ComponentId>,
    #[serde(skip)]
    classes_by_name: HashMap<String, ComponentId>,
    #[serde(skip)]
    fields_by_class: HashMap<(ComponentId, String), ComponentId>,
    #[serde(skip)]
    variables_by_rule: HashMap<(ComponentId, String), ComponentId>,
    #[serde(skip)]
    journal: Option<Journal>,
}

/// What a rollback needs to restore the store to an earlier checkpoint: the
/// collection lengths at that point and the original kind of every component that
/// existed then and was modified since
#[derive(Debug, Clone, Default)]
struct Journal {
    components: usize,
    pattern_possibilities: usize,
    rule_possibilities: usize,
    next_possibility: u64,
    overwritten: Vec<(usize, ComponentKind)>,
}

impl AnalyticsData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a component under `parent`, assigning its id and order number
    pub fn add(&mut self, parent: Option<ComponentId>, kind: ComponentKind) -> ComponentId {
        let id = ComponentId::new(self.components.len() as u64 + 1);
        let siblings = self.children.entry(parent).or_default();
        let order_number = siblings.len();
        siblings.push(id);

        match &kind {
            ComponentKind::RulePackage(package) => {
                self.packages_by_name
                    .entry(package.name.clone())
                    .or_insert(id);
            }
            ComponentKind::Class(class) => {
                self.classes_by_name.entry(class.name.clone()).or_insert(id);
            }
            ComponentKind::Field(field) => {
                self.fields_by_class
                    .entry((field.class, field.name.clone()))
                    .or_insert(id);
            }
            // A rebinding shadows the earlier declaration from here on
            ComponentKind::Variable(variable) => {
                self.variables_by_rule
                    .insert((variable.rule, variable.name.clone()), id);
            }
            _ => {}
        }

        self.components.push(Component {
            id,
            parent,
            order_number,
            kind,
        });
        id
    }

    pub fn add_pattern_possibility(
        &mut self,
        rule: ComponentId,
        pattern: ComponentId,
        restrictions: Vec<ComponentId>,
    ) -> PossibilityId {
        let id = self.next_possibility_id();
        self.pattern_possibilities.push(PatternPossibility {
            id,
            rule,
            pattern,
            restrictions,
        });
        id
    }

    pub fn add_rule_possibility(
        &mut self,
        rule: ComponentId,
        patterns: Vec<PossibilityId>,
    ) -> PossibilityId {
        let id = self.next_possibility_id();
        self.rule_possibilities.push(RulePossibility { id, rule, patterns });
        id
    }

    fn next_possibility_id(&mut self) -> PossibilityId {
        self.next_possibility += 1;
        PossibilityId::new(self.next_possibility)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        let index = usize::try_from(id.value()).ok()?.checked_sub(1)?;
        self.components.get(index)
    }

    pub(crate) fn kind_mut(&mut self, id: ComponentId) -> Option<&mut ComponentKind> {
        let index = usize::try_from(id.value()).ok()?.checked_sub(1)?;
        let component = self.components.get_mut(index)?;
        if let Some(journal) = &mut self.journal {
            if index < journal.components && journal.overwritten.iter().all(|(i, _)| *i != index) {
                journal.overwritten.push((index, component.kind.clone()));
            }
        }
        Some(&mut component.kind)
    }

    /// Start recording changes so they can be undone with [`rollback`](Self::rollback)
    pub(crate) fn begin(&mut self) {
        self.journal = Some(Journal {
            components: self.components.len(),
            pattern_possibilities: self.pattern_possibilities.len(),
            rule_possibilities: self.rule_possibilities.len(),
            next_possibility: self.next_possibility,
            overwritten: Vec::new(),
        });
    }

    /// Keep everything added since [`begin`](Self::begin)
    pub(crate) fn commit(&mut self) {
        self.journal = None;
    }

    /// Drop everything added since [`begin`](Self::begin) and restore modified
    /// components, leaving ids, order numbers and indexes as they were
    pub(crate) fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };

        for (index, kind) in journal.overwritten.into_iter().rev() {
            if let Some(component) = self.components.get_mut(index) {
                component.kind = kind;
            }
        }

        // Components are removed newest first, so each one is the last of its siblings
        while self.components.len() > journal.components {
            let Some(component) = self.components.pop() else {
                break;
            };
            if let Some(siblings) = self.children.get_mut(&component.parent) {
                siblings.pop();
                if siblings.is_empty() {
                    self.children.remove(&component.parent);
                }
            }
            self.unindex(&component);
        }

        self.pattern_possibilities
            .truncate(journal.pattern_possibilities);
        self.rule_possibilities.truncate(journal.rule_possibilities);
        self.next_possibility = journal.next_possibility;
    }

    /// Variables never outlive their rule, so a removed variable cannot have shadowed
    /// one that stays
    fn unindex(&mut self, component: &Component) {
        let id = component.id;
        match &component.kind {
            ComponentKind::RulePackage(package) => {
                if self.packages_by_name.get(&package.name) == Some(&id) {
                    self.packages_by_name.remove(&package.name);
                }
            }
            ComponentKind::Class(class) => {
                if self.classes_by_name.get(&class.name) == Some(&id) {
                    self.classes_by_name.remove(&class.name);
                }
            }
            ComponentKind::Field(field) => {
                let key = (field.class, field.name.clone());
                if self.fields_by_class.get(&key) == Some(&id) {
                    self.fields_by_class.remove(&key);
                }
            }
            ComponentKind::Variable(variable) => {
                let key = (variable.rule, variable.name.clone());
                if self.variables_by_rule.get(&key) == Some(&id) {
                    self.variables_by_rule.remove(&key);
                }
            }
            _ => {}
        }
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    /// Children of `parent` in order-number order
    pub fn children(&self, parent: ComponentId) -> impl Iterator<Item = &Component> {
        self.children_of(Some(parent))
    }

    /// Components without a parent: packages and classes
    pub fn roots(&self) -> impl Iterator<Item = &Component> {
        self.children_of(None)
    }

    fn children_of(&self, parent: Option<ComponentId>) -> impl Iterator<Item = &Component> {
        self.children
            .get(&parent)
            .into_iter()
            .flatten()
            .filter_map(|id| self.get(*id))
    }

    pub fn find_package(&self, name: &str) -> Option<ComponentId> {
        self.packages_by_name.get(name).copied()
    }

    pub fn find_class(&self, name: &str) -> Option<ComponentId> {
        self.classes_by_name.get(name).copied()
    }

    pub fn find_field(&self, class: ComponentId, name: &str) -> Option<ComponentId> {
        self.fields_by_class.get(&(class, name.to_string())).copied()
    }

    pub fn find_field_by_names(&self, class_name: &str, field_name: &str) -> Option<ComponentId> {
        self.find_class(class_name)
            .and_then(|class| self.find_field(class, field_name))
    }

    /// Latest variable named `name` declared so far in `rule`
    pub fn find_variable(&self, rule: ComponentId, name: &str) -> Option<ComponentId> {
        self.variables_by_rule
            .get(&(rule, name.to_string()))
            .copied()
    }

    /// Rules named `name`, across all packages
    pub fn find_rules(&self, name: &str) -> Vec<ComponentId> {
        self.rules()
            .filter(|(_, rule)| rule.name == name)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn package(&self, id: ComponentId) -> Option<&RulePackage> {
        self.get(id).and_then(|c| c.kind.as_package())
    }

    pub fn rule(&self, id: ComponentId) -> Option<&AnalyticsRule> {
        self.get(id).and_then(|c| c.kind.as_rule())
    }

    pub fn pattern(&self, id: ComponentId) -> Option<&Pattern> {
        self.get(id).and_then(|c| c.kind.as_pattern())
    }

    pub fn constraint(&self, id: ComponentId) -> Option<&Constraint> {
        self.get(id).and_then(|c| c.kind.as_constraint())
    }

    pub fn restriction(&self, id: ComponentId) -> Option<&Restriction> {
        self.get(id).and_then(|c| c.kind.as_restriction())
    }

    pub fn variable(&self, id: ComponentId) -> Option<&Variable> {
        self.get(id).and_then(|c| c.kind.as_variable())
    }

    pub fn class(&self, id: ComponentId) -> Option<&AnalyticsClass> {
        self.get(id).and_then(|c| c.kind.as_class())
    }

    pub fn field(&self, id: ComponentId) -> Option<&Field> {
        self.get(id).and_then(|c| c.kind.as_field())
    }

    pub fn consequence(&self, id: ComponentId) -> Option<&Consequence> {
        self.get(id).and_then(|c| c.kind.as_consequence())
    }

    fn of_kind<'a, T>(
        &'a self,
        project: fn(&'a ComponentKind) -> Option<&'a T>,
    ) -> impl Iterator<Item = (ComponentId, &'a T)> + 'a
    where
        T: 'a,
    {
        self.components
            .iter()
            .filter_map(move |c| project(&c.kind).map(|inner| (c.id, inner)))
    }

    pub fn packages(&self) -> impl Iterator<Item = (ComponentId, &RulePackage)> {
        self.of_kind(ComponentKind::as_package)
    }

    pub fn rules(&self) -> impl Iterator<Item = (ComponentId, &AnalyticsRule)> {
        self.of_kind(ComponentKind::as_rule)
    }

    pub fn patterns(&self) -> impl Iterator<Item = (ComponentId, &Pattern)> {
        self.of_kind(ComponentKind::as_pattern)
    }

    pub fn constraints(&self) -> impl Iterator<Item = (ComponentId, &Constraint)> {
        self.of_kind(ComponentKind::as_constraint)
    }

    pub fn restrictions(&self) -> impl Iterator<Item = (ComponentId, &Restriction)> {
        self.of_kind(ComponentKind::as_restriction)
    }

    pub fn variables(&self) -> impl Iterator<Item = (ComponentId, &Variable)> {
        self.of_kind(ComponentKind::as_variable)
    }

    pub fn classes(&self) -> impl Iterator<Item = (ComponentId, &AnalyticsClass)> {
        self.of_kind(ComponentKind::as_class)
    }

    pub fn fields(&self) -> impl Iterator<Item = (ComponentId, &Field)> {
        self.of_kind(ComponentKind::as_field)
    }

    pub fn patterns_of_rule(&self, rule: ComponentId) -> Vec<ComponentId> {
        self.patterns()
            .filter(|(_, pattern)| pattern.rule == rule)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn pattern_possibilities(&self) -> &[PatternPossibility] {
        &self.pattern_possibilities
    }

    pub fn rule_possibilities(&self) -> &[RulePossibility] {
        &self.rule_possibilities
    }

    pub fn pattern_possibility(&self, id: PossibilityId) -> Option<&PatternPossibility> {
        self.pattern_possibilities
            .iter()
            .find(|possibility| possibility.id == id)
    }

    pub fn pattern_possibilities_of(&self, pattern: ComponentId) -> Vec<&PatternPossibility> {
        self.pattern_possibilities
            .iter()
            .filter(|possibility| possibility.pattern == pattern)
            .collect()
    }

    pub fn rule_possibilities_of(&self, rule: ComponentId) -> Vec<&RulePossibility> {
        self.rule_possibilities
            .iter()
            .filter(|possibility| possibility.rule == rule)
            .collect()
    }

    /// The whole graph and both possibility collections as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
