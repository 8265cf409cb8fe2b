//! Possibility sets and the AND/OR combination that produces them

use crate::components::ComponentId;
use crate::descr::Connective;
use serde::Serialize;
use std::fmt;

/// Store-assigned identity of a pattern or rule possibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PossibilityId(u64);

impl PossibilityId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PossibilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// One conjunction of restrictions that can hold together within a pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternPossibility {
    pub id: PossibilityId,
    pub rule: ComponentId,
    pub pattern: ComponentId,
    /// Restriction ids in traversal order
    pub restrictions: Vec<ComponentId>,
}

/// One pattern possibility per pattern of a rule, chosen so the rule's condition holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RulePossibility {
    pub id: PossibilityId,
    pub rule: ComponentId,
    /// Pattern possibility ids in traversal order
    pub patterns: Vec<PossibilityId>,
}

/// Children collected under one connective, each child already reduced to its own
/// list of alternative conjunctions
#[derive(Debug, Clone)]
pub(crate) struct Group<T> {
    connective: Connective,
    children: Vec<Vec<Vec<T>>>,
}

impl<T: Clone> Group<T> {
    pub(crate) fn new(connective: Connective) -> Self {
        Self {
            connective,
            children: Vec::new(),
        }
    }

    /// A leaf contributes a single one-item conjunction
    pub(crate) fn push_item(&mut self, item: T) {
        self.children.push(vec![vec![item]]);
    }

    pub(crate) fn push_alternatives(&mut self, alternatives: Vec<Vec<T>>) {
        self.children.push(alternatives);
    }

    /// Number of conjunctions [`Group::resolve`] would produce
    pub(crate) fn count(&self) -> usize {
        if self.children.is_empty() {
            return 1;
        }
        match self.connective {
            Connective::And => self
                .children
                .iter()
                .fold(1usize, |acc, child| acc.saturating_mul(child.len())),
            Connective::Or => self
                .children
                .iter()
                .fold(0usize, |acc, child| acc.saturating_add(child.len())),
        }
    }

    /// AND distributes over the cross product of its children in order; OR keeps every
    /// child alternative. A group without children is the single empty conjunction.
    pub(crate) fn resolve(self) -> Vec<Vec<T>> {
        if self.children.is_empty() {
            return vec![Vec::new()];
        }
        match self.connective {
            Connective::And => {
                self.children
                    .into_iter()
                    .fold(vec![Vec::new()], |acc, child| {
                        let mut combined = Vec::with_capacity(acc.len() * child.len());
                        for left in &acc {
                            for right in &child {
                                let mut conjunction = left.clone();
                                conjunction.extend(right.iter().cloned());
                                combined.push(conjunction);
                            }
                        }
                        combined
                    })
            }
            Connective::Or => self.children.into_iter().flatten().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_over_or_distributes() {
        let mut or = Group::new(Connective::Or);
        or.push_item('B');
        or.push_item('C');

        let mut and = Group::new(Connective::And);
        and.push_item('A');
        and.push_alternatives(or.resolve());

        assert_eq!(and.count(), 2);
        assert_eq!(and.resolve(), vec![vec!['A', 'B'], vec!['A', 'C']]);
    }

    #[test]
    fn empty_group_is_one_empty_conjunction() {
        let group: Group<u8> = Group::new(Connective::Or);
        assert_eq!(group.count(), 1);
        assert_eq!(group.resolve(), vec![Vec::<u8>::new()]);
    }
}
