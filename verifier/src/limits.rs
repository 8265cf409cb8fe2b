/// Analysis limits that keep possibility generation and recursion bounded
///
/// Possibility counts grow multiplicatively with the number of OR branches and
/// patterns in a rule, so both levels are capped. The counts are checked before any
/// possibility is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisLimits {
    /// Maximum number of possibilities a single pattern may produce
    /// Real usage: ~1-4, Limit: 1024
    pub max_pattern_possibilities: usize,

    /// Maximum number of possibilities a single rule may produce
    /// Real usage: ~1-16, Limit: 65536
    pub max_rule_possibilities: usize,

    /// Maximum nesting depth of conditional elements and pattern sources
    /// Real usage: ~3 levels, Limit: 100
    pub max_nesting_depth: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            max_pattern_possibilities: 1024,
            max_rule_possibilities: 65_536,
            max_nesting_depth: 100,
        }
    }
}

impl AnalysisLimits {
    /// Create a new AnalysisLimits with default values
    pub fn new() -> Self {
        Self::default()
    }
}
