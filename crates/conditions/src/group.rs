use std::collections::HashMap;

use crate::condition::Condition;
use crate::planner::FetchTask;

/// A group whose every member fired for one symbol this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAlert {
    pub group: String,
    pub symbol: String,
    /// Member explanations in evaluation order.
    pub details: Vec<String>,
}

#[derive(Debug)]
struct GroupState {
    group: String,
    symbol: String,
    expected: usize,
    passed: Vec<String>,
    failed: bool,
}

/// AND-combines grouped conditions per symbol within one cycle.
///
/// Built from the cycle's plan so it knows how many members each
/// `(group, symbol)` pair has. A member that does not fire (or never gets
/// evaluated) suppresses the pair.
#[derive(Debug, Default)]
pub struct GroupAggregator {
    states: Vec<GroupState>,
    index: HashMap<(String, String), usize>,
}

impl GroupAggregator {
    pub fn new(conditions: &[Condition], tasks: &[FetchTask]) -> Self {
        let mut aggregator = Self::default();
        for task in tasks {
            for &idx in &task.conditions {
                let Some(group) = conditions[idx].group.as_deref() else { continue };
                let slot = aggregator.slot(group, &task.key.symbol);
                aggregator.states[slot].expected += 1;
            }
        }
        aggregator
    }

    fn slot(&mut self, group: &str, symbol: &str) -> usize {
        let key = (group.to_string(), symbol.to_string());
        if let Some(&slot) = self.index.get(&key) {
            return slot;
        }
        self.states.push(GroupState {
            group: group.to_string(),
            symbol: symbol.to_string(),
            expected: 0,
            passed: Vec::new(),
            failed: false,
        });
        self.index.insert(key, self.states.len() - 1);
        self.states.len() - 1
    }

    /// True once a member has failed; remaining members can be skipped.
    pub fn is_short_circuited(&self, group: &str, symbol: &str) -> bool {
        self.index
            .get(&(group.to_string(), symbol.to_string()))
            .is_some_and(|&slot| self.states[slot].failed)
    }

    /// Record one member's result: `Some(explanation)` if it fired.
    pub fn record(&mut self, group: &str, symbol: &str, fired: Option<String>) {
        let slot = self.slot(group, symbol);
        let state = &mut self.states[slot];
        match fired {
            Some(detail) if !state.failed => state.passed.push(detail),
            Some(_) => {}
            None => {
                state.failed = true;
                state.passed.clear();
            }
        }
    }

    /// Groups complete for a symbol, in first-planned order.
    pub fn finish(self) -> Vec<GroupAlert> {
        self.states
            .into_iter()
            .filter(|s| !s.failed && s.expected > 0 && s.passed.len() == s.expected)
            .map(|s| GroupAlert {
                group: s.group,
                symbol: s.symbol,
                details: s.passed,
            })
            .collect()
    }
}
