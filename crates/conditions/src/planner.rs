use std::collections::BTreeMap;

use crate::condition::{Condition, SymbolSelector};

/// Extra bars requested on top of what any condition strictly needs.
pub const SAFETY_MARGIN: usize = 5;
/// Wilder-smoothed series need warm-up history beyond their window.
pub const MIN_FETCH_LIMIT: usize = 100;
/// Largest page the klines endpoint serves.
pub const MAX_FETCH_LIMIT: usize = 1500;

/// The unit of data fetching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub symbol: String,
    pub timeframe: String,
}

/// One candle fetch shared by every condition that maps to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    pub key: TaskKey,
    /// Candles to request.
    pub limit: usize,
    /// Indexes into the planned condition slice, in condition order.
    pub conditions: Vec<usize>,
}

/// Collapse `conditions` into the minimal set of `(symbol, timeframe)` fetches,
/// ordered by symbol then timeframe. Wildcard conditions expand to every
/// symbol in `universe`.
pub fn plan(conditions: &[Condition], universe: &[String]) -> Vec<FetchTask> {
    let mut tasks: BTreeMap<TaskKey, (usize, Vec<usize>)> = BTreeMap::new();

    for (idx, condition) in conditions.iter().enumerate() {
        let symbols: Vec<&str> = match &condition.symbol {
            SymbolSelector::All => universe.iter().map(String::as_str).collect(),
            SymbolSelector::One(symbol) => vec![symbol.as_str()],
        };

        for symbol in symbols {
            let key = TaskKey {
                symbol: symbol.to_string(),
                timeframe: condition.timeframe.clone(),
            };
            let (history, members) = tasks.entry(key).or_default();
            *history = (*history).max(condition.history_len());
            if members.last() != Some(&idx) {
                members.push(idx);
            }
        }
    }

    tasks
        .into_iter()
        .map(|(key, (history, conditions))| FetchTask {
            key,
            limit: history.saturating_add(SAFETY_MARGIN).clamp(MIN_FETCH_LIMIT, MAX_FETCH_LIMIT),
            conditions,
        })
        .collect()
}
