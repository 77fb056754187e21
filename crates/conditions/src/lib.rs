//! Alert conditions: parsing, indicator math, evaluation and cycle planning.
//!
//! Everything here is pure; fetching candles and sending alerts happens in
//! `crates/engine`.

pub mod condition;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod group;
pub mod indicators;
pub mod operator;
pub mod params;
pub mod planner;

pub use condition::{Condition, Detail, Indicator, SymbolSelector, Target, TIMEFRAMES, WILDCARD};
pub use config::ConditionFile;
pub use error::{ConditionError, EvalError};
pub use evaluator::{evaluate, Evaluation};
pub use group::{GroupAggregator, GroupAlert};
pub use operator::Operator;
pub use params::{ParamValue, Params};
pub use planner::{plan, FetchTask, TaskKey};
