pub mod batcher;
pub mod binance;
pub mod cycle;
pub mod lifecycle;
pub mod settings;
pub mod status;
pub mod store;
pub mod throttle;
pub mod universe;

pub use batcher::{AlertBook, NotificationBatcher};
pub use binance::BinanceFuturesClient;
pub use cycle::{CycleReport, MonitorDeps};
pub use lifecycle::{Engine, EngineHandle};
pub use settings::MonitorSettings;
pub use status::StatusBoard;
pub use store::ConditionStore;
pub use throttle::{AlertKey, AlertThrottle};
pub use universe::SymbolCache;
