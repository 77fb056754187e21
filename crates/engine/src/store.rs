use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use common::{ConditionRecord, ConditionSource, Error, Result};
use conditions::{Condition, ConditionFile};

/// In-memory condition list edited by the operator and read by the engine
/// at the start of every cycle. Cloning shares the same list.
#[derive(Debug, Clone, Default)]
pub struct ConditionStore {
    records: Arc<RwLock<Vec<ConditionRecord>>>,
}

impl ConditionStore {
    pub fn new(records: Vec<ConditionRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Read a condition file. Records that do not parse are still kept so the
    /// operator can see and remove them; the engine skips them each cycle.
    pub fn from_file(path: &str) -> Result<Self> {
        let records = ConditionFile::load(path)?.into_records();
        info!(path, count = records.len(), "Loaded conditions");
        Ok(Self::new(records))
    }

    pub async fn list(&self) -> Vec<ConditionRecord> {
        self.records.read().await.clone()
    }

    /// Validate and append. Returns the new record's 1-based position.
    pub async fn add(&self, record: ConditionRecord) -> Result<usize> {
        Condition::parse(&record).map_err(|e| Error::InvalidCondition(e.to_string()))?;
        let mut records = self.records.write().await;
        records.push(record);
        Ok(records.len())
    }

    /// Remove the record at 1-based `position`.
    pub async fn remove(&self, position: usize) -> Result<ConditionRecord> {
        let mut records = self.records.write().await;
        if position == 0 || position > records.len() {
            return Err(Error::InvalidCondition(format!(
                "no condition #{position} (have {})",
                records.len()
            )));
        }
        Ok(records.remove(position - 1))
    }

    pub async fn replace(&self, records: Vec<ConditionRecord>) {
        *self.records.write().await = records;
    }

    /// Replace the list with the contents of `path`. Returns the new count.
    pub async fn reload(&self, path: &str) -> Result<usize> {
        let records = ConditionFile::load(path)?.into_records();
        let count = records.len();
        self.replace(records).await;
        Ok(count)
    }
}

#[async_trait]
impl ConditionSource for ConditionStore {
    async fn conditions(&self) -> Result<Vec<ConditionRecord>> {
        Ok(self.list().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsi() -> ConditionRecord {
        ";0;5m;BTCUSDT;RSI;length=14;RSI Value;<;30".parse().unwrap()
    }

    #[tokio::test]
    async fn add_validates_and_remove_is_one_based() {
        let store = ConditionStore::default();
        assert_eq!(store.add(rsi()).await.unwrap(), 1);

        let mut bad = rsi();
        bad.operator = "=>".into();
        assert!(matches!(store.add(bad).await, Err(Error::InvalidCondition(_))));

        assert!(store.remove(0).await.is_err());
        assert!(store.remove(2).await.is_err());
        assert_eq!(store.remove(1).await.unwrap(), rsi());
        assert!(store.conditions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_the_list() {
        let store = ConditionStore::default();
        let view = store.clone();
        store.replace(vec![rsi(), rsi()]).await;
        assert_eq!(view.list().await.len(), 2);
    }

    #[tokio::test]
    async fn reload_reads_the_file() {
        let path = std::env::temp_dir().join(format!("alertbot-store-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"conditions = [["", 0, "5m", "BTCUSDT", "RSI", "length=14", "RSI Value", "<", "30"]]"#,
        )
        .unwrap();

        let store = ConditionStore::default();
        assert_eq!(store.reload(path.to_str().unwrap()).await.unwrap(), 1);
        assert_eq!(store.list().await[0], rsi());

        assert!(store.reload("/nonexistent/conditions.toml").await.is_err());
        assert_eq!(store.list().await.len(), 1);
        let _ = std::fs::remove_file(path);
    }
}
