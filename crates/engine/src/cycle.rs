use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use common::{
    CandleTable, ConditionRecord, ConditionSource, MarketData, MonitorSink, Notifier, Result,
};
use conditions::{evaluate, plan, Condition, EvalError, FetchTask, GroupAggregator, SymbolSelector};

use crate::batcher::{AlertBook, NotificationBatcher};
use crate::settings::MonitorSettings;
use crate::throttle::{AlertKey, AlertThrottle};
use crate::universe::SymbolCache;

/// The collaborators a monitoring run talks to.
#[derive(Clone)]
pub struct MonitorDeps {
    pub market: Arc<dyn MarketData>,
    pub notifier: Arc<dyn Notifier>,
    pub conditions: Arc<dyn ConditionSource>,
    pub sink: Arc<dyn MonitorSink>,
}

/// Counters for one completed cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub tasks: usize,
    /// Tasks whose candles could not be fetched.
    pub skipped: usize,
    /// Alert lines queued for sending.
    pub alerts: usize,
    /// Fired alerts held back by the cooldown.
    pub throttled: usize,
    pub messages_sent: usize,
}

enum CycleOutcome {
    Idle,
    Completed(CycleReport),
    Cancelled,
}

enum Fetched {
    Candles(CandleTable),
    Skipped,
    Cancelled,
}

/// One monitoring run: cycles until `cancel` fires.
///
/// Owns the alert throttle and symbol cache, so both start empty on every
/// run.
pub(crate) struct CycleWorker {
    deps: MonitorDeps,
    settings: MonitorSettings,
    batcher: NotificationBatcher,
    throttle: AlertThrottle,
    symbols: SymbolCache,
    cancel: CancellationToken,
}

impl CycleWorker {
    pub(crate) fn new(deps: MonitorDeps, settings: MonitorSettings, cancel: CancellationToken) -> Self {
        Self {
            batcher: NotificationBatcher::new(settings.max_message_chars),
            throttle: AlertThrottle::new(settings.cooldown),
            symbols: SymbolCache::default(),
            deps,
            settings,
            cancel,
        }
    }

    /// Call from `tokio::spawn`. Returns once `cancel` has been observed.
    pub(crate) async fn run(mut self) {
        info!("Cycle worker running");

        while !self.cancel.is_cancelled() {
            let wait = match self.run_cycle().await {
                Ok(CycleOutcome::Cancelled) => break,
                Ok(CycleOutcome::Idle) => {
                    let wait = self.settings.idle_wait;
                    self.log(&format!("No conditions to monitor. Checking again in {}s.", wait.as_secs()));
                    wait
                }
                Ok(CycleOutcome::Completed(report)) => {
                    self.summarize(&report);
                    self.settings.cycle_interval
                }
                Err(e) => {
                    error!(error = %e, "Monitoring cycle failed");
                    self.log(&format!("Monitoring loop error: {e}"));
                    self.settings.error_backoff
                }
            };

            self.deps.sink.reset_progress();
            if !self.pause(wait).await {
                break;
            }
        }

        self.deps.sink.reset_progress();
        info!("Cycle worker exited");
    }

    async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let records = self.deps.conditions.conditions().await?;
        let conditions = self.parse_all(&records);
        if conditions.is_empty() {
            return Ok(CycleOutcome::Idle);
        }

        let universe = if conditions.iter().any(|c| c.symbol == SymbolSelector::All) {
            self.symbols.get(self.deps.market.as_ref()).await?
        } else {
            Vec::new()
        };

        let tasks = plan(&conditions, &universe);
        let total = tasks.len();
        debug!(conditions = conditions.len(), tasks = total, "Planned cycle");
        self.deps.sink.progress(0, total);

        let mut report = CycleReport {
            tasks: total,
            ..CycleReport::default()
        };
        let mut groups = GroupAggregator::new(&conditions, &tasks);
        let mut book = AlertBook::default();

        for (i, task) in tasks.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Ok(CycleOutcome::Cancelled);
            }

            match self.fetch(task).await {
                Fetched::Candles(candles) => {
                    self.evaluate_task(task, &candles, &conditions, &mut groups, &mut book, &mut report);
                }
                Fetched::Skipped => report.skipped += 1,
                Fetched::Cancelled => return Ok(CycleOutcome::Cancelled),
            }

            let done = i + 1;
            self.deps.sink.progress(done, total);
            let pace_due = done % self.settings.pace_every.max(1) == 0 && done < total;
            if pace_due && !self.pause(self.settings.pace_pause).await {
                return Ok(CycleOutcome::Cancelled);
            }
        }

        // Skipped symbols may be delisted
        if report.skipped > 0 && !universe.is_empty() {
            self.symbols.invalidate();
        }

        let now = Instant::now();
        for alert in groups.finish() {
            let key = AlertKey::Group {
                symbol: alert.symbol.clone(),
                group: alert.group.clone(),
            };
            if self.throttle.try_fire(key, now) {
                let members: Vec<String> = alert.details.iter().map(|d| format!("  {d}")).collect();
                self.log(&format!("[Group met] {} - {}", alert.symbol, alert.group));
                book.push(&alert.group, format!("- {}\n{}", alert.symbol, members.join("\n")));
                report.alerts += 1;
            } else {
                debug!(symbol = %alert.symbol, group = %alert.group, "Group alert in cooldown");
                report.throttled += 1;
            }
        }

        report.messages_sent = self.send(&book).await;
        Ok(CycleOutcome::Completed(report))
    }

    /// Parse every record, logging and dropping the ones that do not parse.
    fn parse_all(&self, records: &[ConditionRecord]) -> Vec<Condition> {
        records
            .iter()
            .enumerate()
            .filter_map(|(i, record)| match Condition::parse(record) {
                Ok(condition) => Some(condition),
                Err(e) => {
                    warn!(index = i + 1, error = %e, "Skipping invalid condition");
                    self.log(&format!("Skipping condition #{}: {e}", i + 1));
                    None
                }
            })
            .collect()
    }

    /// Fetch one task's candles, retrying once after a rate-limit backoff.
    async fn fetch(&self, task: &FetchTask) -> Fetched {
        let (symbol, timeframe) = (&task.key.symbol, &task.key.timeframe);
        let mut retried = false;

        loop {
            match self.deps.market.candles(symbol, timeframe, task.limit).await {
                Ok(candles) => return Fetched::Candles(candles),
                Err(e) if e.is_rate_limited() && !retried => {
                    let backoff = self.settings.rate_limit_backoff;
                    warn!(symbol = %symbol, timeframe = %timeframe, error = %e, "Rate limited, backing off");
                    self.log(&format!("[WARN] Rate limited. Waiting {}s: {e}", backoff.as_secs()));
                    if !self.pause(backoff).await {
                        return Fetched::Cancelled;
                    }
                    retried = true;
                }
                Err(e) => {
                    warn!(symbol = %symbol, timeframe = %timeframe, error = %e, "Candle fetch failed");
                    self.log(&format!("[{symbol}] Skipping {timeframe} this cycle: {e}"));
                    return Fetched::Skipped;
                }
            }
        }
    }

    fn evaluate_task(
        &mut self,
        task: &FetchTask,
        candles: &[common::Candle],
        conditions: &[Condition],
        groups: &mut GroupAggregator,
        book: &mut AlertBook,
        report: &mut CycleReport,
    ) {
        let (symbol, timeframe) = (task.key.symbol.as_str(), task.key.timeframe.as_str());

        for &idx in &task.conditions {
            let condition = &conditions[idx];
            if let Some(group) = condition.group.as_deref() {
                if groups.is_short_circuited(group, symbol) {
                    continue;
                }
            }

            let fired = match evaluate(candles, condition) {
                Ok(evaluation) if evaluation.fired => Some(evaluation.explanation),
                Ok(_) => None,
                Err(EvalError::InsufficientData { need, have }) => {
                    debug!(symbol, timeframe, need, have, "Not enough candles");
                    None
                }
                Err(e) => {
                    warn!(symbol, timeframe, indicator = %condition.indicator, error = %e, "Indicator error");
                    self.log(&format!("[{symbol}] Indicator error: {e}"));
                    None
                }
            };

            match (condition.group.as_deref(), fired) {
                (Some(group), fired) => {
                    let detail = fired.map(|explanation| format!("({timeframe}) {explanation}"));
                    groups.record(group, symbol, detail);
                }
                (None, Some(explanation)) => {
                    self.log(&format!("[Condition met] {symbol} ({timeframe}) - {explanation}"));
                    let key = AlertKey::Condition {
                        symbol: symbol.to_string(),
                        identity: condition.identity(),
                    };
                    if self.throttle.try_fire(key, Instant::now()) {
                        book.push(&condition.summary(), format!("- {symbol} ({timeframe}): {explanation}"));
                        report.alerts += 1;
                    } else {
                        debug!(symbol, timeframe, "Alert in cooldown");
                        report.throttled += 1;
                    }
                }
                (None, None) => {}
            }
        }
    }

    /// Send every message of `book`. Returns how many were delivered.
    async fn send(&self, book: &AlertBook) -> usize {
        let mut sent = 0;
        for message in book.messages(&self.batcher) {
            match self.deps.notifier.send(&message).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    error!(error = %e, "Failed to send alert notification");
                    self.log(&format!("Notification failed: {e}"));
                }
            }
        }
        sent
    }

    fn summarize(&self, report: &CycleReport) {
        info!(
            tasks = report.tasks,
            skipped = report.skipped,
            alerts = report.alerts,
            throttled = report.throttled,
            sent = report.messages_sent,
            "Cycle complete"
        );
        if report.alerts > 0 {
            self.log(&format!(
                "{} alert(s) this cycle. Sent {} notification(s).",
                report.alerts, report.messages_sent
            ));
        } else {
            self.log("No new alerts this cycle.");
        }
        self.log(&format!(
            "All conditions checked. Next check in {}s.",
            self.settings.cycle_interval.as_secs()
        ));
    }

    fn log(&self, message: &str) {
        self.deps.sink.log(message);
    }

    /// Sleep for `duration` unless cancelled first. Returns false if cancelled.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
