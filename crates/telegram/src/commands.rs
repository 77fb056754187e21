use std::sync::Arc;

use teloxide::{dispatching::UpdateHandler, prelude::*, utils::command::BotCommands};
use tracing::{info, warn};

use common::{ConditionRecord, EngineState, Progress};
use engine::{ConditionStore, EngineHandle, NotificationBatcher, StatusBoard};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Telegram's hard limit is 4096; leave room for formatting.
const REPLY_BUDGET: usize = 4000;
const LOG_LINES: usize = 20;

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub engine: EngineHandle,
    pub store: ConditionStore,
    pub board: Arc<StatusBoard>,
    pub conditions_path: String,
    pub allowed_user_ids: Arc<Vec<i64>>,
}

/// Telegram bot commands exposed to the operator.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "AlertBot commands:")]
pub enum Command {
    #[command(description = "Show this help")]
    Help,
    #[command(description = "Start monitoring")]
    Start,
    #[command(description = "Stop monitoring")]
    Stop,
    #[command(description = "Show engine state and cycle progress")]
    Status,
    #[command(description = "List conditions")]
    Conditions,
    #[command(description = "Add a condition: group;shift;timeframe;symbol;indicator;params;detail;operator;value")]
    Add(String),
    #[command(description = "Remove a condition by its number")]
    Remove(String),
    #[command(description = "Reload conditions from the condition file")]
    Reload,
    #[command(description = "Show recent log lines")]
    Logs,
}

/// Run the bot in long-polling mode until Ctrl-C.
pub async fn run_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(handle_help))
        .branch(case![Command::Start].endpoint(handle_start))
        .branch(case![Command::Stop].endpoint(handle_stop))
        .branch(case![Command::Status].endpoint(handle_status))
        .branch(case![Command::Conditions].endpoint(handle_conditions))
        .branch(case![Command::Add(line)].endpoint(handle_add))
        .branch(case![Command::Remove(position)].endpoint(handle_remove))
        .branch(case![Command::Reload].endpoint(handle_reload))
        .branch(case![Command::Logs].endpoint(handle_logs));

    Update::filter_message()
        .filter_map(|msg: Message| msg.from().map(|u| u.id))
        .filter_async(auth_filter)
        .branch(command_handler)
}

/// Silently drop messages from users not in the allowed list.
async fn auth_filter(user_id: UserId, deps: Arc<BotDeps>) -> bool {
    let uid = user_id.0 as i64;
    let allowed = deps.allowed_user_ids.contains(&uid);
    if !allowed {
        warn!(user_id = uid, "Unauthorized Telegram access attempt");
    }
    allowed
}

async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
    Ok(())
}

async fn handle_start(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let reply = if deps.engine.start().await {
        "Monitoring started."
    } else {
        "Monitoring is already running."
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_stop(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    if deps.engine.state().await == EngineState::Stopped {
        bot.send_message(msg.chat.id, "Monitoring is already stopped.").await?;
        return Ok(());
    }
    bot.send_message(msg.chat.id, "Stopping\u{2026}").await?;
    deps.engine.stop().await;
    bot.send_message(msg.chat.id, "Monitoring stopped.").await?;
    Ok(())
}

async fn handle_status(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let state = deps.engine.state().await;
    let progress = deps.board.progress_snapshot();
    let count = deps.store.list().await.len();
    bot.send_message(msg.chat.id, status_text(state, progress, count)).await?;
    Ok(())
}

async fn handle_conditions(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let records = deps.store.list().await;
    if records.is_empty() {
        bot.send_message(msg.chat.id, "No conditions configured.").await?;
        return Ok(());
    }
    for part in NotificationBatcher::new(REPLY_BUDGET).pack("Conditions:\n", &condition_lines(&records)) {
        bot.send_message(msg.chat.id, part).await?;
    }
    Ok(())
}

async fn handle_add(bot: Bot, msg: Message, deps: Arc<BotDeps>, line: String) -> HandlerResult {
    let added = match line.parse::<ConditionRecord>() {
        Ok(record) => deps.store.add(record).await,
        Err(e) => Err(e),
    };
    let reply = match added {
        Ok(position) => format!("Added condition #{position}."),
        Err(e) => format!("Not added: {e}"),
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_remove(bot: Bot, msg: Message, deps: Arc<BotDeps>, position: String) -> HandlerResult {
    let reply = match position.trim().parse::<usize>() {
        Ok(position) => match deps.store.remove(position).await {
            Ok(record) => format!("Removed #{position}: {record}"),
            Err(e) => format!("Not removed: {e}"),
        },
        Err(_) => format!("Usage: /remove <number>, got '{}'", position.trim()),
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_reload(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let reply = match deps.store.reload(&deps.conditions_path).await {
        Ok(count) => format!("Loaded {count} condition(s) from {}.", deps.conditions_path),
        Err(e) => format!("Reload failed: {e}"),
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_logs(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let lines = deps.board.recent(LOG_LINES);
    if lines.is_empty() {
        bot.send_message(msg.chat.id, "No log lines yet.").await?;
        return Ok(());
    }
    for part in NotificationBatcher::new(REPLY_BUDGET).pack("", &lines) {
        bot.send_message(msg.chat.id, part).await?;
    }
    Ok(())
}

fn status_text(state: EngineState, progress: Progress, conditions: usize) -> String {
    let cycle = if progress.total == 0 {
        "idle".to_string()
    } else {
        format!("{}/{} tasks checked", progress.done, progress.total)
    };
    format!(
        "AlertBot Status\n\
         Engine: {state}\n\
         Conditions: {conditions}\n\
         Cycle: {cycle}"
    )
}

fn condition_lines(records: &[ConditionRecord]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| format!("{}. {record}", i + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_takes_the_whole_wire_line() {
        let cmd = Command::parse("/add ;0;5m;BTCUSDT;RSI;length=14;RSI Value;<;30", "alertbot").unwrap();
        assert_eq!(cmd, Command::Add(";0;5m;BTCUSDT;RSI;length=14;RSI Value;<;30".to_string()));
    }

    #[test]
    fn plain_commands_parse() {
        assert_eq!(Command::parse("/status", "alertbot").unwrap(), Command::Status);
        assert_eq!(Command::parse("/remove 3", "alertbot").unwrap(), Command::Remove("3".to_string()));
        assert!(Command::parse("/trade", "alertbot").is_err());
    }

    #[test]
    fn status_shows_progress_or_idle() {
        let text = status_text(EngineState::Running, Progress { done: 4, total: 9 }, 2);
        assert!(text.contains("Engine: running"));
        assert!(text.contains("Conditions: 2"));
        assert!(text.contains("4/9 tasks checked"));

        let idle = status_text(EngineState::Stopped, Progress::default(), 0);
        assert!(idle.contains("Cycle: idle"));
    }

    #[test]
    fn conditions_are_numbered_from_one() {
        let records: Vec<ConditionRecord> = vec![
            ";0;5m;BTCUSDT;RSI;length=14;RSI Value;<;30".parse().unwrap(),
            "dip;1;1h;All;SMA;length=20;Price;>;100".parse().unwrap(),
        ];
        let lines = condition_lines(&records);
        assert_eq!(lines[0], "1. ;0;5m;BTCUSDT;RSI;length=14;RSI Value;<;30");
        assert!(lines[1].starts_with("2. dip;1;1h;All;"));
    }
}
