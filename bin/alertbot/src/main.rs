use std::sync::Arc;

use anyhow::Context;
use teloxide::Bot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::Config;
use engine::{BinanceFuturesClient, ConditionStore, Engine, MonitorDeps, MonitorSettings, StatusBoard};
use telegram_ctrl::{run_bot, BotDeps, TelegramNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("loading configuration")?;
    info!(
        chats = cfg.telegram_chat_ids.len(),
        conditions = %cfg.conditions_path,
        "AlertBot starting"
    );

    // ── Conditions ────────────────────────────────────────────────────────────
    let store = match ConditionStore::from_file(&cfg.conditions_path) {
        Ok(store) => store,
        Err(e) => {
            warn!(path = %cfg.conditions_path, error = %e, "No condition file loaded, starting empty");
            ConditionStore::default()
        }
    };

    // ── Collaborators ─────────────────────────────────────────────────────────
    let bot = Bot::new(cfg.telegram_token.clone());
    let market = BinanceFuturesClient::new(&cfg.binance_futures_url).context("building Binance client")?;
    let board = Arc::new(StatusBoard::default());

    let deps = MonitorDeps {
        market: Arc::new(market),
        notifier: Arc::new(TelegramNotifier::new(bot.clone(), &cfg.telegram_chat_ids)),
        conditions: Arc::new(store.clone()),
        sink: board.clone(),
    };

    // ── Engine ────────────────────────────────────────────────────────────────
    let (engine, engine_handle) = Engine::new(deps, MonitorSettings::from_config(&cfg));
    let engine_task = tokio::spawn(engine.run());

    if cfg.auto_start {
        engine_handle.start().await;
    } else {
        info!("AUTO_START disabled; send /start to begin monitoring");
    }

    // ── Telegram C2 (returns on Ctrl-C) ───────────────────────────────────────
    let bot_deps = BotDeps {
        engine: engine_handle.clone(),
        store,
        board,
        conditions_path: cfg.conditions_path.clone(),
        allowed_user_ids: Arc::new(cfg.telegram_allowed_user_ids.clone()),
    };
    run_bot(bot, bot_deps).await;

    // ── Shutdown ──────────────────────────────────────────────────────────────
    info!("Shutdown requested, stopping engine");
    engine_handle.stop().await;
    drop(engine_handle);
    engine_task.await.context("engine task")?;
    info!("AlertBot stopped");
    Ok(())
}
