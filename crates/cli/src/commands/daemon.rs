//! `betterclaw daemon` — the full triage runtime.
//!
//! Wires the stores, rules, judgment, pipeline, schedulers and gateway.
//! Startup init (context load + cooldown restore) completes before the
//! gateway starts accepting intake.

use betterclaw_config::AppConfig;
use betterclaw_gateway::GatewayState;
use betterclaw_judgment::LlmJudge;
use betterclaw_patterns::PatternEngine;
use betterclaw_pipeline::{AgentCliDelivery, EventPipeline};
use betterclaw_proactive::ProactiveEngine;
use betterclaw_rules::RulesEngine;
use betterclaw_store::{ContextStore, EventLog};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Intake queue depth; a full queue answers NOT_AVAILABLE.
const INTAKE_QUEUE_DEPTH: usize = 256;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let state_dir = config.state_dir();

    println!("📡 BetterClaw Daemon — starting");
    println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   State dir: {}", state_dir.display());
    println!("   Model:     {}", config.llm_model);
    println!(
        "   Proactive: {}",
        if config.proactive_enabled { "enabled" } else { "disabled" }
    );

    // --- Shared subsystems ---
    let store = Arc::new(ContextStore::load(&state_dir));
    let log = Arc::new(EventLog::new(state_dir.join("events.jsonl")));
    let rules = Arc::new(RulesEngine::new(config.push_budget_per_day));
    let judge = Arc::new(LlmJudge::new(
        config.llm_model.clone(),
        config.api_key.clone(),
        config.push_budget_per_day,
    ));
    let delivery = Arc::new(AgentCliDelivery::new(
        config.agent.command.clone(),
        config.agent.session_id.clone(),
        config.agent.channel.clone(),
    ));

    let pipeline = Arc::new(EventPipeline::new(
        store.clone(),
        log.clone(),
        rules,
        judge,
        delivery.clone(),
    ));

    // Init must finish before the first event is processed.
    pipeline.restore_cooldowns().await;
    let (intake, _lane) = pipeline.spawn(INTAKE_QUEUE_DEPTH);
    info!("Pipeline lane started");

    // --- Schedulers ---
    let mut background = Vec::new();

    let pattern_engine = Arc::new(PatternEngine::new(
        store.clone(),
        log.clone(),
        config.pattern_window_days,
    ));
    background.push(pattern_engine.spawn());
    info!("Pattern engine scheduled");

    if config.proactive_enabled {
        let proactive = Arc::new(ProactiveEngine::new(store.clone(), delivery));
        background.extend(proactive.spawn());
        info!("Proactive engine scheduled");
    }

    // --- Gateway ---
    let state = Arc::new(GatewayState {
        intake,
        store,
        initialized: AtomicBool::new(true),
    });

    let serve = betterclaw_gateway::serve(state, &config.gateway.host, config.gateway.port);
    tokio::select! {
        result = serve => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    // Schedulers must not outlive the daemon.
    for task in background {
        task.abort();
    }

    Ok(())
}
