//! `betterclaw context` — Print the agent-facing context payload.

use betterclaw_config::AppConfig;
use betterclaw_core::view::{render_sections, Section};
use betterclaw_store::ContextStore;

pub async fn run(include: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let sections = if include.is_empty() {
        Section::ALL.to_vec()
    } else {
        let mut sections = Vec::with_capacity(include.len());
        for name in &include {
            match Section::parse(name) {
                Some(section) => sections.push(section),
                None => {
                    return Err(format!(
                        "unknown section '{name}' (expected device, activity, patterns or meta)"
                    )
                    .into())
                }
            }
        }
        sections
    };

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = ContextStore::load(&config.state_dir());
    let context = store.snapshot().await;
    let patterns = store.read_patterns().await;

    println!("{}", render_sections(&context, &patterns, &sections));
    Ok(())
}
