//! `betterclaw onboard` — First-time setup.

use betterclaw_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let state_dir = AppConfig::default().state_dir();

    println!("📡 BetterClaw — First-Time Setup");
    println!("================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !state_dir.exists() {
        std::fs::create_dir_all(&state_dir)?;
        println!("✅ Created state directory: {}", state_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        let default_toml = AppConfig::default_toml();
        std::fs::write(&config_path, &default_toml)?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Edit {} and set your API key", config_path.display());
        println!("   2. Run: betterclaw daemon");
        println!("   3. Point the companion app at the gateway\n");
    }

    Ok(())
}
