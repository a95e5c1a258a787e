//! `betterclaw status` — Human-readable device summary.

use betterclaw_config::AppConfig;
use betterclaw_core::time::epoch_now;
use betterclaw_store::ContextStore;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = ContextStore::load(&config.state_dir());
    let context = store.snapshot().await;

    println!("📡 BetterClaw Status");
    println!("====================");

    match &context.device.battery {
        Some(battery) => {
            let mut line = format!("  Battery:   {:.0}%", battery.level * 100.0);
            if !battery.state.is_empty() {
                line.push_str(&format!(" ({})", battery.state));
            }
            if battery.is_low_power_mode {
                line.push_str(" [low power]");
            }
            println!("{line}");
        }
        None => println!("  Battery:   unknown"),
    }

    match &context.device.location {
        Some(location) => match &location.label {
            Some(label) => println!("  Location:  {label}"),
            None => println!("  Location:  {:.4}, {:.4}", location.latitude, location.longitude),
        },
        None => println!("  Location:  unknown"),
    }

    match &context.activity.current_zone {
        Some(zone) => {
            let since = context.activity.zone_entered_at.unwrap_or(0.0);
            let duration = format_duration(epoch_now() - since);
            println!("  Zone:      {zone} (for {duration})");
        }
        None => println!("  Zone:      none"),
    }

    match context.device.health.steps_today {
        Some(steps) => println!("  Steps:     {steps:.0} today"),
        None => println!("  Steps:     unknown"),
    }

    println!("  Events:    {} today", context.meta.events_today);
    println!("  Pushes:    {} today", context.meta.pushes_today);

    Ok(())
}

fn format_duration(seconds: f64) -> String {
    let total_minutes = (seconds.max(0.0) / 60.0) as u64;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_humanize() {
        assert_eq!(format_duration(90.0), "1m");
        assert_eq!(format_duration(8_100.0), "2h 15m");
        assert_eq!(format_duration(-5.0), "0m");
    }
}
