//! Context rendering for the agent-facing `get_context` tool.

use crate::context::DeviceContext;
use crate::patterns::Patterns;
use serde_json::Value;

/// A selectable section of the context payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Device,
    Activity,
    Patterns,
    Meta,
}

impl Section {
    /// All sections, in render order. The default when no filter is given.
    pub const ALL: [Section; 4] = [Section::Device, Section::Activity, Section::Patterns, Section::Meta];

    pub fn parse(name: &str) -> Option<Section> {
        match name {
            "device" => Some(Section::Device),
            "activity" => Some(Section::Activity),
            "patterns" => Some(Section::Patterns),
            "meta" => Some(Section::Meta),
            _ => None,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Section::Device => "Device",
            Section::Activity => "Activity",
            Section::Patterns => "Patterns",
            Section::Meta => "Meta",
        }
    }
}

/// Render the selected sections as titled pretty-printed JSON blocks.
pub fn render_sections(context: &DeviceContext, patterns: &Patterns, sections: &[Section]) -> String {
    let mut out = String::new();
    for section in sections {
        let value = match section {
            Section::Device => serde_json::to_value(&context.device),
            Section::Activity => serde_json::to_value(&context.activity),
            Section::Patterns => serde_json::to_value(patterns),
            Section::Meta => serde_json::to_value(&context.meta),
        }
        .unwrap_or(Value::Null);
        let body = serde_json::to_string_pretty(&value).unwrap_or_else(|_| "null".into());
        out.push_str("## ");
        out.push_str(section.title());
        out.push('\n');
        out.push_str(&body);
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BatteryState;

    fn context_with_battery() -> DeviceContext {
        let mut ctx = DeviceContext::default();
        ctx.device.battery = Some(BatteryState {
            level: 0.8,
            state: "charging".into(),
            is_low_power_mode: false,
            updated_at: 1_740_000_000.0,
        });
        ctx
    }

    #[test]
    fn renders_all_sections_by_default() {
        let text = render_sections(&context_with_battery(), &Patterns::default(), &Section::ALL);
        assert!(text.contains("## Device"));
        assert!(text.contains("## Activity"));
        assert!(text.contains("## Patterns"));
        assert!(text.contains("## Meta"));
        assert!(text.contains("\"level\": 0.8"));
    }

    #[test]
    fn renders_only_selected_sections() {
        let text = render_sections(
            &context_with_battery(),
            &Patterns::default(),
            &[Section::Meta],
        );
        assert!(text.contains("## Meta"));
        assert!(!text.contains("## Device"));
    }

    #[test]
    fn parses_section_names() {
        assert_eq!(Section::parse("device"), Some(Section::Device));
        assert_eq!(Section::parse("patterns"), Some(Section::Patterns));
        assert_eq!(Section::parse("bogus"), None);
    }
}
