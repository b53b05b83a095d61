//! Output Rendering
//!
//! Reports are rendered to strings so the binary decides where they go
//! (stdout) and tests can snapshot them.

use serde::Serialize;

use crate::application::{DeployReport, SetupReport, StabilityReport, TeardownReport};
use crate::error::SpinxError;

/// Output format for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Icons for output rendering
struct Icons {
    check: &'static str,
    cross: &'static str,
    create: &'static str,
    exists: &'static str,
    remove: &'static str,
    warn: &'static str,
}

impl Icons {
    fn unicode() -> Self {
        Self {
            check: "✓",
            cross: "✗",
            create: "+",
            exists: "○",
            remove: "−",
            warn: "⚠",
        }
    }

    fn ascii() -> Self {
        Self {
            check: "[OK]",
            cross: "[FAIL]",
            create: "+",
            exists: "=",
            remove: "-",
            warn: "[!]",
        }
    }
}

/// Renders operation reports
pub trait ReportRenderer {
    fn setup(&self, report: &SetupReport) -> String;
    fn deploy(&self, report: &DeployReport) -> String;
    fn teardown(&self, report: &TeardownReport) -> String;
}

/// Text renderer for reports
pub struct TextRenderer {
    /// Whether to use unicode
    pub unicode: bool,
    /// Verbosity level; above zero shows backend identifiers
    pub verbose: u8,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            unicode: true,
            verbose: 0,
        }
    }
}

impl TextRenderer {
    fn icons(&self) -> Icons {
        if self.unicode {
            Icons::unicode()
        } else {
            Icons::ascii()
        }
    }

    fn resource_line(&self, icon: &str, kind: &str, name: &str, id: &str) -> String {
        if self.verbose > 0 && id != name {
            format!("    {} {:<16} {} ({})", icon, kind, name, id)
        } else {
            format!("    {} {:<16} {}", icon, kind, name)
        }
    }
}

impl ReportRenderer for TextRenderer {
    fn setup(&self, report: &SetupReport) -> String {
        let icons = self.icons();
        let mut lines = vec![
            format!(
                "{} Setup Complete: {} on {} ({})",
                icons.check,
                report.service_name,
                report.backend.display_name(),
                report.region
            ),
            String::new(),
        ];

        for step in &report.steps {
            let icon = if step.created {
                icons.create
            } else {
                icons.exists
            };
            lines.push(self.resource_line(icon, step.kind.display_name(), &step.name, &step.id));
        }

        lines.push(String::new());
        lines.push(format!(
            "  {} created, {} already present",
            report.created_count(),
            report.existing_count()
        ));
        lines.join("\n")
    }

    fn deploy(&self, report: &DeployReport) -> String {
        let icons = self.icons();
        let mut lines = vec![
            format!(
                "{} Deploy Complete: {} on {}",
                icons.check,
                report.service_name,
                report.backend.display_name()
            ),
            String::new(),
            format!("  Image:    {}", report.image),
            format!("  Revision: {}", report.revision),
            format!("  Service:  {}", report.service),
            format!(
                "  URL:      {}",
                report.url.as_deref().unwrap_or("(not available yet)")
            ),
        ];

        if report.attempts.len() > 1 {
            lines.push(format!("  Attempts: {}", report.attempts.len()));
        }

        match report.stability {
            StabilityReport::Stable { .. } => {}
            StabilityReport::TimedOut { .. } => lines.push(format!(
                "  {} Service did not report stable within the wait window; check the console",
                icons.warn
            )),
        }
        if !report.image_confirmed {
            lines.push(format!(
                "  {} Image was not confirmed in the registry before rollout",
                icons.warn
            ));
        }

        if let Some(mcp) = &report.mcp_client {
            lines.push(String::new());
            lines.push("  Add to your MCP client config:".to_string());
            lines.extend(mcp.snippet().lines().map(|line| format!("    {line}")));
        }

        if self.verbose > 0 {
            let states: Vec<_> = report.states.iter().map(|s| s.to_string()).collect();
            lines.push(format!("  States:   {}", states.join(" -> ")));
        }
        lines.join("\n")
    }

    fn teardown(&self, report: &TeardownReport) -> String {
        let icons = self.icons();
        let header = if report.interrupted {
            format!("{} Destroy Interrupted", icons.cross)
        } else if report.failures.is_empty() {
            format!("{} Destroy Complete", icons.check)
        } else {
            format!(
                "{} Destroy Finished With {} Failure(s)",
                icons.cross,
                report.failures.len()
            )
        };
        let mut lines = vec![
            header,
            String::new(),
            format!(
                "  {} on {} ({})",
                report.service_name,
                report.backend.display_name(),
                report.region
            ),
        ];

        if !report.removed.is_empty() {
            lines.push(String::new());
            lines.push(format!("  Removed ({}):", report.removed.len()));
            for descriptor in &report.removed {
                lines.push(self.resource_line(
                    icons.remove,
                    descriptor.kind.display_name(),
                    &descriptor.name,
                    &descriptor.id,
                ));
            }
        }

        if !report.absent.is_empty() {
            lines.push(String::new());
            lines.push(format!("  Already absent ({}):", report.absent.len()));
            if self.verbose > 0 {
                for absent in &report.absent {
                    lines.push(self.resource_line(
                        icons.exists,
                        absent.kind.display_name(),
                        &absent.name,
                        &absent.name,
                    ));
                }
            }
        }

        if !report.failures.is_empty() {
            lines.push(String::new());
            lines.push(format!("  Failed ({}):", report.failures.len()));
            for failure in &report.failures {
                lines.push(format!(
                    "    {} {:<16} {}: {}",
                    icons.cross,
                    failure.kind.display_name(),
                    failure.name,
                    failure.message
                ));
            }
        }

        for kind in &report.drain_timeouts {
            lines.push(format!(
                "  {} {} still had running tasks when the drain window ended",
                icons.warn, kind
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "  Check these names in region {} to confirm nothing is left:",
            report.region
        ));
        for name in &report.manual_check {
            lines.push(format!("    {}", name));
        }
        lines.join("\n")
    }
}

/// JSON renderer for reports
pub struct JsonRenderer;

impl JsonRenderer {
    fn render<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_default()
    }
}

impl ReportRenderer for JsonRenderer {
    fn setup(&self, report: &SetupReport) -> String {
        Self::render(report)
    }

    fn deploy(&self, report: &DeployReport) -> String {
        Self::render(report)
    }

    fn teardown(&self, report: &TeardownReport) -> String {
        Self::render(report)
    }
}

/// Create a renderer based on format
pub fn create_renderer(format: OutputFormat, unicode: bool, verbose: u8) -> Box<dyn ReportRenderer> {
    match format {
        OutputFormat::Text => Box::new(TextRenderer { unicode, verbose }),
        OutputFormat::Json => Box::new(JsonRenderer),
    }
}

/// Error text for stderr, or a JSON error event for `--json`
pub fn format_error(err: &SpinxError, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let mut event = serde_json::json!({
                "event": "error",
                "class": err.class().label(),
                "message": err.to_string(),
            });
            if let Some(state) = err.rollout_state() {
                event["state"] = serde_json::json!(state.to_string());
            }
            event.to_string()
        }
        OutputFormat::Text => format!("[ERROR] {}", err),
    }
}
