//! Alert output for the command line

use clap::ValueEnum;
use smokealert_core::sink::{ConsoleSink, LogSink};
use smokealert_core::{AlertEvent, AlertSink};
use tracing::warn;

/// How alerts are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One human-readable line per alert
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Through the logger at warn level, on stderr with the other logs
    Log,
}

/// Writes alerts to stdout in the chosen format
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertPrinter {
    format: OutputFormat,
}

impl AlertPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render one alert as it will be printed
    pub fn render(&self, alert: &AlertEvent) -> Option<String> {
        match self.format {
            OutputFormat::Text | OutputFormat::Log => None,
            OutputFormat::Json => match serde_json::to_string(alert) {
                Ok(line) => Some(line),
                Err(e) => {
                    warn!("Failed to encode alert as JSON: {}", e);
                    None
                }
            },
        }
    }
}

impl AlertSink for AlertPrinter {
    fn emit(&mut self, alert: &AlertEvent) {
        match self.format {
            OutputFormat::Text => ConsoleSink.emit(alert),
            OutputFormat::Log => LogSink.emit(alert),
            OutputFormat::Json => {
                if let Some(line) = self.render(alert) {
                    println!("{}", line);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_line_has_all_fields() {
        let alert = AlertEvent {
            detector_label: "Smoker".into(),
            timestamp: "12:02:00".into(),
            message: "Smoker alert! Temperature dropped 20.0 degrees over 5 readings".into(),
        };

        let line = AlertPrinter::new(OutputFormat::Json).render(&alert).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["detector_label"], "Smoker");
        assert_eq!(value["timestamp"], "12:02:00");
        assert!(value["message"].as_str().unwrap().starts_with("Smoker alert!"));
    }

    #[test]
    fn text_format_renders_nothing_extra() {
        let alert = AlertEvent {
            detector_label: "Food A".into(),
            timestamp: "t".into(),
            message: "m".into(),
        };
        assert!(AlertPrinter::new(OutputFormat::Text).render(&alert).is_none());
    }
}
