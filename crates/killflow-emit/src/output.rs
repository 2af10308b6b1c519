use crate::config::EmitterConfig;
use crate::emitter::EmitContext;
use crate::report::Report;
use anyhow::Result;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => anyhow::bail!("unknown output format '{}'", other),
        }
    }
}

/// Renders a report in the requested format. JSON is pretty-printed and never colored.
pub fn render<R: Report>(report: &R, format: OutputFormat, config: &EmitterConfig) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut text = serde_json::to_string_pretty(report)?;
            text.push('\n');
            Ok(text)
        }
        OutputFormat::Text => {
            let mut buffer = Vec::new();
            let mut context = EmitContext::from_config(config);
            report.emit_text(&mut buffer, &mut context, config.verbosity)?;
            Ok(String::from_utf8(buffer)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("html".parse::<OutputFormat>().is_err());
    }
}
