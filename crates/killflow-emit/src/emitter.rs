use crate::config::EmitterConfig;
use anyhow::Result;
use colored::Colorize;
use std::io::Write;

pub type EmitResult = Result<()>;

#[derive(Debug, Clone)]
pub struct EmitContext {
    pub indent_level: usize,
    pub indent_chars: String,
    pub use_colors: bool,
}

impl EmitContext {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_chars: "  ".to_string(),
            use_colors: false,
        }
    }

    pub fn from_config(config: &EmitterConfig) -> Self {
        Self {
            indent_level: 0,
            indent_chars: config.indent_style.unit(),
            use_colors: config.use_colors,
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    pub fn get_indent(&self) -> String {
        self.indent_chars.repeat(self.indent_level)
    }

    /// Paints `text` when colors are on.
    pub fn paint(&self, text: &str, color: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "magenta" => text.magenta().to_string(),
            "cyan" => text.cyan().to_string(),
            "dimmed" => text.dimmed().to_string(),
            "bold" => text.bold().to_string(),
            _ => text.to_string(),
        }
    }
}

impl Default for EmitContext {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Emitter {
    type Item: ?Sized;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult;

    fn emit_to_string(&self, item: &Self::Item) -> Result<String> {
        let mut buffer = Vec::new();
        let mut context = EmitContext::new();
        self.emit(item, &mut buffer, &mut context)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct EmitHelper;

impl EmitHelper {
    pub fn write_line<W: Write>(writer: &mut W, context: &EmitContext, text: &str) -> EmitResult {
        writeln!(writer, "{}{}", context.get_indent(), text)?;
        Ok(())
    }

    pub fn write_colored_line<W: Write>(
        writer: &mut W,
        context: &EmitContext,
        text: &str,
        color: &str,
    ) -> EmitResult {
        Self::write_line(writer, context, &context.paint(text, color))
    }

    /// Comments use the IR's `;` syntax so dumps stay parseable.
    pub fn write_comment<W: Write>(
        writer: &mut W,
        context: &EmitContext,
        comment: &str,
    ) -> EmitResult {
        Self::write_colored_line(writer, context, &format!("; {}", comment), "dimmed")
    }

    pub fn write_section<W: Write>(
        writer: &mut W,
        context: &EmitContext,
        title: &str,
    ) -> EmitResult {
        writeln!(writer)?;
        Self::write_colored_line(writer, context, &format!("=== {} ===", title), "cyan")
    }

    pub fn write_block<W: Write, F>(
        writer: &mut W,
        context: &mut EmitContext,
        header: &str,
        body: F,
    ) -> EmitResult
    where
        F: FnOnce(&mut W, &mut EmitContext) -> EmitResult,
    {
        Self::write_line(writer, context, &format!("{} {{", header))?;
        context.indent();
        body(writer, context)?;
        context.dedent();
        Self::write_line(writer, context, "}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndentStyle;

    #[test]
    fn test_indentation_follows_config() {
        let config = EmitterConfig {
            indent_style: IndentStyle::Tabs,
            ..EmitterConfig::default()
        };
        let mut ctx = EmitContext::from_config(&config);
        assert_eq!(ctx.get_indent(), "");
        ctx.indent();
        ctx.indent();
        assert_eq!(ctx.get_indent(), "\t\t");
        ctx.dedent();
        ctx.dedent();
        ctx.dedent();
        assert_eq!(ctx.indent_level, 0);
    }

    #[test]
    fn test_write_block_and_comment() {
        let mut buffer = Vec::new();
        let mut ctx = EmitContext::new();

        EmitHelper::write_block(&mut buffer, &mut ctx, "define @f()", |w, c| {
            EmitHelper::write_comment(w, c, "empty")
        })
        .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, "define @f() {\n  ; empty\n}\n");
    }

    #[test]
    fn test_paint_is_identity_without_colors() {
        let ctx = EmitContext::new();
        assert_eq!(ctx.paint("ModRef", "red"), "ModRef");
    }
}
