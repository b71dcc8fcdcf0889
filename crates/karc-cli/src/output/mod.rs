//! Output formatting for karc.
//!
//! Text (compact `key:value` lines, one record per line) and JSON (pretty,
//! with list envelopes).

use anyhow::Result;
use karc_core::query::{Page, PageWindow};
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text format - concise, one record per line
    #[default]
    Text,
    /// JSON format - machine-readable output
    Json,
}

/// Formatter that can output data in text or JSON format
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Format data according to the configured output format
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
            OutputFormat::Text => {
                let json_value = serde_json::to_value(data)?;
                Ok(render_text(&json_value))
            }
        }
    }

    /// Format and print data to stdout
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print<T: Serialize>(&self, data: &T) -> Result<()> {
        let output = self.format(data)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{output}")?;
        Ok(())
    }

    /// Format and print a list with a custom empty message
    ///
    /// For JSON format, wraps the array in a named object with count and advice fields.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print_list<T: Serialize>(
        &self,
        data: &[T],
        empty_message: &str,
        collection_name: &str,
        advice: &[&str],
    ) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let mut envelope = serde_json::Map::new();
                envelope.insert(collection_name.to_string(), serde_json::to_value(data)?);
                envelope.insert("count".to_string(), serde_json::json!(data.len()));
                envelope.insert("advice".to_string(), serde_json::json!(advice));
                self.print(&serde_json::Value::Object(envelope))
            }
            OutputFormat::Text => {
                if data.is_empty() {
                    let mut stdout = io::stdout().lock();
                    writeln!(stdout, "{empty_message}")?;
                    Ok(())
                } else {
                    self.print(&data)
                }
            }
        }
    }

    /// Print one page of a list plus its "Showing X to Y of Z" window.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print_page<T: Serialize>(
        &self,
        page: &Page<T>,
        banner: Option<&str>,
        empty_message: &str,
        collection_name: &str,
        advice: &[&str],
    ) -> Result<()> {
        let window = page.window();
        match self.format {
            OutputFormat::Json => {
                let mut envelope = serde_json::Map::new();
                envelope.insert(collection_name.to_string(), serde_json::to_value(&page.rows)?);
                envelope.insert("count".to_string(), serde_json::json!(page.rows.len()));
                envelope.insert("page".to_string(), serde_json::to_value(window)?);
                envelope.insert("error".to_string(), serde_json::json!(banner));
                envelope.insert("advice".to_string(), serde_json::json!(advice));
                self.print(&serde_json::Value::Object(envelope))
            }
            OutputFormat::Text => {
                let mut stdout = io::stdout().lock();
                if let Some(banner) = banner {
                    writeln!(stdout, "! {banner}")?;
                }
                if page.rows.is_empty() {
                    writeln!(stdout, "{empty_message}")?;
                } else {
                    writeln!(stdout, "{}", self.format(&page.rows)?)?;
                    writeln!(stdout, "{}", window_footer(&window, page.page_index))?;
                }
                Ok(())
            }
        }
    }

    /// Print a short status line (e.g. the pending-approval notice).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn print_notice(&self, status: &str, message: &str) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.print(&serde_json::json!({
                "status": status,
                "message": message,
            })),
            OutputFormat::Text => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{message}")?;
                Ok(())
            }
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

fn window_footer(window: &PageWindow, page_index: usize) -> String {
    format!(
        "Showing {} to {} of {} (page {}/{})",
        window.showing_from,
        window.showing_to,
        window.total_count,
        page_index + 1,
        window.total_pages.max(1),
    )
}

/// Render a JSON value as concise text
fn render_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            // ID-like fields lead the line
            let mut parts = Vec::new();
            let id_keys = ["id", "user_id", "comment_id"];

            for key in &id_keys {
                if let Some(val) = map.get(*key) {
                    if !val.is_null() {
                        parts.push(render_field_value(val));
                    }
                }
            }

            for (key, val) in map {
                if id_keys.contains(&key.as_str()) {
                    continue;
                }
                match val {
                    serde_json::Value::Array(arr) if arr.is_empty() => {}
                    serde_json::Value::Null => {}
                    _ => parts.push(format!("{key}:{}", render_field_value(val))),
                }
            }
            parts.join("  ")
        }
        serde_json::Value::Array(arr) => arr.iter().map(render_text).collect::<Vec<_>>().join("\n"),
        _ => render_field_value(value),
    }
}

/// Render a single field value as concise text
fn render_field_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => {
            if s.contains(' ') || s.contains('\n') {
                format!("\"{}\"", s.replace('\n', "\\n"))
            } else {
                s.clone()
            }
        }
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(render_field_value).collect();
            format!("[{}]", items.join(","))
        }
        serde_json::Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| format!("{k}:{}", render_field_value(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    struct Row {
        id: String,
        gene: String,
        notes: Option<String>,
        comment_count: u32,
    }

    fn row(id: &str, gene: &str) -> Row {
        Row {
            id: id.to_string(),
            gene: gene.to_string(),
            notes: None,
            comment_count: 0,
        }
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        assert!(!Formatter::default().is_json());
    }

    #[test]
    fn test_text_puts_id_first_and_skips_nulls() {
        let output = Formatter::new(OutputFormat::Text)
            .format(&row("var-1a2b3c4d", "SHANK3"))
            .unwrap();
        assert!(output.starts_with("var-1a2b3c4d"));
        assert!(output.contains("gene:SHANK3"));
        assert!(!output.contains("notes"));
    }

    #[test]
    fn test_text_quotes_spaces() {
        #[derive(Serialize)]
        struct Entry {
            id: i64,
            detail: String,
        }
        let output = Formatter::new(OutputFormat::Text)
            .format(&Entry {
                id: 7,
                detail: "Deleted 3 variants".to_string(),
            })
            .unwrap();
        assert_eq!(output, "7  detail:\"Deleted 3 variants\"");
    }

    #[test]
    fn test_text_array_one_line_per_item() {
        let rows = vec![row("var-1", "A"), row("var-2", "B")];
        let output = Formatter::new(OutputFormat::Text).format(&rows).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("var-2"));
    }

    #[test]
    fn test_json_is_valid() {
        let output = Formatter::new(OutputFormat::Json)
            .format(&row("var-1", "TP53"))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["gene"], "TP53");
        assert!(parsed["notes"].is_null());
    }

    #[test]
    fn test_window_footer() {
        let window = PageWindow::new(1, 20, 45);
        assert_eq!(window_footer(&window, 1), "Showing 21 to 40 of 45 (page 2/3)");
        let empty = PageWindow::new(0, 20, 0);
        assert_eq!(window_footer(&empty, 0), "Showing 0 to 0 of 0 (page 1/1)");
    }
}
