//! Printers: coloured labels, Markdown tables (termimad) and raw JSON.

use owo_colors::OwoColorize;
use serde_json::Value;
use termimad::MadSkin;

use crate::{
    fallback::{FallbackResult, OriginSource},
    sandbox::ExecutionResult,
};

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}

pub fn print_resolution(title: &str, result: &FallbackResult, markdown: bool) {
    if !markdown {
        println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
        return;
    }

    let label = result.origin().label();
    let origin = match result.origin() {
        OriginSource::Primary => format!("{}", label.magenta()),
        OriginSource::Store => format!("{}", label.green()),
        OriginSource::ExternalApi => format!("{}", label.cyan()),
        OriginSource::None => format!("{}", label.yellow()),
    };
    println!("{} (source: {})", title.bold(), origin);

    match result.payload() {
        Some(payload) => MarkdownPrinter::default().print(&to_markdown(payload)),
        None => println!("{}", "No data available right now. Please try again later.".yellow()),
    }
}

pub fn print_execution(result: &ExecutionResult) {
    if result.truncated_or_failed() {
        eprintln!("{}", result.output.red());
    } else {
        println!("{}", result.output);
    }
}

/// Arrays of objects become a table; anything else a fenced JSON block.
pub fn to_markdown(payload: &Value) -> String {
    let rows = match payload {
        Value::Array(rows) if !rows.is_empty() && rows.iter().all(Value::is_object) => rows,
        Value::Object(map) => {
            let mut md = String::from("|field|value|\n|-|-|\n");
            for (k, v) in map {
                md.push_str(&format!("|{}|{}|\n", escape(k), escape(&cell(v))));
            }
            return md;
        }
        other => {
            return format!("```\n{}\n```", serde_json::to_string_pretty(other).unwrap_or_default());
        }
    };

    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        if let Some(obj) = row.as_object() {
            for key in obj.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key.as_str());
                }
            }
        }
    }

    let mut md = String::new();
    md.push('|');
    for c in &columns {
        md.push_str(&escape(c));
        md.push('|');
    }
    md.push_str("\n|");
    md.push_str(&"-|".repeat(columns.len()));
    md.push('\n');
    for row in rows {
        md.push('|');
        for c in &columns {
            md.push_str(&escape(&row.get(*c).map(cell).unwrap_or_default()));
            md.push('|');
        }
        md.push('\n');
    }
    md
}

fn cell(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn escape(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_render_as_table() {
        let md = to_markdown(&json!([
            {"market": "Kolar", "modal_price": 1800},
            {"market": "Hoskote|East", "arrival": "12 t"}
        ]));
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "|market|modal_price|arrival|");
        assert_eq!(lines[1], "|-|-|-|");
        assert_eq!(lines[2], "|Kolar|1800||");
        assert_eq!(lines[3], "|Hoskote\\|East||12 t|");
    }

    #[test]
    fn mapping_renders_as_field_table() {
        let md = to_markdown(&json!({"scheme": "PM-KISAN"}));
        assert!(md.contains("|scheme|PM-KISAN|"));
    }

    #[test]
    fn scalars_fall_back_to_json_block() {
        assert!(to_markdown(&json!([1, 2])).starts_with("```"));
    }
}
