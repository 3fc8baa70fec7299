use serde_json::Value;
use std::sync::Arc;

use crate::flash::{Flash, Level};

// 1. Renderer Contract
/// Renderer
///
/// The Presentation Boundary contract: accepts a view name and a JSON data bag and
/// returns a complete HTML document. Workflows depend only on this trait, so the
/// concrete presentation — the built-in generic renderer, a template engine, or the
/// in-memory mock used by tests — can be swapped without touching any handler.
pub trait Renderer: Send + Sync {
    fn render(&self, view: &str, data: &Value) -> String;
}

/// RendererState
///
/// The concrete type used to share the presentation boundary across the application state.
pub type RendererState = Arc<dyn Renderer>;

// 2. The Built-in Implementation
/// HtmlRenderer
///
/// A deliberately generic HTML producer: it knows nothing about the individual screens
/// and simply lays out whatever the data bag contains (arrays of records become
/// tables, single records become definition lists). All values pass through HTML
/// escaping on the way out.
#[derive(Clone, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }
}

/// escape_html
///
/// Escapes the five HTML-significant characters. Every user-supplied value is routed
/// through here before being embedded in a page.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders a scalar JSON value as display text. Null renders empty, which is how
/// unassigned references (e.g. a case without an assignee) appear in tables.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => escape_html(s),
        other => escape_html(&other.to_string()),
    }
}

/// Renders an array of objects as a table, taking the column set from the first row.
fn render_table(rows: &[Value]) -> String {
    let Some(Value::Object(first)) = rows.first() else {
        // Not a record list; fall back to a plain list.
        let items: String = rows
            .iter()
            .map(|v| format!("<li>{}</li>", scalar_text(v)))
            .collect();
        return format!("<ul>{items}</ul>");
    };

    let columns: Vec<&String> = first.keys().collect();
    let header: String = columns
        .iter()
        .map(|c| format!("<th>{}</th>", escape_html(c)))
        .collect();

    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = columns
                .iter()
                .map(|c| {
                    let cell = row.get(c.as_str()).unwrap_or(&Value::Null);
                    format!("<td>{}</td>", scalar_text(cell))
                })
                .collect();
            format!("<tr>{cells}</tr>")
        })
        .collect();

    format!("<table><thead><tr>{header}</tr></thead><tbody>{body}</tbody></table>")
}

/// Renders a single object as a definition list.
fn render_record(object: &serde_json::Map<String, Value>) -> String {
    let items: String = object
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::Array(rows) => render_table(rows),
                Value::Object(inner) => render_record(inner),
                scalar => scalar_text(scalar),
            };
            format!("<dt>{}</dt><dd>{}</dd>", escape_html(key), rendered)
        })
        .collect();
    format!("<dl>{items}</dl>")
}

fn render_flash(flash: &Flash) -> String {
    let class = match flash.level {
        Level::Success => "flash-success",
        Level::Error => "flash-error",
        Level::Info => "flash-info",
    };
    format!(
        "<div class=\"{class}\">{}</div>",
        escape_html(&flash.message)
    )
}

impl Renderer for HtmlRenderer {
    fn render(&self, view: &str, data: &Value) -> String {
        let mut sections = String::new();

        // The "flash" key is presentation chrome, not page data.
        if let Some(flash) = data
            .get("flash")
            .and_then(|v| serde_json::from_value::<Flash>(v.clone()).ok())
        {
            sections.push_str(&render_flash(&flash));
        }

        if let Value::Object(bag) = data {
            for (key, value) in bag {
                if key == "flash" {
                    continue;
                }
                let rendered = match value {
                    Value::Array(rows) => render_table(rows),
                    Value::Object(inner) => render_record(inner),
                    scalar => format!("<p>{}</p>", scalar_text(scalar)),
                };
                sections.push_str(&format!(
                    "<section><h2>{}</h2>{rendered}</section>",
                    escape_html(key)
                ));
            }
        }

        let title = escape_html(view);
        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
             <body><main data-view=\"{title}\">{sections}</main></body></html>"
        )
    }
}

// 3. The Mock Implementation (For Tests)
/// MockRenderer
///
/// Renders a minimal, easily assertable marker instead of a full page, isolating
/// handler tests from presentation details.
#[derive(Clone, Default)]
pub struct MockRenderer;

impl MockRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for MockRenderer {
    fn render(&self, view: &str, data: &Value) -> String {
        let keys = match data {
            Value::Object(bag) => bag.keys().cloned().collect::<Vec<_>>().join(","),
            _ => String::new(),
        };
        format!("view={view};keys={keys}")
    }
}
