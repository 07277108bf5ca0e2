//! ICS text generation.
//!
//! Components are written by hand rather than through `icalendar::Calendar`
//! because merged output has to carry arbitrary stored components (per-user
//! alarms, X- properties, VTIMEZONE rules) through unchanged.

use icalendar::ValueType;

use crate::ics::component::{IcsComponent, IcsProperty};

/// Maximum content line length in octets before folding (RFC 5545 §3.1).
const FOLD_LIMIT: usize = 75;

pub const PRODID: &str = "-//CALEXPORT//NONSGML Export//EN";

/// Append a whole component block, children included.
pub fn write_component(out: &mut String, component: &IcsComponent) {
    write_line(out, &format!("BEGIN:{}", component.name));
    for prop in &component.properties {
        write_property(out, prop);
    }
    for child in &component.components {
        write_component(out, child);
    }
    write_line(out, &format!("END:{}", component.name));
}

pub fn write_property(out: &mut String, prop: &IcsProperty) {
    let mut line = prop.name.clone();
    for param in &prop.params {
        line.push(';');
        line.push_str(&param.name);
        if let Some(ref value) = param.value {
            line.push('=');
            line.push_str(&quote_param(value));
        }
    }
    line.push(':');
    if is_text(prop) {
        line.push_str(&escape_specials(&prop.value, text_specials(&prop.name)));
    } else {
        line.push_str(&prop.value);
    }
    write_line(out, &line);
}

/// Escape a TEXT value for a content line: backslash, comma, semicolon and newline.
pub fn escape_text(value: &str) -> String {
    escape_specials(value, &['\\', ',', ';', '\n'])
}

/// Whether the parser decoded this property's value as TEXT.
///
/// Uses the same rule as `icalendar::parser`: an explicit `VALUE` parameter,
/// otherwise the property name.
fn is_text(prop: &IcsProperty) -> bool {
    let mut typed = icalendar::Property::new(prop.name.as_str(), "");
    if let Some(value_type) = prop
        .params
        .iter()
        .find(|p| p.name == "VALUE")
        .and_then(|p| p.value.as_deref())
    {
        typed.add_parameter("VALUE", value_type);
    }
    matches!(typed.value_type(), Some(ValueType::Text))
}

/// List-valued TEXT keeps its comma separators; REQUEST-STATUS keeps its
/// semicolon-separated fields.
fn text_specials(name: &str) -> &'static [char] {
    match name.to_ascii_uppercase().as_str() {
        "CATEGORIES" | "RESOURCES" => &['\\', ';', '\n'],
        "REQUEST-STATUS" => &['\\', ',', '\n'],
        _ => &['\\', ',', ';', '\n'],
    }
}

fn escape_specials(value: &str, specials: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if specials.contains(&ch) {
            escaped.push('\\');
            escaped.push(if ch == '\n' { 'n' } else { ch });
        } else {
            escaped.push(ch);
        }
    }
    escaped
}

/// Write a content line, folding it at 75 octets without splitting UTF-8 sequences.
pub fn write_line(out: &mut String, line: &str) {
    let mut used = 0;
    for ch in line.chars() {
        let len = ch.len_utf8();
        if used + len > FOLD_LIMIT {
            out.push_str("\r\n ");
            // the leading space counts towards the continuation line
            used = 1;
        }
        out.push(ch);
        used += len;
    }
    out.push_str("\r\n");
}

fn quote_param(value: &str) -> String {
    let already_quoted = value.len() >= 2 && value.starts_with('"') && value.ends_with('"');
    if !already_quoted && value.contains(&[':', ';', ','][..]) {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}
