//! Console rendering of serializable views: pretty JSON or an indented
//! structural dump, optionally colored.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

const INDENT: &str = "  ";

pub fn render<T: Serialize>(value: &T, json: bool, color: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(dump(&serde_json::to_value(value)?, color))
    }
}

pub fn dump(value: &Value, color: bool) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0, color);
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize, color: bool) {
    match value {
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Object(map) => {
            out.push_str("{\n");
            for (i, (key, v)) in map.iter().enumerate() {
                push_indent(out, depth + 1);
                out.push_str(key);
                out.push_str(": ");
                write_value(out, v, depth + 1, color);
                out.push_str(if i + 1 < map.len() { ",\n" } else { "\n" });
            }
            push_indent(out, depth);
            out.push('}');
        }
        Value::Array(items) => {
            out.push_str("[\n");
            for (i, v) in items.iter().enumerate() {
                push_indent(out, depth + 1);
                write_value(out, v, depth + 1, color);
                out.push_str(if i + 1 < items.len() { ",\n" } else { "\n" });
            }
            push_indent(out, depth);
            out.push(']');
        }
        scalar => out.push_str(&scalar_text(scalar, color)),
    }
}

fn scalar_text(value: &Value, color: bool) -> String {
    let text = match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    };
    if !color {
        return text;
    }
    match value {
        Value::String(_) => text.green().to_string(),
        Value::Number(_) | Value::Bool(_) => text.yellow().to_string(),
        _ => text.bold().to_string(),
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
