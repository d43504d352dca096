use chrono::SecondsFormat;
use itertools::Itertools;

use crate::document::{Marker, Value};

pub(crate) fn write_document(entries: &[(String, Value)], out: &mut String) {
    out.push('{');
    let body = entries
        .iter()
        .map(|(key, value)| {
            let mut entry = String::new();
            write_string(key, &mut entry);
            entry.push_str(": ");
            value.write_notation(&mut entry);
            entry
        })
        .join(", ");
    out.push_str(&body);
    out.push('}');
}

pub(crate) fn write_list(values: &[Value], out: &mut String) {
    out.push('[');
    let body = values
        .iter()
        .map(|value| {
            let mut item = String::new();
            value.write_notation(&mut item);
            item
        })
        .join(", ");
    out.push_str(&body);
    out.push(']');
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_double(v: f64, out: &mut String) {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        out.push_str(&format!("{:.1}", v));
    } else {
        out.push_str(&v.to_string());
    }
}

impl Value {
    /// Appends the value in the document notation used by `Display`.
    pub(crate) fn write_notation(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
            Value::I32(v) => out.push_str(&v.to_string()),
            Value::I64(v) => out.push_str(&v.to_string()),
            Value::F64(v) => write_double(*v, out),
            Value::String(v) => write_string(v, out),
            Value::Binary(bytes) => {
                let hex = bytes.iter().map(|b| format!("{:02x}", b)).join("");
                out.push_str(&format!("BinData(0, \"{}\")", hex));
            }
            Value::DateTime(v) => {
                out.push_str("ISODate(\"");
                out.push_str(&v.to_rfc3339_opts(SecondsFormat::Millis, true));
                out.push_str("\")");
            }
            Value::Regex(p) => {
                out.push('/');
                out.push_str(p.source());
                out.push('/');
                out.push_str(p.options());
            }
            Value::Uuid(v) => out.push_str(&format!("UUID(\"{}\")", v)),
            Value::Document(d) => d.write_notation(out),
            Value::List(l) => l.write_notation(out),
            Value::Special(Marker::MinKey) => out.push_str("MinKey"),
            Value::Special(Marker::MaxKey) => out.push_str("MaxKey"),
            Value::Special(Marker::Timestamp { time, increment }) => {
                out.push_str(&format!("Timestamp({}, {})", time, increment))
            }
            Value::Special(Marker::Code(code)) => {
                out.push_str("Code(");
                write_string(code, out);
                out.push(')');
            }
        }
    }
}
