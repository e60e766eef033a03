//! Display formatting for settings records.

use serde_json::{Map, Value};

use super::record::{Field, SettingsRecord};
use super::source::SourceMap;

/// Shown in place of a sensitive value, whatever its length.
pub const MASK: &str = "**********";

fn display_value(record: &SettingsRecord, field: Field, unmask: bool) -> String {
    if field.is_sensitive() && !unmask {
        MASK.to_string()
    } else {
        record.value_of(field)
    }
}

/// One `field: value` line per field, in declaration order.
pub fn render(record: &SettingsRecord, unmask: bool) -> String {
    let mut out = String::new();
    for field in Field::ALL {
        out.push_str(field.name());
        out.push_str(": ");
        out.push_str(&display_value(record, field, unmask));
        out.push('\n');
    }
    out
}

/// [`render`] preceded by a titled header and an underline.
pub fn render_block(title: &str, record: &SettingsRecord, unmask: bool) -> String {
    let header = if unmask {
        format!("Settings for {} (secrets exposed):", title)
    } else {
        format!("Settings for {} (secrets masked):", title)
    };
    let underline = "-".repeat(header.len());
    format!("{}\n{}\n{}", header, underline, render(record, unmask))
}

/// The record as a JSON object, masked like [`render`].
///
/// `debug_mode` and `port` keep their JSON types.
pub fn render_json(record: &SettingsRecord, unmask: bool) -> Value {
    let mut map = Map::new();
    for field in Field::ALL {
        let value = match field {
            Field::DebugMode => Value::Bool(record.debug_mode()),
            Field::Port => Value::from(record.port()),
            _ => Value::String(display_value(record, field, unmask)),
        };
        map.insert(field.name().to_string(), value);
    }
    Value::Object(map)
}

/// Reads `field: value` lines produced by [`render`] back into a mapping.
///
/// Lines that do not name a known field (headers, underlines, blanks) are
/// skipped.
pub fn parse_rendered(text: &str) -> SourceMap {
    text.lines()
        .filter_map(|line| line.split_once(": "))
        .filter(|(key, _)| Field::from_name(key.trim()).is_some())
        .map(|(key, value)| (key.trim(), value))
        .collect()
}
