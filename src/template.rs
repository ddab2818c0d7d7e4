//! Payload template rendering.
//!
//! Templates substitute `{{.Field}}` tokens with dotted access into
//! [`TemplateData`], the variable set exposed to notification payloads.
//! Existing configs use this syntax already, so the renderer accepts
//! exactly those field paths and reports anything else as an error
//! instead of passing it through silently.

use chrono::{Local, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

use crate::error::WatchError;
use crate::netlist::ListInfo;

/// Variables available to `payload_template` and `payload_title`.
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    pub ip: String,
    pub count: u32,
    pub source_list: ListInfo,
    pub source_log: ListInfo,
    pub timestamp: i64,
    pub time: String,
}

impl TemplateData {
    pub fn new(
        ip: String,
        count: u32,
        source_list: ListInfo,
        source_log: ListInfo,
        timestamp: i64,
    ) -> Self {
        Self {
            ip,
            count,
            source_list,
            source_log,
            timestamp,
            time: format_timestamp(timestamp),
        }
    }
}

/// Format a unix timestamp as local `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(timestamp: i64) -> String {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*\.([A-Za-z]+(?:\.[A-Za-z]+)?)\s*\}\}").expect("template token pattern")
    })
}

fn lookup(field: &str, data: &TemplateData) -> Result<String, WatchError> {
    let value = match field {
        "IP" => data.ip.clone(),
        "Count" => data.count.to_string(),
        "SourceListInfo.Name" => data.source_list.name.clone(),
        "SourceListInfo.Level" => data.source_list.level.to_string(),
        "SourceLogInfo.Name" => data.source_log.name.clone(),
        "SourceLogInfo.Level" => data.source_log.level.to_string(),
        "Timestamp" => data.timestamp.to_string(),
        "Time" => data.time.clone(),
        other => {
            return Err(WatchError::Template(format!("unknown field: {}", other)));
        }
    };
    Ok(value)
}

/// Render a template against the given data.
///
/// Unknown fields fail the whole render; the caller skips the affected
/// policy and keeps going.
pub fn render(template: &str, data: &TemplateData) -> Result<String, WatchError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in token_regex().captures_iter(template) {
        let (Some(whole), Some(field)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        out.push_str(&lookup(field.as_str(), data)?);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}
