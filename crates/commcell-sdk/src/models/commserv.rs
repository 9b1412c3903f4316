//! CommServ details.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};

/// Details of the CommServ a session is connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommServInfo {
    /// CommServ (commcell) name.
    pub name: String,
    /// CommServ GUID.
    pub guid: String,
    /// Commcell id.
    pub id: u64,
    /// CommServ host name.
    pub hostname: String,
    /// Release name, e.g. `11.0.0`.
    pub release_name: String,
    /// Time zone name with the offset prefix removed.
    pub timezone: String,
    /// Normalized version, always three dot separated parts.
    pub version: String,
}

impl CommServInfo {
    /// Parses the body of a `GET CommServ` response.
    ///
    /// `commcell.commCellName` is required; other keys default to empty values.
    pub fn from_json(value: &Value) -> Result<Self> {
        let commcell = value.get("commcell").ok_or_else(|| Error::CommServDetails {
            message: "missing key 'commcell'".into(),
        })?;

        let name = commcell
            .get("commCellName")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::CommServDetails {
                message: "missing key 'commCellName'".into(),
            })?
            .to_string();

        let str_field = |key: &str| -> String {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let raw_timezone = value
            .pointer("/csTimeZone/TimeZoneName")
            .and_then(Value::as_str)
            .or_else(|| value.get("timeZone").and_then(Value::as_str))
            .unwrap_or_default();

        let raw_version = match value.get("csVersionInfo").and_then(Value::as_str) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => value
                .get("currentSPVersion")
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => format!("11.{n}"),
                    _ => String::new(),
                })
                .unwrap_or_default(),
        };

        Ok(Self {
            name,
            guid: commcell
                .get("csGUID")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            id: commcell
                .get("commCellId")
                .and_then(Value::as_u64)
                .unwrap_or_default(),
            hostname: str_field("hostName"),
            release_name: str_field("releaseName"),
            timezone: parse_timezone(raw_timezone),
            version: normalize_version(&raw_version),
        })
    }
}

/// Extracts the display part of a CommServ time zone string.
///
/// `"(UTC-05:00) Eastern Time"` keeps everything from the parenthesis;
/// `"-300:Eastern Standard Time"` drops the offset prefix.
///
/// # Panics
///
/// Only if the built-in patterns fail to compile.
#[must_use]
pub fn parse_timezone(raw: &str) -> String {
    static DISPLAY: OnceLock<Regex> = OnceLock::new();
    static OFFSET: OnceLock<Regex> = OnceLock::new();

    let display = DISPLAY.get_or_init(|| Regex::new(r"\(.*").expect("valid time zone pattern"));
    if let Some(m) = display.find(raw) {
        return m.as_str().to_string();
    }
    let offset =
        OFFSET.get_or_init(|| Regex::new(r"^([+|-]*\d*:)*").expect("valid offset pattern"));
    offset.replace(raw, "").trim().to_string()
}

/// Normalizes a CommServ version string such as `"11 SP20"` to `"11.20.0"`.
#[must_use]
pub fn normalize_version(raw: &str) -> String {
    const REPLACEMENTS: [(&str, &str); 7] = [
        (".0 SP", "."),
        (" SP", "."),
        (" HPK", "."),
        ("+", ""),
        ("-", ""),
        ("a", ".1"),
        ("b", ".2"),
    ];

    let mut version = raw.trim().to_string();
    if version.is_empty() {
        return version;
    }
    for (from, to) in REPLACEMENTS {
        version = version.replace(from, to);
    }

    let parts = version.split('.').filter(|p| !p.is_empty()).count();
    for _ in parts..3 {
        version.push_str(".0");
    }
    version
}
