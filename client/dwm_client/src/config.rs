//! Typed INI-style configuration files.
//!
//! Lookups always fail safely: a file that does not open, a missing section
//! or key, or an unparsable value all yield the caller's fallback.

use std::collections::HashMap;
use std::path::PathBuf;

/// Root directory holding config trees (`<root>/<prefix>/<name>.ini`).
pub fn config_dir() -> PathBuf {
    std::env::var_os("DWM_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/etc/dwm"))
}

#[derive(Debug, Default)]
pub struct Config {
    sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// Opens `<config dir>/<prefix>/<name>.ini`. A missing or unreadable
    /// file yields an empty config, so every lookup falls back.
    pub fn open(prefix: &str, name: &str) -> Self {
        let path = config_dir().join(prefix).join(format!("{name}.ini"));
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current = String::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current = name.trim().to_string();
                sections.entry(current.clone()).or_default();
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                sections
                    .entry(current.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self { sections }
    }

    fn raw(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    pub fn string(&self, section: &str, key: &str, fallback: &str) -> String {
        self.raw(section, key).unwrap_or(fallback).to_string()
    }

    /// Parses decimal or `0x`-prefixed hex.
    pub fn int(&self, section: &str, key: &str, fallback: i64) -> i64 {
        let Some(raw) = self.raw(section, key) else {
            return fallback;
        };
        let parsed = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16)
        } else {
            raw.parse()
        };
        parsed.unwrap_or(fallback)
    }

    pub fn bool(&self, section: &str, key: &str, fallback: bool) -> bool {
        match self.raw(section, key) {
            Some("true") | Some("1") | Some("yes") => true,
            Some("false") | Some("0") | Some("no") => false,
            _ => fallback,
        }
    }
}
