use chrono::{TimeZone, Utc};

use crate::scheduler::CLOCK_EPOCH_MS;
use crate::urlenc;

const COOKIE_TTL_MS: i64 = 365 * 24 * 60 * 60 * 1000;

pub trait CookieStore {
    fn get(&self, name: &str) -> String;
    fn set(&mut self, name: &str, value: &str);
}

#[derive(Debug, Clone)]
struct CookieEntry {
    name: String,
    value: String,
    expires_ms: i64,
}

#[derive(Debug, Default)]
pub struct CookieJar {
    entries: Vec<CookieEntry>,
    writes: Vec<String>,
    now_ms: i64,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_now(&mut self, now_ms: i64) {
        self.now_ms = now_ms;
    }

    // The browser-visible document.cookie form: values percent-encoded,
    // expiry never shown.
    pub fn header(&self) -> String {
        self.entries
            .iter()
            .filter(|entry| entry.expires_ms > self.now_ms)
            .map(|entry| {
                format!(
                    "{}={}",
                    entry.name,
                    urlenc::encode_uri_component(&entry.value)
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn take_writes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.writes)
    }

    fn write_header(name: &str, value: &str, expires_ms: i64) -> String {
        let expires_at = CLOCK_EPOCH_MS + expires_ms;
        let date = match Utc.timestamp_millis_opt(expires_at).single() {
            Some(stamp) => stamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            None => String::new(),
        };
        format!(
            "{}={}; expires={}",
            name,
            urlenc::encode_uri_component(value),
            date
        )
    }
}

impl CookieStore for CookieJar {
    fn get(&self, name: &str) -> String {
        let prefix = format!("{name}=");
        let header = self.header();
        let decoded = match urlenc::decode_uri_component(&header) {
            Ok(decoded) => decoded,
            Err(_) => header,
        };
        for segment in decoded.split(';') {
            let segment = segment.trim_start_matches(' ');
            if let Some(value) = segment.strip_prefix(&prefix) {
                return value.to_string();
            }
        }
        String::new()
    }

    fn set(&mut self, name: &str, value: &str) {
        let expires_ms = self.now_ms + COOKIE_TTL_MS;
        self.writes
            .push(Self::write_header(name, value, expires_ms));
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.name == name) {
            entry.value = value.to_string();
            entry.expires_ms = expires_ms;
        } else {
            self.entries.push(CookieEntry {
                name: name.to_string(),
                value: value.to_string(),
                expires_ms,
            });
        }
    }
}
