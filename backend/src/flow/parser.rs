//! Pure parser for scanned and typed machine payloads.
//!
//! Kiosk QR codes encode a URL into the web client; users can also type a
//! bare machine code, and some label printers emit just the querystring.
//! The parser tolerates all three without network access and never fails:
//! an unusable payload comes back with `machine_id` absent, which is the
//! canonical parse-failure signal.

use crate::flow::scan;
use serde_json::Value;
use url::Url;

/// The parsed, unverified claim of which vending machine a payload refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineReference {
    /// Absent or empty means the payload did not parse.
    pub machine_id: Option<String>,
    /// Freshness marker embedded by dynamic kiosk displays.
    pub timestamp: Option<String>,
    /// Authenticity tag embedded by the kiosk; opaque to the client.
    pub signature: Option<String>,
    /// Original payload, kept for diagnostics.
    pub raw_source: String,
}

impl MachineReference {
    fn unparsed(raw: &str) -> Self {
        Self {
            machine_id: None,
            timestamp: None,
            signature: None,
            raw_source: raw.to_string(),
        }
    }

    /// True when the payload yielded a usable machine id.
    pub fn is_parsed(&self) -> bool {
        self.machine_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

pub struct QrParser {
    /// Origin of the kiosk web client; root-relative payloads resolve here.
    origin: Url,
}

impl QrParser {
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }

    /// Parses a raw scanner-library event by normalizing it to a string first.
    pub fn parse_event(&self, event: &Value) -> MachineReference {
        match scan::normalize_any(event) {
            Some(text) => self.parse(&text),
            None => MachineReference::unparsed(""),
        }
    }

    /// Parses a scanned or typed payload. First match wins:
    /// URL form, bare querystring, literal machine id.
    pub fn parse(&self, raw: &str) -> MachineReference {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return MachineReference::unparsed(raw);
        }

        if looks_like_url(trimmed) {
            // A payload that fails URL parsing falls through to the
            // querystring and literal branches rather than surfacing an error.
            if let Some(reference) = self.parse_url_form(raw, trimmed) {
                return reference;
            }
        }

        if trimmed.contains('=') && trimmed.contains('&') {
            return parse_query_form(raw, trimmed);
        }

        MachineReference {
            machine_id: Some(trimmed.to_string()),
            timestamp: None,
            signature: None,
            raw_source: raw.to_string(),
        }
    }

    fn parse_url_form(&self, raw: &str, trimmed: &str) -> Option<MachineReference> {
        let url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Url::parse(trimmed)
        } else if trimmed.starts_with("www.") {
            Url::parse(&format!("https://{}", trimmed))
        } else {
            self.origin.join(trimmed)
        }
        .ok()?;

        let mut fields = PayloadFields::default();
        for (key, value) in url.query_pairs() {
            fields.set(key.as_ref(), value.into_owned());
        }
        Some(fields.into_reference(raw))
    }
}

fn parse_query_form(raw: &str, trimmed: &str) -> MachineReference {
    let mut fields = PayloadFields::default();
    for (key, value) in url::form_urlencoded::parse(trimmed.as_bytes()) {
        fields.set(key.as_ref(), value.into_owned());
    }
    fields.into_reference(raw)
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://")
        || s.starts_with("https://")
        || s.starts_with("www.")
        || s.starts_with('/')
        || s.starts_with('?')
}

#[derive(Default)]
struct PayloadFields {
    m: Option<String>,
    machine_id: Option<String>,
    ts: Option<String>,
    sig: Option<String>,
}

impl PayloadFields {
    fn set(&mut self, key: &str, value: String) {
        match key {
            "m" => self.m = Some(value),
            "machineId" => self.machine_id = Some(value),
            "ts" => self.ts = Some(value),
            "sig" => self.sig = Some(value),
            _ => {}
        }
    }

    fn into_reference(self, raw: &str) -> MachineReference {
        MachineReference {
            // `m` is preferred; `machineId` is the manual-entry alias.
            machine_id: self.m.or(self.machine_id).filter(|id| !id.is_empty()),
            timestamp: self.ts.filter(|ts| !ts.is_empty()),
            signature: self.sig.filter(|sig| !sig.is_empty()),
            raw_source: raw.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parser() -> QrParser {
        QrParser::new(Url::parse("https://kiosk.example").unwrap())
    }

    #[test]
    fn parses_absolute_url_payload() {
        let reference = parser().parse("https://kiosk.example/kiosk?m=007&ts=1700000000&sig=abc123");
        assert_eq!(reference.machine_id.as_deref(), Some("007"));
        assert_eq!(reference.timestamp.as_deref(), Some("1700000000"));
        assert_eq!(reference.signature.as_deref(), Some("abc123"));
    }

    #[test]
    fn parses_root_relative_url_against_origin() {
        let reference = parser().parse("/kiosk?m=007&sig=abc");
        assert_eq!(reference.machine_id.as_deref(), Some("007"));
        assert_eq!(reference.signature.as_deref(), Some("abc"));
    }

    #[test]
    fn parses_query_only_payload() {
        let reference = parser().parse("?machineId=9X&sig=def");
        assert_eq!(reference.machine_id.as_deref(), Some("9X"));
    }

    #[test]
    fn www_prefix_is_treated_as_https() {
        let reference = parser().parse("www.kiosk.example/kiosk?m=42&sig=s");
        assert_eq!(reference.machine_id.as_deref(), Some("42"));
    }

    #[test]
    fn m_is_preferred_over_machine_id() {
        let reference = parser().parse("https://kiosk.example/?machineId=OLD&m=NEW");
        assert_eq!(reference.machine_id.as_deref(), Some("NEW"));
    }

    #[test]
    fn parses_bare_querystring_payload() {
        let reference = parser().parse("m=X7&sig=S1&ts=99");
        assert_eq!(reference.machine_id.as_deref(), Some("X7"));
        assert_eq!(reference.signature.as_deref(), Some("S1"));
        assert_eq!(reference.timestamp.as_deref(), Some("99"));
    }

    #[test]
    fn plain_text_is_a_literal_machine_id() {
        let reference = parser().parse("  007  ");
        assert_eq!(reference.machine_id.as_deref(), Some("007"));
        assert_eq!(reference.timestamp, None);
        assert_eq!(reference.signature, None);
    }

    #[test]
    fn empty_input_yields_no_machine_id() {
        assert!(!parser().parse("").is_parsed());
        assert!(!parser().parse("   ").is_parsed());
    }

    #[test]
    fn url_without_machine_parameter_is_a_parse_failure() {
        let reference = parser().parse("https://kiosk.example/kiosk?foo=bar&baz=1");
        assert!(!reference.is_parsed());
    }

    #[test]
    fn empty_machine_parameter_is_a_parse_failure() {
        let reference = parser().parse("https://kiosk.example/kiosk?m=&sig=abc");
        assert!(!reference.is_parsed());
    }

    #[test]
    fn unparseable_url_falls_through_to_literal() {
        // `http://` alone fails URL parsing and has no querystring shape,
        // so the whole payload lands in the literal branch.
        let reference = parser().parse("http://");
        assert_eq!(reference.machine_id.as_deref(), Some("http://"));
    }

    #[test]
    fn raw_source_is_preserved_for_diagnostics() {
        let reference = parser().parse("m=1&sig=2");
        assert_eq!(reference.raw_source, "m=1&sig=2");
    }

    #[test]
    fn parses_scanner_events() {
        let reference = parser().parse_event(&json!({ "decodedText": "?m=55&sig=zz" }));
        assert_eq!(reference.machine_id.as_deref(), Some("55"));

        let reference = parser().parse_event(&json!(null));
        assert!(!reference.is_parsed());
    }
}
