//! Normalizers for raw scanner-library events.
//!
//! Each scanning library wraps its decoded payload differently; every
//! adapter here reads exactly one field, selected at configuration time,
//! instead of duck-probing whatever shape arrives. Arrays of detections
//! take the first element; plain strings pass through unchanged.

use serde_json::Value;

/// Scanning libraries known to the kiosk clients, keyed by the field their
/// decode events expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerSource {
    /// `jsQR` and compatible: `{ data: "..." }`
    JsQr,
    /// `@zxing/browser`: `{ text: "..." }`
    ZxingBrowser,
    /// Native `BarcodeDetector`: `{ rawValue: "..." }`
    BarcodeDetector,
    /// `html5-qrcode`: `{ decodedText: "..." }`
    Html5Qrcode,
}

impl ScannerSource {
    pub const ALL: [ScannerSource; 4] = [
        ScannerSource::JsQr,
        ScannerSource::ZxingBrowser,
        ScannerSource::BarcodeDetector,
        ScannerSource::Html5Qrcode,
    ];

    fn field(&self) -> &'static str {
        match self {
            ScannerSource::JsQr => "data",
            ScannerSource::ZxingBrowser => "text",
            ScannerSource::BarcodeDetector => "rawValue",
            ScannerSource::Html5Qrcode => "decodedText",
        }
    }

    /// Extracts the decoded payload from one of this library's events.
    pub fn extract(&self, event: &Value) -> Option<String> {
        let event = match event {
            Value::Array(items) => items.first()?,
            other => other,
        };

        match event {
            Value::String(s) => non_empty(s),
            Value::Object(map) => map.get(self.field()).and_then(Value::as_str).and_then(non_empty),
            _ => None,
        }
    }
}

/// Probes every known adapter in order, for callers that cannot know which
/// library produced the event.
pub fn normalize_any(event: &Value) -> Option<String> {
    ScannerSource::ALL
        .iter()
        .find_map(|source| source.extract(event))
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
