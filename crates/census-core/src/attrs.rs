//! Span attribute formatting.
//!
//! Every request span carries the same attribute set. The helpers here turn
//! raw request/response metadata into the text stored on the span, so the
//! gateway middleware only has to extract the values and record the results.
//!
//! Maps (query parameters, headers) are rendered as JSON objects. Key order
//! follows first occurrence.

use std::borrow::Cow;
use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use serde_json::{Map, Value};

/// Display format of `http.start_time`.
pub const START_TIME_FORMAT: &str = "%d/%m/%Y, %H:%M:%S, %Z";

/// `"[{METHOD}] {URL}"`
pub fn span_name(method: &str, url: &str) -> String {
    format!("[{method}] {url}")
}

/// Read-only verbs whose request body is never recorded.
pub fn is_fetch_method(method: &str) -> bool {
    method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD")
}

pub fn start_time<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format(START_TIME_FORMAT).to_string()
}

/// Rebuild the absolute URL of a request.
///
/// `host` is the URI authority for absolute-form targets, otherwise the
/// `Host` header. `path_and_query` is the parsed path plus query, never
/// inspected for scheme markers. Without a host the path is returned alone.
pub fn full_url(scheme: &str, host: Option<&str>, path_and_query: &str) -> String {
    match host {
        Some(h) if !h.is_empty() => format!("{scheme}://{h}{path_and_query}"),
        _ => path_and_query.to_string(),
    }
}

/// Query parameters as a JSON object. A repeated key keeps its first
/// position and its last value.
pub fn query_params_json<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert(k.as_ref().to_string(), Value::String(v.as_ref().to_string()));
    }
    Value::Object(map).to_string()
}

/// Headers as a JSON object with lowercase names. Repeated headers are
/// joined with `", "`.
pub fn headers_json<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut map = Map::new();
    for (k, v) in pairs {
        let name = k.as_ref().to_ascii_lowercase();
        match map.get_mut(&name) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(v.as_ref());
            }
            _ => {
                map.insert(name, Value::String(v.as_ref().to_string()));
            }
        }
    }
    Value::Object(map).to_string()
}

/// Body bytes as UTF-8 text, or a placeholder when the bytes are not UTF-8.
pub fn body_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(format!("<non-utf8 body: {} bytes>", bytes.len())),
    }
}

/// Elapsed time in seconds, whole seconds included.
pub fn duration_secs(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Utc;

    #[test]
    fn span_name_brackets_method() {
        assert_eq!(
            span_name("POST", "http://localhost/anything"),
            "[POST] http://localhost/anything"
        );
    }

    #[test]
    fn fetch_verbs() {
        assert!(is_fetch_method("GET"));
        assert!(is_fetch_method("head"));
        for m in ["POST", "PUT", "PATCH", "DELETE", "OPTIONS"] {
            assert!(!is_fetch_method(m), "{m}");
        }
    }

    #[test]
    fn start_time_fixed_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(start_time(&at), "05/03/2024, 14:07:09, UTC");
    }

    #[test]
    fn full_url_from_origin_form() {
        assert_eq!(
            full_url("http", Some("example.com:8080"), "/a?b=1"),
            "http://example.com:8080/a?b=1"
        );
        assert_eq!(full_url("http", None, "/a"), "/a");
        assert_eq!(full_url("http", Some(""), "/a"), "/a");
    }

    #[test]
    fn full_url_with_url_in_query() {
        assert_eq!(
            full_url("http", Some("localhost"), "/login?next=https://x.test/y"),
            "http://localhost/login?next=https://x.test/y"
        );
    }

    #[test]
    fn query_params_keep_order_last_value_wins() {
        let pairs = [("z", "1"), ("a", "2"), ("z", "3")];
        assert_eq!(query_params_json(pairs), r#"{"z":"3","a":"2"}"#);
        assert_eq!(query_params_json(Vec::<(String, String)>::new()), "{}");
    }

    #[test]
    fn headers_lowercase_and_join_repeats() {
        let pairs = [
            ("Accept", "text/html"),
            ("x-trace", "a"),
            ("X-Trace", "b"),
        ];
        assert_eq!(
            headers_json(pairs),
            r#"{"accept":"text/html","x-trace":"a, b"}"#
        );
    }

    #[test]
    fn body_text_placeholder_on_invalid_utf8() {
        assert_eq!(body_text(br#"{"a":1}"#), r#"{"a":1}"#);
        assert_eq!(body_text(&[0xff, 0xfe, 0x00]), "<non-utf8 body: 3 bytes>");
        assert_eq!(body_text(b""), "");
    }

    #[test]
    fn duration_keeps_whole_seconds() {
        let d = Duration::from_millis(2_500);
        assert!((duration_secs(d) - 2.5).abs() < f64::EPSILON);
        assert!(duration_secs(Duration::from_micros(1_500)) < 0.01);
    }
}
