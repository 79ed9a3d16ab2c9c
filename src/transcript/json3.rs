//! YouTube `json3` subtitle documents.

use serde::Deserialize;
use serde_json::Value;

use super::Segment;
use crate::ClipperError;

/// Duration given to events that carry no usable end time
const DEFAULT_EVENT_DURATION_MS: f64 = 1000.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    t_start_ms: Option<f64>,
    d_duration_ms: Option<f64>,
    t_end_ms: Option<f64>,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    utf8: Option<String>,
}

/// Parse a `json3` document into segments.
///
/// Events that fail to deserialize, have no start time or no text are skipped.
pub fn parse_json3(document: &str) -> Result<Vec<Segment>, ClipperError> {
    let root: Value = serde_json::from_str(document)
        .map_err(|e| ClipperError::MalformedTranscript(format!("invalid JSON: {}", e)))?;

    let events = root
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| ClipperError::MalformedTranscript("missing 'events' array".to_string()))?;

    let mut segments = Vec::new();
    let mut skipped = 0usize;

    for (index, raw) in events.iter().enumerate() {
        let event: Json3Event = match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("Skipping subtitle event #{}: {}", index, e);
                skipped += 1;
                continue;
            }
        };

        match event_to_segment(event) {
            Some(segment) => segments.push(segment),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} unusable subtitle events", skipped);
    }

    if segments.is_empty() {
        return Err(ClipperError::MalformedTranscript(
            "no usable subtitle events".to_string(),
        ));
    }

    Ok(segments)
}

fn event_to_segment(event: Json3Event) -> Option<Segment> {
    let start_ms = event.t_start_ms.filter(|s| s.is_finite() && *s >= 0.0)?;

    let end_ms = event
        .d_duration_ms
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| start_ms + d)
        .or_else(|| event.t_end_ms.filter(|e| e.is_finite() && *e > start_ms))
        .unwrap_or(start_ms + DEFAULT_EVENT_DURATION_MS);

    let joined: String = event.segs.into_iter().filter_map(|seg| seg.utf8).collect();
    let text = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    Some(Segment::new(start_ms / 1000.0, end_ms / 1000.0, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_events() {
        let doc = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 2000, "segs": [{"utf8": "hello "}, {"utf8": "world"}]},
                {"tStartMs": 5000, "dDurationMs": 2000, "segs": [{"utf8": "never gonna\ngive you up"}]}
            ]
        }"#;
        let segments = parse_json3(doc).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::new(0.0, 2.0, "hello world"),
                Segment::new(5.0, 7.0, "never gonna give you up"),
            ]
        );
    }

    #[test]
    fn test_missing_end_defaults_to_one_second() {
        let doc = r#"{"events": [{"tStartMs": 1500, "segs": [{"utf8": "hi"}]}]}"#;
        let segments = parse_json3(doc).unwrap();
        assert_eq!(segments[0].start_time, 1.5);
        assert_eq!(segments[0].end_time, 2.5);
    }

    #[test]
    fn test_uses_explicit_end_when_no_duration() {
        let doc = r#"{"events": [{"tStartMs": 1000, "tEndMs": 4000, "segs": [{"utf8": "hi"}]}]}"#;
        let segments = parse_json3(doc).unwrap();
        assert_eq!(segments[0].end_time, 4.0);
    }

    #[test]
    fn test_skips_malformed_and_empty_events() {
        let doc = r#"{"events": [
            {"tStartMs": "soon", "segs": [{"utf8": "bad start"}]},
            {"dDurationMs": 500, "segs": [{"utf8": "no start"}]},
            {"tStartMs": 100, "dDurationMs": 100, "segs": [{"utf8": "\n"}]},
            {"tStartMs": 200, "dDurationMs": 100},
            "not an object",
            {"tStartMs": 300, "dDurationMs": 700, "segs": [{"utf8": "kept"}, {"acAsrConf": 0}]}
        ]}"#;
        let segments = parse_json3(doc).unwrap();
        assert_eq!(segments, vec![Segment::new(0.3, 1.0, "kept")]);
    }

    #[test]
    fn test_no_usable_events_is_malformed() {
        let doc = r#"{"events": [{"segs": [{"utf8": "orphan"}]}]}"#;
        assert!(matches!(
            parse_json3(doc),
            Err(ClipperError::MalformedTranscript(_))
        ));
    }

    #[test]
    fn test_invalid_documents_are_malformed() {
        assert!(matches!(
            parse_json3("WEBVTT\n\n00:00.000 --> 00:01.000\nhi"),
            Err(ClipperError::MalformedTranscript(_))
        ));
        assert!(matches!(
            parse_json3(r#"{"wireMagic": "pb3"}"#),
            Err(ClipperError::MalformedTranscript(_))
        ));
    }
}
