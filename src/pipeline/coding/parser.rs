use serde_json::Value;

use super::types::{RawModelReply, ReplyPart};
use super::CodingError;

/// Pull the structured payload out of a provider reply.
///
/// Preference order: the transport's parsed payload, then the first content part
/// that is parsed or decodes as JSON, then the aggregate output text. Any JSON
/// value is returned; shape checks belong to normalization.
pub fn extract_payload(reply: &RawModelReply) -> Result<Value, CodingError> {
    if let Some(parsed) = &reply.parsed {
        return Ok(parsed.clone());
    }

    for part in &reply.parts {
        match part {
            ReplyPart::Parsed { value, .. } => return Ok(value.clone()),
            ReplyPart::Text(text) => {
                if let Some(value) = decode_json(text) {
                    return Ok(value);
                }
            }
        }
    }

    let aggregate = reply.aggregate_text();
    match serde_json::from_str(&aggregate) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::error!(
                error = %e,
                length = aggregate.len(),
                "LLM reply was not valid JSON"
            );
            Err(CodingError::InvalidJson)
        }
    }
}

fn decode_json(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_parsed_payload_wins() {
        let reply = RawModelReply {
            parsed: Some(json!({"source": "parsed"})),
            parts: vec![ReplyPart::Text("{\"source\": \"text\"}".into())],
            ..RawModelReply::default()
        };
        assert_eq!(extract_payload(&reply).unwrap(), json!({"source": "parsed"}));
    }

    #[test]
    fn parsed_part_is_used() {
        let reply = RawModelReply {
            parts: vec![ReplyPart::Parsed {
                value: json!({"source": "part"}),
                text: None,
            }],
            ..RawModelReply::default()
        };
        assert_eq!(extract_payload(&reply).unwrap(), json!({"source": "part"}));
    }

    #[test]
    fn first_decodable_text_part_is_used() {
        let reply = RawModelReply {
            parts: vec![
                ReplyPart::Text("not json".into()),
                ReplyPart::Text("{\"n\": 2}".into()),
            ],
            ..RawModelReply::default()
        };
        assert_eq!(extract_payload(&reply).unwrap(), json!({"n": 2}));
    }

    #[test]
    fn aggregate_text_is_the_last_resort() {
        let reply = RawModelReply {
            parts: vec![
                ReplyPart::Text("{\"reasoning\": ".into()),
                ReplyPart::Text("\"split\"}".into()),
            ],
            ..RawModelReply::default()
        };
        assert_eq!(extract_payload(&reply).unwrap(), json!({"reasoning": "split"}));
    }

    #[test]
    fn output_text_fallback() {
        let reply = RawModelReply {
            output_text: Some("{\"ok\": true}".into()),
            ..RawModelReply::default()
        };
        assert_eq!(extract_payload(&reply).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn wrong_shape_json_is_not_a_parse_error() {
        let reply = RawModelReply::from_text("[1, 2, 3]");
        assert_eq!(extract_payload(&reply).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn non_json_reply_is_rejected() {
        let reply = RawModelReply::from_text("I could not code this note.");
        assert!(matches!(extract_payload(&reply), Err(CodingError::InvalidJson)));
    }

    #[test]
    fn empty_reply_is_rejected() {
        let reply = RawModelReply::default();
        assert!(matches!(extract_payload(&reply), Err(CodingError::InvalidJson)));
    }
}
