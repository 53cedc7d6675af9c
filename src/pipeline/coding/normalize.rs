// Shapes the parsed model payload into a CodingResult.
// Malformed code entries and span claims are dropped one by one; only a
// non-object payload fails the request.

use serde_json::Value;

use super::grounding::{ground_evidence_spans, NoteIndex};
use super::types::{CodeEntry, CodingResult, EvidenceSpanClaim, RawModelReply};
use super::CodingError;

/// The two code lists of a coding reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeBucket {
    Icd,
    Cpt,
}

impl CodeBucket {
    pub fn key(&self) -> &'static str {
        match self {
            CodeBucket::Icd => "icd_codes",
            CodeBucket::Cpt => "cpt_codes",
        }
    }
}

/// Validate the payload and ground every entry's evidence against `note`.
pub fn normalize_coding_output(
    payload: &Value,
    note: &str,
    reply: &RawModelReply,
    model: &str,
) -> Result<CodingResult, CodingError> {
    let Some(object) = payload.as_object() else {
        tracing::error!(
            payload_type = json_type_name(payload),
            "Parsed payload had unexpected type"
        );
        return Err(CodingError::UnexpectedStructure);
    };

    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let index = NoteIndex::new(note);
    let icd_codes = normalize_bucket(object.get(CodeBucket::Icd.key()), &index, CodeBucket::Icd);
    let cpt_codes = normalize_bucket(object.get(CodeBucket::Cpt.key()), &index, CodeBucket::Cpt);

    Ok(CodingResult {
        model: model.to_string(),
        reasoning,
        icd_codes,
        cpt_codes,
        usage: reply.usage.clone(),
        raw_response: reply.aggregate_text(),
    })
}

fn normalize_bucket(
    entries: Option<&Value>,
    index: &NoteIndex<'_>,
    bucket: CodeBucket,
) -> Vec<CodeEntry> {
    let Some(entries) = entries.and_then(Value::as_array) else {
        return Vec::new();
    };

    let normalized: Vec<CodeEntry> = entries
        .iter()
        .filter_map(|entry| normalize_entry(entry, index))
        .collect();

    let dropped = entries.len() - normalized.len();
    if dropped > 0 {
        tracing::debug!(bucket = bucket.key(), dropped, "Dropped malformed code entries");
    }
    normalized
}

/// `None` unless `code`, `description` and `explanation` are all strings.
fn normalize_entry(entry: &Value, index: &NoteIndex<'_>) -> Option<CodeEntry> {
    let entry = entry.as_object()?;
    let code = entry.get("code")?.as_str()?;
    let description = entry.get("description")?.as_str()?;
    let explanation = entry.get("explanation")?.as_str()?;

    let claims = evidence_claims(entry.get("evidence_spans"));

    Some(CodeEntry {
        code: code.trim().to_string(),
        description: description.trim().to_string(),
        explanation: explanation.trim().to_string(),
        evidence_spans: ground_evidence_spans(index, &claims),
    })
}

/// Span claims with string `text`; anything else in the list is skipped.
pub fn evidence_claims(spans: Option<&Value>) -> Vec<EvidenceSpanClaim> {
    let Some(spans) = spans.and_then(Value::as_array) else {
        return Vec::new();
    };
    spans
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|span| {
            let text = span.get("text")?.as_str()?;
            let explanation = span
                .get("explanation")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(EvidenceSpanClaim {
                text: text.to_string(),
                explanation: explanation.to_string(),
            })
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOTE: &str = "Assessment:\n- Hypertension\n- Diabetes";

    fn normalize(payload: Value) -> Result<CodingResult, CodingError> {
        let reply = RawModelReply::from_text(&payload.to_string());
        normalize_coding_output(&payload, NOTE, &reply, "gpt-5")
    }

    #[test]
    fn end_to_end_scenario() {
        let payload = json!({
            "reasoning": "ok",
            "icd_codes": [{
                "code": "401.9",
                "description": "Hypertension",
                "explanation": "stated",
                "evidence_spans": [{"text": "- Hypertension", "explanation": "dx"}]
            }],
            "cpt_codes": []
        });
        let result = normalize(payload).unwrap();
        assert_eq!(result.model, "gpt-5");
        assert_eq!(result.reasoning, "ok");
        assert!(result.cpt_codes.is_empty());
        assert_eq!(result.icd_codes.len(), 1);

        let span = &result.icd_codes[0].evidence_spans[0];
        assert_eq!(span.text, "- Hypertension");
        assert_eq!(span.start, 12);
        assert_eq!(span.end, 26);
        assert_eq!(span.explanation, "dx");
        assert!(span.verify(NOTE));
    }

    #[test]
    fn non_object_payload_is_unexpected_structure() {
        assert!(matches!(
            normalize(json!(["icd_codes"])),
            Err(CodingError::UnexpectedStructure)
        ));
        assert!(matches!(normalize(json!("text")), Err(CodingError::UnexpectedStructure)));
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let result = normalize(json!({})).unwrap();
        assert_eq!(result.reasoning, "");
        assert!(result.icd_codes.is_empty());
        assert!(result.cpt_codes.is_empty());
    }

    #[test]
    fn non_string_reasoning_and_non_list_buckets_are_empty() {
        let result = normalize(json!({
            "reasoning": 42,
            "icd_codes": {"code": "401.9"},
            "cpt_codes": "none"
        }))
        .unwrap();
        assert_eq!(result.reasoning, "");
        assert!(result.icd_codes.is_empty());
        assert!(result.cpt_codes.is_empty());
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let result = normalize(json!({
            "icd_codes": [
                "401.9",
                {"code": 401.9, "description": "Hypertension", "explanation": "x"},
                {"code": "250.00", "description": "Diabetes"},
                {"code": "250.00", "description": "Diabetes", "explanation": "listed"}
            ]
        }))
        .unwrap();
        assert_eq!(result.icd_codes.len(), 1);
        assert_eq!(result.icd_codes[0].code, "250.00");
        assert!(result.icd_codes[0].evidence_spans.is_empty());
    }

    #[test]
    fn string_fields_are_trimmed() {
        let result = normalize(json!({
            "reasoning": "  sequencing  ",
            "cpt_codes": [{
                "code": " 99213 ",
                "description": " Office visit ",
                "explanation": " established patient ",
                "evidence_spans": []
            }]
        }))
        .unwrap();
        assert_eq!(result.reasoning, "sequencing");
        let entry = &result.cpt_codes[0];
        assert_eq!(entry.code, "99213");
        assert_eq!(entry.description, "Office visit");
        assert_eq!(entry.explanation, "established patient");
    }

    #[test]
    fn entries_ground_independently() {
        let result = normalize(json!({
            "icd_codes": [
                {"code": "401.9", "description": "HTN", "explanation": "a",
                 "evidence_spans": [{"text": "Hypertension", "explanation": "x"}]},
                {"code": "I10", "description": "HTN", "explanation": "b",
                 "evidence_spans": [{"text": "Hypertension", "explanation": "y"}]}
            ],
            "cpt_codes": [
                {"code": "99213", "description": "Visit", "explanation": "c",
                 "evidence_spans": [{"text": "Hypertension", "explanation": "z"}]}
            ]
        }))
        .unwrap();
        let first = &result.icd_codes[0].evidence_spans[0];
        let second = &result.icd_codes[1].evidence_spans[0];
        let third = &result.cpt_codes[0].evidence_spans[0];
        assert_eq!((first.start, first.end), (14, 26));
        assert_eq!((second.start, second.end), (14, 26));
        assert_eq!((third.start, third.end), (14, 26));
    }

    #[test]
    fn malformed_span_claims_are_skipped() {
        let result = normalize(json!({
            "icd_codes": [{
                "code": "250.00",
                "description": "Diabetes",
                "explanation": "listed",
                "evidence_spans": [
                    "Diabetes",
                    {"text": 7},
                    {"text": "   "},
                    {"text": "Diabetes"},
                    {"text": "Asthma", "explanation": "absent"}
                ]
            }]
        }))
        .unwrap();
        let spans = &result.icd_codes[0].evidence_spans;
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start, spans[0].end), (29, 37));
        assert_eq!(spans[0].explanation, "");
        assert_eq!((spans[1].start, spans[1].end), (-1, -1));
        assert_eq!(spans[1].text, "Asthma");
    }

    #[test]
    fn evidence_spans_not_a_list_is_empty() {
        let result = normalize(json!({
            "icd_codes": [{
                "code": "250.00",
                "description": "Diabetes",
                "explanation": "listed",
                "evidence_spans": {"text": "Diabetes"}
            }]
        }))
        .unwrap();
        assert!(result.icd_codes[0].evidence_spans.is_empty());
    }

    #[test]
    fn usage_and_raw_response_are_carried() {
        let payload = json!({"reasoning": "r"});
        let reply = RawModelReply {
            output_text: Some(payload.to_string()),
            usage: Some(json!({"input_tokens": 10, "output_tokens": 3})),
            ..RawModelReply::default()
        };
        let result = normalize_coding_output(&payload, NOTE, &reply, "gpt-4o").unwrap();
        assert_eq!(result.usage, Some(json!({"input_tokens": 10, "output_tokens": 3})));
        assert_eq!(result.raw_response, payload.to_string());
        assert_eq!(result.model, "gpt-4o");
    }
}
