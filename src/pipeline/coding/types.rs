use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request::ResponsesRequest;
use super::CodingError;

/// Offset value marking an evidence span that could not be located in the note.
pub const UNGROUNDED_OFFSET: i64 = -1;

/// ICD code set the prompt asks the model to code against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IcdVersion {
    #[serde(rename = "9")]
    Icd9,
    #[serde(rename = "10")]
    Icd10,
}

impl IcdVersion {
    /// Parse the caller-facing version string ("9" or "10").
    pub fn parse(value: &str) -> Result<Self, CodingError> {
        match value.trim() {
            "9" => Ok(IcdVersion::Icd9),
            "10" => Ok(IcdVersion::Icd10),
            other => Err(CodingError::InvalidIcdVersion(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IcdVersion::Icd9 => "9",
            IcdVersion::Icd10 => "10",
        }
    }
}

/// Reasoning effort accepted by reasoning-capable model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    /// Case-insensitive parse; `None` for anything outside the enum.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "minimal" => Some(ReasoningEffort::Minimal),
            "low" => Some(ReasoningEffort::Low),
            "medium" => Some(ReasoningEffort::Medium),
            "high" => Some(ReasoningEffort::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

/// A quotation the model claims supports a code. May not occur verbatim in the note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSpanClaim {
    pub text: String,
    #[serde(default)]
    pub explanation: String,
}

/// An evidence span resolved against the note.
///
/// Offsets count Unicode scalar values. When grounded, the note's characters
/// `start..end` equal `text`; otherwise both offsets are [`UNGROUNDED_OFFSET`]
/// and `text` is the trimmed claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedEvidenceSpan {
    pub text: String,
    pub start: i64,
    pub end: i64,
    pub explanation: String,
}

impl GroundedEvidenceSpan {
    pub fn ungrounded(text: &str, explanation: &str) -> Self {
        Self {
            text: text.to_string(),
            start: UNGROUNDED_OFFSET,
            end: UNGROUNDED_OFFSET,
            explanation: explanation.to_string(),
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.start >= 0 && self.end >= self.start
    }

    /// Check that the span's offsets select exactly `text` in `note`.
    pub fn verify(&self, note: &str) -> bool {
        if !self.is_grounded() {
            return false;
        }
        let (start, end) = (self.start as usize, self.end as usize);
        let selected: String = note.chars().skip(start).take(end - start).collect();
        selected.chars().count() == end - start && selected == self.text
    }
}

/// One billing code with its justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub code: String,
    pub description: String,
    pub explanation: String,
    pub evidence_spans: Vec<GroundedEvidenceSpan>,
}

/// Canonical result of one coding request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingResult {
    pub model: String,
    pub reasoning: String,
    pub icd_codes: Vec<CodeEntry>,
    pub cpt_codes: Vec<CodeEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    pub raw_response: String,
}

/// Grounded vs. ungrounded evidence span counts across both code buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroundingStats {
    pub grounded: usize,
    pub ungrounded: usize,
}

impl CodingResult {
    pub fn grounding_stats(&self) -> GroundingStats {
        self.icd_codes
            .iter()
            .chain(self.cpt_codes.iter())
            .flat_map(|entry| entry.evidence_spans.iter())
            .fold(GroundingStats::default(), |mut stats, span| {
                if span.is_grounded() {
                    stats.grounded += 1;
                } else {
                    stats.ungrounded += 1;
                }
                stats
            })
    }
}

/// One content part of a provider reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPart {
    /// The transport already decoded this part into structured data. `text` is
    /// the part's output text when the provider sent it alongside.
    Parsed { value: Value, text: Option<String> },
    /// Raw output text, possibly JSON.
    Text(String),
}

/// Provider reply, resolved into explicit variants once at the transport boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawModelReply {
    /// Structured payload exposed directly by the transport, if any.
    pub parsed: Option<Value>,
    /// Content parts in output order.
    pub parts: Vec<ReplyPart>,
    /// Aggregate output text as reported by the provider.
    pub output_text: Option<String>,
    /// Token accounting, passed through opaquely.
    pub usage: Option<Value>,
}

impl RawModelReply {
    /// Reply consisting of a single text part.
    pub fn from_text(text: &str) -> Self {
        Self {
            parts: vec![ReplyPart::Text(text.to_string())],
            ..Self::default()
        }
    }

    /// Aggregate reply text: `output_text` when non-empty, else all text parts joined.
    pub fn aggregate_text(&self) -> String {
        if let Some(text) = self.output_text.as_deref().filter(|t| !t.is_empty()) {
            return text.to_string();
        }
        self.parts
            .iter()
            .filter_map(|part| match part {
                ReplyPart::Text(text) => Some(text.as_str()),
                ReplyPart::Parsed { text, .. } => text.as_deref(),
            })
            .collect()
    }
}

/// LLM provider transport (allows mocking).
pub trait LlmClient {
    /// Send one request and return exactly one reply. No retries.
    fn create_response(&self, request: &ResponsesRequest) -> Result<RawModelReply, CodingError>;
}
