use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::normalize::normalize_coding_output;
use super::parser::extract_payload;
use super::prompt::coding_prompt;
use super::request::{build_request, RequestDefaults, ResponsesRequest};
use super::schema::coding_response_schema;
use super::types::{CodingResult, IcdVersion, LlmClient, RawModelReply};
use super::CodingError;
use crate::config::CodingConfig;
use crate::pipeline::diagnostic;

/// Inbound coding request from the serving layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodingRequest {
    pub note: String,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default = "default_icd_version")]
    pub icd_version: String,
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
}

fn default_icd_version() -> String {
    IcdVersion::Icd9.as_str().to_string()
}

impl CodingRequest {
    /// ICD-9 request with no model override and no options.
    pub fn new(note: &str) -> Self {
        Self {
            note: note.to_string(),
            model_name: None,
            icd_version: default_icd_version(),
            options: None,
        }
    }
}

/// Runs one clinical note through the coding pipeline:
/// validate → build request → LLM → parse → normalize + ground → result
pub struct CodePredictor {
    llm: Box<dyn LlmClient + Send + Sync>,
    config: CodingConfig,
}

impl CodePredictor {
    pub fn new(llm: Box<dyn LlmClient + Send + Sync>, config: CodingConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &CodingConfig {
        &self.config
    }

    /// Predict ICD and CPT codes for `request.note`.
    ///
    /// Input is validated before any provider call. Exactly one request is sent;
    /// any provider, parse or shape failure fails the whole call.
    pub fn predict_codes(&self, request: &CodingRequest) -> Result<CodingResult, CodingError> {
        if request.note.trim().is_empty() {
            return Err(CodingError::EmptyNote);
        }

        let model = self.resolve_model(request.model_name.as_deref())?;
        let icd_version = IcdVersion::parse(&request.icd_version)?;

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "predict_codes",
            request_id = %request_id,
            model = %model,
        );
        let _guard = span.enter();

        let defaults = RequestDefaults {
            reasoning_effort: self.config.default_reasoning_effort,
            max_output_tokens: Some(self.config.default_max_output_tokens),
        };
        let empty = Map::new();
        let outbound = build_request(
            coding_prompt(icd_version),
            &request.note,
            &model,
            request.options.as_ref().unwrap_or(&empty),
            Some(&coding_response_schema()),
            &defaults,
        )?;

        tracing::info!(
            icd_version = icd_version.as_str(),
            note_chars = request.note.chars().count(),
            extras = %outbound.extras(),
            "Sending coding request"
        );

        let reply = self.llm.create_response(&outbound).map_err(|e| {
            tracing::error!(model = %model, error = %e, "LLM call failed");
            e
        })?;

        let dump_dir = self
            .config
            .dump_dir
            .as_deref()
            .and_then(|base| diagnostic::dump_dir_for(base, &request_id));
        if let Some(dir) = &dump_dir {
            dump_exchange(dir, &outbound, &reply);
        }

        let payload = extract_payload(&reply)?;
        let result = normalize_coding_output(&payload, &request.note, &reply, &model)?;

        let stats = result.grounding_stats();
        tracing::info!(
            icd_codes = result.icd_codes.len(),
            cpt_codes = result.cpt_codes.len(),
            grounded = stats.grounded,
            ungrounded = stats.ungrounded,
            "Coding request complete"
        );

        if let Some(dir) = &dump_dir {
            diagnostic::dump_json(dir, diagnostic::RESULT_FILE, &result);
        }

        Ok(result)
    }

    /// Caller override, else the configured default. Blank counts as unset.
    fn resolve_model(&self, requested: Option<&str>) -> Result<String, CodingError> {
        let model = requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.config.default_model.trim());
        if model.is_empty() {
            return Err(CodingError::NoModelConfigured);
        }
        Ok(model.to_string())
    }
}

/// Written before parsing, so a reply that fails to parse is still on disk.
fn dump_exchange(dir: &Path, outbound: &ResponsesRequest, reply: &RawModelReply) {
    diagnostic::dump_json(dir, diagnostic::REQUEST_FILE, outbound);
    diagnostic::dump_text(dir, diagnostic::RAW_RESPONSE_FILE, &reply.aggregate_text());
}
