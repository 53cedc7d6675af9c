//! Caller-supplied generation options.
//!
//! Options arrive as a loose JSON mapping. Only the kinds in [`OptionKind`] are
//! recognized; everything else, and any recognized key with a misshapen value,
//! is dropped with a debug log and never reaches the provider.

use serde::Serialize;
use serde_json::{Map, Value};

use super::types::ReasoningEffort;

/// Option names accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    MaxOutputTokens,
    /// Legacy alias of `max_output_tokens`.
    MaxTokens,
    /// Legacy alias routed to `text.max_output_tokens`.
    MaxCompletionTokens,
    ReasoningEffort,
    Reasoning,
}

impl OptionKind {
    pub const ALL: [OptionKind; 5] = [
        OptionKind::MaxOutputTokens,
        OptionKind::MaxTokens,
        OptionKind::MaxCompletionTokens,
        OptionKind::ReasoningEffort,
        OptionKind::Reasoning,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            OptionKind::MaxOutputTokens => "max_output_tokens",
            OptionKind::MaxTokens => "max_tokens",
            OptionKind::MaxCompletionTokens => "max_completion_tokens",
            OptionKind::ReasoningEffort => "reasoning_effort",
            OptionKind::Reasoning => "reasoning",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

/// The provider's `reasoning` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReasoningConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<ReasoningEffort>,
    /// Other reasoning settings (e.g. `summary`), forwarded as given.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReasoningConfig {
    pub fn with_effort(effort: ReasoningEffort) -> Self {
        Self {
            effort: Some(effort),
            extra: Map::new(),
        }
    }

    /// Accept a caller `reasoning` object. An unknown `effort` string is dropped,
    /// and an object left empty counts as absent.
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut config = ReasoningConfig::default();
        for (key, entry) in object {
            if key == "effort" {
                match entry.as_str().and_then(ReasoningEffort::parse) {
                    Some(effort) => config.effort = Some(effort),
                    None => tracing::debug!(value = %entry, "Ignoring unsupported reasoning effort"),
                }
            } else {
                config.extra.insert(key.clone(), entry.clone());
            }
        }
        (config.effort.is_some() || !config.extra.is_empty()).then_some(config)
    }
}

/// A recognized option with a well-formed value.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOption {
    MaxOutputTokens(u64),
    MaxTokens(u64),
    MaxCompletionTokens(u64),
    ReasoningEffort(ReasoningEffort),
    Reasoning(ReasoningConfig),
}

impl GenerationOption {
    /// Interpret one caller entry. `None` if the key is unknown or the value misshapen.
    pub fn from_entry(key: &str, value: &Value) -> Option<Self> {
        let kind = OptionKind::from_key(key)?;
        match kind {
            OptionKind::MaxOutputTokens => token_limit(value).map(GenerationOption::MaxOutputTokens),
            OptionKind::MaxTokens => token_limit(value).map(GenerationOption::MaxTokens),
            OptionKind::MaxCompletionTokens => {
                token_limit(value).map(GenerationOption::MaxCompletionTokens)
            }
            OptionKind::ReasoningEffort => value
                .as_str()
                .and_then(ReasoningEffort::parse)
                .map(GenerationOption::ReasoningEffort),
            OptionKind::Reasoning => {
                ReasoningConfig::from_value(value).map(GenerationOption::Reasoning)
            }
        }
    }

    pub fn kind(&self) -> OptionKind {
        match self {
            GenerationOption::MaxOutputTokens(_) => OptionKind::MaxOutputTokens,
            GenerationOption::MaxTokens(_) => OptionKind::MaxTokens,
            GenerationOption::MaxCompletionTokens(_) => OptionKind::MaxCompletionTokens,
            GenerationOption::ReasoningEffort(_) => OptionKind::ReasoningEffort,
            GenerationOption::Reasoning(_) => OptionKind::Reasoning,
        }
    }
}

/// Positive integer token limit; numeric strings are accepted.
fn token_limit(value: &Value) -> Option<u64> {
    let limit = match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }?;
    (limit > 0).then_some(limit)
}

/// Keep only recognized, well-formed options. Never fails.
pub fn filter_options(raw: &Map<String, Value>) -> Vec<GenerationOption> {
    raw.iter()
        .filter_map(|(key, value)| {
            if value.is_null() {
                tracing::debug!(option = %key, "Ignoring null LLM option");
                return None;
            }
            let option = GenerationOption::from_entry(key, value);
            if option.is_none() {
                tracing::debug!(option = %key, "Ignoring unsupported LLM option");
            }
            option
        })
        .collect()
}

/// Options after alias folding, in the shape the request carries them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSettings {
    pub max_output_tokens: Option<u64>,
    /// `max_completion_tokens`, nested under `text` on the wire.
    pub text_max_output_tokens: Option<u64>,
    pub reasoning: Option<ReasoningConfig>,
}

impl GenerationSettings {
    /// Fold aliases into canonical settings.
    ///
    /// `max_tokens` only applies when `max_output_tokens` is absent, and a flat
    /// `reasoning_effort` only applies when no explicit `reasoning` object is given.
    pub fn fold(options: &[GenerationOption]) -> Self {
        let mut max_output_tokens = None;
        let mut max_tokens = None;
        let mut text_max_output_tokens = None;
        let mut reasoning_effort = None;
        let mut reasoning = None;

        for option in options {
            match option {
                GenerationOption::MaxOutputTokens(limit) => max_output_tokens = Some(*limit),
                GenerationOption::MaxTokens(limit) => max_tokens = Some(*limit),
                GenerationOption::MaxCompletionTokens(limit) => {
                    text_max_output_tokens = Some(*limit)
                }
                GenerationOption::ReasoningEffort(effort) => reasoning_effort = Some(*effort),
                GenerationOption::Reasoning(config) => reasoning = Some(config.clone()),
            }
        }

        if max_output_tokens.is_some() && max_tokens.is_some() {
            tracing::debug!("Ignoring max_tokens alias; max_output_tokens already set");
        }

        Self {
            max_output_tokens: max_output_tokens.or(max_tokens),
            text_max_output_tokens,
            reasoning: reasoning.or_else(|| reasoning_effort.map(ReasoningConfig::with_effort)),
        }
    }

    /// Filter a raw caller mapping and fold it.
    pub fn from_raw(raw: &Map<String, Value>) -> Self {
        Self::fold(&filter_options(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let options = filter_options(&raw(json!({
            "temperature": 0.2,
            "extra_body": {"x": 1},
            "max_output_tokens": 800
        })));
        assert_eq!(options, vec![GenerationOption::MaxOutputTokens(800)]);
    }

    #[test]
    fn misshapen_values_are_dropped() {
        let options = filter_options(&raw(json!({
            "max_output_tokens": "lots",
            "reasoning_effort": 3,
            "reasoning": "high",
            "max_tokens": -5
        })));
        assert!(options.is_empty());
    }

    #[test]
    fn null_values_are_dropped() {
        let options = filter_options(&raw(json!({"max_output_tokens": null})));
        assert!(options.is_empty());
    }

    #[test]
    fn numeric_string_limits_are_accepted() {
        let options = filter_options(&raw(json!({"max_output_tokens": "1200"})));
        assert_eq!(options, vec![GenerationOption::MaxOutputTokens(1200)]);
    }

    #[test]
    fn max_tokens_folds_into_max_output_tokens() {
        let settings = GenerationSettings::from_raw(&raw(json!({"max_tokens": 500})));
        assert_eq!(settings.max_output_tokens, Some(500));
    }

    #[test]
    fn explicit_max_output_tokens_wins_over_alias() {
        let settings = GenerationSettings::from_raw(&raw(json!({
            "max_tokens": 100,
            "max_output_tokens": 500
        })));
        assert_eq!(settings.max_output_tokens, Some(500));
    }

    #[test]
    fn max_completion_tokens_is_routed_to_text() {
        let settings =
            GenerationSettings::from_raw(&raw(json!({"max_completion_tokens": 256})));
        assert_eq!(settings.text_max_output_tokens, Some(256));
        assert_eq!(settings.max_output_tokens, None);
    }

    #[test]
    fn reasoning_effort_is_synthesized() {
        let settings = GenerationSettings::from_raw(&raw(json!({"reasoning_effort": "low"})));
        assert_eq!(
            settings.reasoning,
            Some(ReasoningConfig::with_effort(ReasoningEffort::Low))
        );
    }

    #[test]
    fn explicit_reasoning_wins_over_flat_effort() {
        let settings = GenerationSettings::from_raw(&raw(json!({
            "reasoning_effort": "low",
            "reasoning": {"effort": "high", "summary": "auto"}
        })));
        let reasoning = settings.reasoning.unwrap();
        assert_eq!(reasoning.effort, Some(ReasoningEffort::High));
        assert_eq!(reasoning.extra.get("summary"), Some(&json!("auto")));
    }

    #[test]
    fn reasoning_object_with_only_unknown_effort_is_absent() {
        let settings =
            GenerationSettings::from_raw(&raw(json!({"reasoning": {"effort": "max"}})));
        assert_eq!(settings.reasoning, None);

        let settings = GenerationSettings::from_raw(&raw(json!({"reasoning": {}})));
        assert_eq!(settings.reasoning, None);
    }

    #[test]
    fn flat_effort_applies_when_reasoning_object_is_emptied() {
        let settings = GenerationSettings::from_raw(&raw(json!({
            "reasoning_effort": "low",
            "reasoning": {"effort": "max"}
        })));
        assert_eq!(
            settings.reasoning,
            Some(ReasoningConfig::with_effort(ReasoningEffort::Low))
        );
    }

    #[test]
    fn reasoning_object_keeps_extras_without_effort() {
        let settings = GenerationSettings::from_raw(&raw(json!({
            "reasoning": {"effort": "max", "summary": "auto"}
        })));
        let reasoning = settings.reasoning.unwrap();
        assert_eq!(reasoning.effort, None);
        assert_eq!(reasoning.extra.get("summary"), Some(&json!("auto")));
    }

    #[test]
    fn reasoning_config_serializes_flat() {
        let mut config = ReasoningConfig::with_effort(ReasoningEffort::Medium);
        config.extra.insert("summary".into(), json!("auto"));
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({"effort": "medium", "summary": "auto"})
        );
    }

    #[test]
    fn caller_mapping_is_not_mutated() {
        let original = raw(json!({"max_tokens": 10, "reasoning_effort": "high", "junk": 1}));
        let copy = original.clone();
        let _ = GenerationSettings::from_raw(&original);
        assert_eq!(original, copy);
    }

    #[test]
    fn option_kinds_round_trip_their_keys() {
        for kind in OptionKind::ALL {
            assert_eq!(OptionKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(OptionKind::from_key("temperature"), None);
    }
}
