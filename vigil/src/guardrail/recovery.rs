//! Raw-text verdict recovery.
//!
//! When the schema-constrained classifier call fails, the model is
//! re-invoked without constraints and its free-form reply is mined for a
//! verdict in two steps: balanced-brace JSON extraction first, keyword
//! inference second. Both steps are pure functions over the reply text.

use super::SecurityVerdict;
use serde_json::Value;
use tracing::debug;

/// Substrings whose presence in the lower-cased reply indicates a block.
/// Checked before [`SAFE_INDICATORS`]; a block match always wins.
const BLOCK_INDICATORS: [&str; 8] = [
    "block",
    "violat",
    "threat",
    "danger",
    "malicious",
    "unsafe",
    "reject",
    "deny",
];

/// Substrings whose presence in the lower-cased reply indicates safety.
const SAFE_INDICATORS: [&str; 7] = [
    "safe",
    "benign",
    "allow",
    "harmless",
    "innocuous",
    "no threat",
    "no violation",
];

/// Outcome of mining a free-form classifier reply for a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// A JSON object carrying `is_safe` was extracted and coerced.
    Extracted(SecurityVerdict),
    /// Indicator keywords decided the verdict.
    Inferred(SecurityVerdict),
    /// Neither extraction nor inference resolved anything.
    Unresolved,
}

/// Mine a free-form classifier reply for a verdict.
///
/// JSON extraction is attempted first; its result is final and is not
/// re-run through keyword inference. Only when extraction yields nothing
/// is the full text scanned for indicator keywords.
#[must_use]
pub fn recover(raw_text: &str) -> RecoveryOutcome {
    if let Some(object) = extract_first_json_object(raw_text) {
        debug!("recovered verdict from embedded JSON object");
        return RecoveryOutcome::Extracted(verdict_from_extracted(&object));
    }

    match infer_from_keywords(raw_text) {
        KeywordInference::Unsafe => RecoveryOutcome::Inferred(SecurityVerdict::inferred_unsafe()),
        KeywordInference::Safe => RecoveryOutcome::Inferred(SecurityVerdict::inferred_safe()),
        KeywordInference::Undecided => RecoveryOutcome::Unresolved,
    }
}

/// Locate and parse the first balanced `{...}` span in `text`.
///
/// Scans from the first `{`, tracking brace depth; the span that returns
/// the depth to zero is the only candidate. It is accepted only if it
/// parses as JSON and the resulting object contains an `is_safe` key.
/// Later `{` occurrences are never tried, and braces inside string
/// literals count toward the depth — a known limitation of the scan.
#[must_use]
pub fn extract_first_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let mut depth = 0usize;

    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let candidate = &text[start..=start + offset];
                    let value: Value = serde_json::from_str(candidate).ok()?;
                    return value.get("is_safe").is_some().then_some(value);
                }
            }
            _ => {}
        }
    }

    None
}

/// Verdict leaning inferred from indicator keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordInference {
    /// A block indicator was found.
    Unsafe,
    /// A safe indicator was found (and no block indicator).
    Safe,
    /// Neither indicator set matched.
    Undecided,
}

/// Scan the lower-cased reply for indicator substrings.
///
/// Block indicators are checked first and take priority over safe
/// indicators.
#[must_use]
pub fn infer_from_keywords(text: &str) -> KeywordInference {
    let lowered = text.to_lowercase();

    if BLOCK_INDICATORS.iter().any(|kw| lowered.contains(kw)) {
        return KeywordInference::Unsafe;
    }
    if SAFE_INDICATORS.iter().any(|kw| lowered.contains(kw)) {
        return KeywordInference::Safe;
    }
    KeywordInference::Undecided
}

/// Coerce an extracted JSON object into a verdict.
///
/// Missing or mistyped fields fall back to documented defaults: `is_safe`
/// true, `violated_rule` and `reason` empty, `risk_score` 5. Out-of-range
/// risk scores are clamped into [1, 10].
#[must_use]
pub fn verdict_from_extracted(object: &Value) -> SecurityVerdict {
    SecurityVerdict {
        is_safe: object.get("is_safe").and_then(Value::as_bool).unwrap_or(true),
        violated_rule: object
            .get("violated_rule")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        reason: object
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        risk_score: object
            .get("risk_score")
            .and_then(Value::as_i64)
            .unwrap_or(5)
            .clamp(1, 10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrail::INFERRED_RULE;

    #[test]
    fn test_extracts_object_after_leading_prose() {
        let text = r#"Sure, here is my assessment:
            {"is_safe": false, "violated_rule": "PII", "reason": "Card number.", "risk_score": 8}
            Let me know if you need more."#;

        let object = extract_first_json_object(text).unwrap();
        assert_eq!(object["is_safe"], false);
        assert_eq!(object["violated_rule"], "PII");
        assert_eq!(object["risk_score"], 8);
    }

    #[test]
    fn test_extracts_nested_object() {
        let text = r#"{"is_safe": true, "detail": {"nested": 1}, "risk_score": 2}"#;
        let object = extract_first_json_object(text).unwrap();
        assert_eq!(object["detail"]["nested"], 1);
    }

    #[test]
    fn test_first_candidate_without_is_safe_yields_nothing() {
        // The first balanced span parses but lacks is_safe; the real
        // verdict later in the text is never tried.
        let text = r#"Example: {"foo": 1}. Verdict: {"is_safe": false, "risk_score": 9}"#;
        assert!(extract_first_json_object(text).is_none());
    }

    #[test]
    fn test_unparseable_first_candidate_yields_nothing() {
        let text = r#"{not json} {"is_safe": true}"#;
        assert!(extract_first_json_object(text).is_none());
    }

    #[test]
    fn test_unbalanced_braces_yield_nothing() {
        assert!(extract_first_json_object(r#"{"is_safe": true"#).is_none());
        assert!(extract_first_json_object("no braces at all").is_none());
    }

    #[test]
    fn test_block_indicator_infers_unsafe() {
        assert_eq!(
            infer_from_keywords("This request is clearly malicious."),
            KeywordInference::Unsafe
        );
        assert_eq!(
            infer_from_keywords("I would REJECT this input."),
            KeywordInference::Unsafe
        );
    }

    #[test]
    fn test_safe_indicator_infers_safe() {
        assert_eq!(
            infer_from_keywords("this looks safe and benign"),
            KeywordInference::Safe
        );
        assert_eq!(
            infer_from_keywords("Completely harmless question."),
            KeywordInference::Safe
        );
    }

    #[test]
    fn test_block_indicator_wins_over_safe() {
        assert_eq!(
            infer_from_keywords("It may look safe but it is a threat."),
            KeywordInference::Unsafe
        );
        // "unsafe" contains "safe"; the block list is checked first.
        assert_eq!(
            infer_from_keywords("the input is unsafe"),
            KeywordInference::Unsafe
        );
    }

    #[test]
    fn test_no_indicator_is_undecided() {
        assert_eq!(
            infer_from_keywords("I cannot evaluate this."),
            KeywordInference::Undecided
        );
    }

    #[test]
    fn test_extracted_coercion_defaults() {
        let object = serde_json::json!({"is_safe": false});
        let verdict = verdict_from_extracted(&object);

        assert!(!verdict.is_safe);
        assert!(verdict.violated_rule.is_empty());
        assert!(verdict.reason.is_empty());
        assert_eq!(verdict.risk_score, 5);
    }

    #[test]
    fn test_extracted_non_bool_is_safe_defaults_true() {
        let object = serde_json::json!({"is_safe": "nope", "risk_score": 3});
        let verdict = verdict_from_extracted(&object);
        assert!(verdict.is_safe);
        assert_eq!(verdict.risk_score, 3);
    }

    #[test]
    fn test_extracted_risk_score_clamped() {
        let object = serde_json::json!({"is_safe": false, "risk_score": 99});
        assert_eq!(verdict_from_extracted(&object).risk_score, 10);

        let object = serde_json::json!({"is_safe": false, "risk_score": -3});
        assert_eq!(verdict_from_extracted(&object).risk_score, 1);
    }

    #[test]
    fn test_recover_prefers_extraction_over_keywords() {
        // Text contains block indicators, but the embedded object says safe;
        // extraction is final and is not re-run through inference.
        let text = r#"This is dangerous! {"is_safe": true, "violated_rule": "", "reason": "fine", "risk_score": 1}"#;

        match recover(text) {
            RecoveryOutcome::Extracted(verdict) => {
                assert!(verdict.is_safe);
                assert_eq!(verdict.risk_score, 1);
            }
            other => panic!("expected extraction, got {other:?}"),
        }
    }

    #[test]
    fn test_recover_falls_back_to_inference() {
        match recover("Plain text verdict: malicious input, do not forward.") {
            RecoveryOutcome::Inferred(verdict) => {
                assert!(!verdict.is_safe);
                assert_eq!(verdict.violated_rule, INFERRED_RULE);
                assert_eq!(verdict.risk_score, 7);
            }
            other => panic!("expected inference, got {other:?}"),
        }
    }

    #[test]
    fn test_recover_unresolved() {
        assert_eq!(recover("I have nothing to add."), RecoveryOutcome::Unresolved);
    }
}
