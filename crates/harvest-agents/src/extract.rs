//! Pulling a validation analysis out of untrusted service text.
//!
//! Three pure stages, each returning a [`ResponseDefect`] instead of panicking:
//! [`extract_json_object`] finds the candidate, [`parse_json`] decodes it and
//! [`validate_analysis`] checks it against the expected schema.

use harvest_core::{ChecklistOutcome, ChecklistStatus, ValidationAnalysis, Verdict};
use serde_json::Value;
use thiserror::Error;

/// What was wrong with a service answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResponseDefect {
    #[error("no JSON object in response")]
    NoJsonObject,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

/// The substring from the first `{` to the last `}`, inclusive.
pub fn extract_json_object(raw: &str) -> Result<&str, ResponseDefect> {
    let start = raw.find('{').ok_or(ResponseDefect::NoJsonObject)?;
    let end = raw.rfind('}').ok_or(ResponseDefect::NoJsonObject)?;
    if end < start {
        return Err(ResponseDefect::NoJsonObject);
    }
    Ok(&raw[start..=end])
}

/// Strict JSON decoding of an extracted candidate.
pub fn parse_json(candidate: &str) -> Result<Value, ResponseDefect> {
    serde_json::from_str(candidate).map_err(|e| ResponseDefect::InvalidJson(e.to_string()))
}

/// Check `value` against the analysis schema and build a non-fallback analysis.
pub fn validate_analysis(value: &Value) -> Result<ValidationAnalysis, ResponseDefect> {
    let object = value
        .as_object()
        .ok_or_else(|| violation("top level is not an object"))?;

    let verdict = object
        .get("verdict")
        .and_then(Value::as_str)
        .and_then(Verdict::parse)
        .ok_or_else(|| violation("verdict must be one of APPROVE, REVIEW, REJECT"))?;

    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| (0.0..=1.0).contains(c))
        .ok_or_else(|| violation("confidence must be a number in [0, 1]"))?;

    let checklist = object
        .get("checklist")
        .and_then(Value::as_array)
        .ok_or_else(|| violation("checklist must be an array"))?
        .iter()
        .enumerate()
        .map(|(index, entry)| checklist_outcome(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    let missing = object
        .get("missing")
        .and_then(Value::as_array)
        .ok_or_else(|| violation("missing must be an array"))?
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| violation("missing must contain only strings"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidationAnalysis {
        verdict,
        confidence,
        checklist,
        missing,
        fallback: false,
    })
}

fn checklist_outcome(index: usize, entry: &Value) -> Result<ChecklistOutcome, ResponseDefect> {
    let field = |name: &str| {
        entry
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| violation(&format!("checklist[{}].{} must be a string", index, name)))
    };

    let item = field("item")?.to_string();
    let status = ChecklistStatus::parse(field("status")?).ok_or_else(|| {
        violation(&format!(
            "checklist[{}].status must be one of PASS, FAIL, MISSING",
            index
        ))
    })?;
    let reason = field("reason")?.to_string();

    Ok(ChecklistOutcome { item, status, reason })
}

fn violation(message: &str) -> ResponseDefect {
    ResponseDefect::SchemaViolation(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID: &str = r#"{"verdict":"APPROVE","confidence":0.9,"checklist":[{"item":"Foto","status":"PASS","reason":"ok"}],"missing":[]}"#;

    #[test]
    fn test_extract_tolerates_surrounding_prose() {
        let raw = format!("Claro! Segue a análise:\n```json\n{}\n```\nAbraço.", VALID);
        assert_eq!(extract_json_object(&raw).unwrap(), VALID);
    }

    #[test]
    fn test_extract_without_braces() {
        assert_eq!(extract_json_object("no json here"), Err(ResponseDefect::NoJsonObject));
        assert_eq!(extract_json_object("} backwards {"), Err(ResponseDefect::NoJsonObject));
        assert_eq!(extract_json_object(""), Err(ResponseDefect::NoJsonObject));
    }

    #[test]
    fn test_truncated_json_fails_to_parse() {
        let raw = r#"{"verdict":"APPROVE","checklist":[{"item":"x"}"#;
        let candidate = extract_json_object(raw).unwrap();
        assert!(matches!(parse_json(candidate), Err(ResponseDefect::InvalidJson(_))));
    }

    #[test]
    fn test_valid_analysis() {
        let value = parse_json(VALID).unwrap();
        let analysis = validate_analysis(&value).unwrap();

        assert_eq!(analysis.verdict, Verdict::Approve);
        assert_eq!(analysis.confidence, 0.9);
        assert_eq!(analysis.checklist[0].status, ChecklistStatus::Pass);
        assert!(analysis.missing.is_empty());
        assert!(!analysis.fallback);
    }

    #[test]
    fn test_schema_violations() {
        let cases = [
            json!([1, 2]),
            json!({"verdict":"MAYBE","confidence":0.5,"checklist":[],"missing":[]}),
            json!({"verdict":"REVIEW","confidence":1.5,"checklist":[],"missing":[]}),
            json!({"verdict":"REVIEW","confidence":"high","checklist":[],"missing":[]}),
            json!({"verdict":"REVIEW","confidence":0.5,"checklist":{},"missing":[]}),
            json!({"verdict":"REVIEW","confidence":0.5,"checklist":[{"item":"a","status":"OK","reason":""}],"missing":[]}),
            json!({"verdict":"REVIEW","confidence":0.5,"checklist":[{"item":"a","status":"PASS"}],"missing":[]}),
            json!({"verdict":"REVIEW","confidence":0.5,"checklist":[],"missing":[3]}),
            json!({"verdict":"REVIEW","confidence":0.5,"checklist":[]}),
        ];

        for case in cases {
            assert!(
                matches!(validate_analysis(&case), Err(ResponseDefect::SchemaViolation(_))),
                "accepted {case}"
            );
        }
    }
}
