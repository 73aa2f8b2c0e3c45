//! JSON extraction from LLM replies
//!
//! Models wrap JSON in markdown fences or surround it with prose. These
//! helpers find the object and hand it to serde.

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

const MAX_RAW_IN_ERROR: usize = 200;

/// Locate the JSON object in an LLM reply
///
/// Prefers the content of a ```json fence when present; otherwise takes the
/// span from the first `{` to the last `}`.
pub fn extract_json(response: &str) -> Result<&str> {
    let response = response.trim();

    let fence = Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```")?;
    if let Some(inner) = fence.captures(response).and_then(|c| c.get(1)) {
        return Ok(inner.as_str());
    }

    match (response.find('{'), response.rfind('}')) {
        (Some(s), Some(e)) if s < e => Ok(&response[s..=e]),
        _ => Err(Error::InvalidData(format!(
            "No JSON found in LLM response | Raw: {}",
            truncate(response)
        ))),
    }
}

/// Extract and deserialize the JSON object in an LLM reply
pub fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T> {
    let json_str = extract_json(response)?;
    serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid JSON from LLM: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })
}

/// Shorten raw model output for error messages (char-safe)
pub fn truncate(raw: &str) -> String {
    if raw.chars().count() > MAX_RAW_IN_ERROR {
        let head: String = raw.chars().take(MAX_RAW_IN_ERROR).collect();
        format!("{}...", head)
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Directive {
        action: String,
    }

    #[test]
    fn test_bare_json() {
        let d: Directive = parse_json(r#"{"action": "respond"}"#).unwrap();
        assert_eq!(d.action, "respond");
    }

    #[test]
    fn test_json_with_surrounding_prose() {
        let d: Directive =
            parse_json("Claro! Aqui está:\n{\"action\": \"execute_tool\"}\nAté mais.").unwrap();
        assert_eq!(d.action, "execute_tool");
    }

    #[test]
    fn test_fenced_json_preferred_over_prose_braces() {
        let reply = "Use {chaves} assim:\n```json\n{\"action\": \"respond\"}\n```\nFim {x}";
        assert_eq!(extract_json(reply).unwrap(), "{\"action\": \"respond\"}");
    }

    #[test]
    fn test_nested_object_in_fence() {
        let reply = "```json\n{\"action\": \"respond\", \"data\": {\"a\": {\"b\": 1}}}\n```";
        let value: serde_json::Value = parse_json(reply).unwrap();
        assert_eq!(value["data"]["a"]["b"], 1);
    }

    #[test]
    fn test_no_json() {
        let err = extract_json("Não sei responder.").unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_invalid_json() {
        let result: Result<Directive> = parse_json("{action: respond}");
        assert!(result.is_err());
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let long = "ç".repeat(500);
        let t = truncate(&long);
        assert!(t.ends_with("..."));
        assert_eq!(t.chars().count(), MAX_RAW_IN_ERROR + 3);
    }
}
