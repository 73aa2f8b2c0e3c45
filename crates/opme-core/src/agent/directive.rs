//! Directives the model emits during planning and analysis

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ai::parsing::parse_json;
use crate::error::Result;

/// Confidence when a respond directive omits it
pub const DEFAULT_CONFIDENCE: f64 = 0.9;

/// Confidence of an analysis reply that was not a respond directive
pub const FALLBACK_CONFIDENCE: f64 = 0.7;

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

/// What the model asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Directive {
    ExecuteTool {
        tool: String,
        #[serde(default)]
        params: Value,
        #[serde(default)]
        reason: Option<String>,
    },
    Respond {
        data: Value,
        #[serde(default = "default_confidence")]
        confidence: f64,
    },
}

/// Parse a directive out of a model reply (fences and prose tolerated)
pub fn parse_directive(raw: &str) -> Result<Directive> {
    parse_json(raw)
}

/// The agent's final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub data: Value,
    pub confidence: f64,
}

impl AgentResponse {
    /// Wrap free text the model returned instead of a directive
    pub fn from_text(text: &str) -> Self {
        Self {
            data: json!({ "resumo": text.trim() }),
            confidence: FALLBACK_CONFIDENCE,
        }
    }

    /// The human-readable summary, when the model provided one
    pub fn summary(&self) -> Option<&str> {
        self.data.get("resumo").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_execute_tool() {
        let raw = r#"Vou buscar as faturas.
```json
{"action": "execute_tool", "tool": "list_invoices", "params": {"overdue_only": true}, "reason": "usuário pediu vencidas"}
```"#;
        let directive = parse_directive(raw).unwrap();
        assert_eq!(
            directive,
            Directive::ExecuteTool {
                tool: "list_invoices".into(),
                params: json!({"overdue_only": true}),
                reason: Some("usuário pediu vencidas".into()),
            }
        );
    }

    #[test]
    fn test_execute_tool_without_params() {
        let directive =
            parse_directive(r#"{"action":"execute_tool","tool":"financial_overview"}"#).unwrap();
        match directive {
            Directive::ExecuteTool { params, reason, .. } => {
                assert!(params.is_null());
                assert!(reason.is_none());
            }
            other => panic!("unexpected directive: {:?}", other),
        }
    }

    #[test]
    fn test_respond_default_confidence() {
        let directive =
            parse_directive(r#"{"action":"respond","data":{"resumo":"Tudo em dia."}}"#).unwrap();
        assert_eq!(
            directive,
            Directive::Respond {
                data: json!({"resumo": "Tudo em dia."}),
                confidence: DEFAULT_CONFIDENCE,
            }
        );
    }

    #[test]
    fn test_unknown_action_is_error() {
        assert!(parse_directive(r#"{"action":"dance"}"#).is_err());
        assert!(parse_directive("sem json aqui").is_err());
        assert!(parse_directive(r#"{"action":"respond"}"#).is_err());
    }

    #[test]
    fn test_response_from_text() {
        let response = AgentResponse::from_text("  Três faturas vencidas.\n");
        assert_eq!(response.summary(), Some("Três faturas vencidas."));
        assert_eq!(response.confidence, FALLBACK_CONFIDENCE);
    }
}
