//! Prompt library for the finance agent
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/opme/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Each prompt file carries YAML frontmatter followed by `# System` and
//! `# User` sections. Variables use `{{name}}`; `{{#if name}}...{{/if}}`
//! blocks are dropped when the variable is missing or empty.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const FINANCE_AGENT_PLAN: &str = include_str!("../../../prompts/finance_agent_plan.md");
    pub const FINANCE_AGENT_ANALYZE: &str =
        include_str!("../../../prompts/finance_agent_analyze.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Decide between answering directly and running one tool
    FinanceAgentPlan,
    /// Turn tool results into the final answer
    FinanceAgentAnalyze,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinanceAgentPlan => "finance_agent_plan",
            Self::FinanceAgentAnalyze => "finance_agent_analyze",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[Self::FinanceAgentPlan, Self::FinanceAgentAnalyze]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::FinanceAgentPlan => defaults::FINANCE_AGENT_PLAN,
            Self::FinanceAgentAnalyze => defaults::FINANCE_AGENT_ANALYZE,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PromptId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::NotFound(format!("Unknown prompt: {}", s)))
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    #[serde(default)]
    pub description: String,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// The prompt content (system + user sections)
    pub content: String,
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the system section (empty when absent)
    pub fn render_system(&self, vars: &HashMap<&str, &str>) -> String {
        self.system_section()
            .map(|s| substitute(s, vars))
            .unwrap_or_default()
    }

    /// Render the user section, or the whole prompt when it has no sections
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        match self.user_section() {
            Some(user) => substitute(user, vars),
            None => substitute(&self.content, vars),
        }
    }
}

/// Prompt library for loading and caching prompts
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Create a prompt library with the default override directory
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt by ID, loading from override or default
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        if !self.cache.contains_key(&id) {
            let prompt = self.load(id)?;
            self.cache.insert(id, prompt);
        }
        self.cache
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Prompt {} not cached", id.as_str())))
    }

    fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(ref override_dir) = self.override_dir {
            let override_path = override_dir.join(format!("{}.md", id.as_str()));
            if override_path.exists() {
                let content = fs::read_to_string(&override_path).map_err(|e| {
                    Error::Config(format!("Failed to read prompt override: {}", e))
                })?;
                let (metadata, body) = parse_prompt(&content)?;
                tracing::debug!(prompt = id.as_str(), path = %override_path.display(), "Using prompt override");
                return Ok(Prompt {
                    metadata,
                    content: body,
                    is_override: true,
                    override_path: Some(override_path),
                });
            }
        }

        let (metadata, body) = parse_prompt(id.default_content())?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        })
    }

    /// List all prompts with their override status
    pub fn list(&mut self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let has_override = self.has_override(id);
                let override_path = if has_override {
                    self.override_dir
                        .as_ref()
                        .map(|d| d.join(format!("{}.md", id.as_str())))
                } else {
                    None
                };
                let prompt = self.get(id).ok();
                PromptInfo {
                    id: id.as_str().to_string(),
                    version: prompt.map(|p| p.metadata.version).unwrap_or(0),
                    description: prompt
                        .map(|p| p.metadata.description.clone())
                        .unwrap_or_default(),
                    has_override,
                    override_path,
                }
            })
            .collect()
    }

    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_dir
            .as_ref()
            .is_some_and(|d| d.join(format!("{}.md", id.as_str())).exists())
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Clear the cache (after editing override files)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: String,
    pub version: u32,
    pub description: String,
    pub has_override: bool,
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("opme").join("prompts").join("overrides"))
}

/// Split a prompt file into frontmatter metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    let rest = content.strip_prefix("---").ok_or_else(|| {
        Error::InvalidData("Prompt must start with YAML frontmatter (---)".into())
    })?;

    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

/// Replace `{{var}}` placeholders and resolve conditional blocks
fn substitute(template: &str, vars: &HashMap<&str, &str>) -> String {
    // Conditionals first so substituted values can't inject markers
    let mut result = remove_unmatched_conditionals(template, vars);
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}

/// Keep `{{#if var}}...{{/if}}` bodies whose variable is non-empty, drop the rest
fn remove_unmatched_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    while let Some(if_start) = result.find("{{#if ") {
        let var_start = if_start + 6;
        let Some(var_end) = result[var_start..].find("}}") else {
            break;
        };
        let var_name = &result[var_start..var_start + var_end];
        let block_start = var_start + var_end + 2;

        let Some(endif_pos) = result[block_start..].find("{{/if}}") else {
            break;
        };
        let block_content = &result[block_start..block_start + endif_pos];
        let full_end = block_start + endif_pos + 7;

        let keep = vars.get(var_name).is_some_and(|v| !v.is_empty());
        result = if keep {
            format!("{}{}{}", &result[..if_start], block_content, &result[full_end..])
        } else {
            format!("{}{}", &result[..if_start], &result[full_end..])
        };
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prompt() {
        let content = r#"---
id: test_prompt
version: 2
description: Test
---

# System
Sistema.

# User
Tarefa: {{tarefa}}.
"#;

        let (metadata, body) = parse_prompt(content).unwrap();
        assert_eq!(metadata.id, "test_prompt");
        assert_eq!(metadata.version, 2);
        assert!(body.contains("# System"));
        assert!(body.contains("# User"));
    }

    #[test]
    fn test_parse_prompt_requires_frontmatter() {
        assert!(parse_prompt("# System\nNo frontmatter").is_err());
        assert!(parse_prompt("---\nid: x\nversion: 1\n# System").is_err());
    }

    #[test]
    fn test_extract_section() {
        let content = "# System\nSystem content.\n\n# User\nUser content.";
        assert_eq!(extract_section(content, "# System"), Some("System content."));
        assert_eq!(extract_section(content, "# User"), Some("User content."));
        assert_eq!(extract_section(content, "# Examples"), None);
    }

    #[test]
    fn test_conditional_blocks() {
        let content = "Início{{#if contexto}}\nContexto: {{contexto}}{{/if}}\nFim";

        let mut vars = HashMap::new();
        vars.insert("contexto", "cliente 42");
        let rendered = substitute(content, &vars);
        assert!(rendered.contains("Contexto: cliente 42"));

        let empty: HashMap<&str, &str> = HashMap::new();
        let rendered = substitute(content, &empty);
        assert!(!rendered.contains("Contexto:"));
        assert!(rendered.contains("Início"));
        assert!(rendered.contains("Fim"));

        let mut blank = HashMap::new();
        blank.insert("contexto", "");
        assert!(!substitute(content, &blank).contains("Contexto:"));
    }

    #[test]
    fn test_value_with_marker_not_interpreted() {
        let mut vars = HashMap::new();
        vars.insert("tarefa", "{{#if x}}ignore{{/if}}");
        let rendered = substitute("T: {{tarefa}}", &vars);
        assert_eq!(rendered, "T: {{#if x}}ignore{{/if}}");
    }

    #[test]
    fn test_default_prompts_parse_and_have_sections() {
        let mut lib = PromptLibrary::embedded_only();
        for id in PromptId::all() {
            let prompt = lib.get(*id).unwrap();
            assert_eq!(prompt.metadata.id, id.as_str());
            assert!(!prompt.is_override);
            assert!(prompt.system_section().is_some(), "{} lacks # System", id.as_str());
            assert!(prompt.user_section().is_some(), "{} lacks # User", id.as_str());
        }
    }

    #[test]
    fn test_override_dir_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("finance_agent_plan.md"),
            "---\nid: finance_agent_plan\nversion: 99\n---\n# System\nCustom\n# User\n{{tarefa}}",
        )
        .unwrap();

        let mut lib = PromptLibrary::with_override_dir(dir.path().to_path_buf());
        assert!(lib.has_override(PromptId::FinanceAgentPlan));
        assert!(!lib.has_override(PromptId::FinanceAgentAnalyze));

        let prompt = lib.get(PromptId::FinanceAgentPlan).unwrap();
        assert!(prompt.is_override);
        assert_eq!(prompt.metadata.version, 99);

        let listing = lib.list();
        assert_eq!(listing.len(), 2);
        assert!(listing[0].has_override);
        assert!(listing[0].override_path.is_some());
        assert!(!listing[1].has_override);
    }

    #[test]
    fn test_prompt_id_from_str() {
        assert_eq!(
            "finance_agent_analyze".parse::<PromptId>().unwrap(),
            PromptId::FinanceAgentAnalyze
        );
        assert!("explore_agent".parse::<PromptId>().is_err());
    }
}
