//! Configuration validation
//!
//! Validates Nirvana configuration for correctness:
//! - The Todoist section and token are present
//! - Each configured source has a token, a query and a usable URL
//! - Result limits are sane
//! - Mapping keys are non-empty and project mapping keys do not overlap

use super::nirvana_config::NirvanaConfig;
use super::sections::{GitHubSettings, TargetProcessSettings};
use crate::NirvanaError;

/// Largest accepted `limit` for either source
pub const MAX_LIMIT: u32 = 1000;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub section: Option<String>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            section: None,
            field: field.into(),
            message: message.into(),
        }
    }

    fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref section) = self.section {
            write!(f, "{}.{}: {}", section, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a Nirvana configuration
pub fn validate_config(config: &NirvanaConfig) -> ValidationResult {
    let mut errors = Vec::new();

    match &config.todoist {
        None => errors.push(ValidationError::new(
            "todoist",
            "Section is required (or set TODOIST_TOKEN)",
        )),
        Some(todoist) => {
            if todoist.token.trim().is_empty() {
                errors.push(
                    ValidationError::new("token", "Todoist token is required")
                        .in_section("todoist"),
                );
            }
            if !is_http_url(&todoist.url) {
                errors.push(
                    ValidationError::new("url", format!("Invalid Todoist URL: {}", todoist.url))
                        .in_section("todoist"),
                );
            }
        }
    }

    if let Some(ref github) = config.github {
        validate_github(github, &mut errors);
    }

    if let Some(ref tp) = config.target_process {
        validate_target_process(tp, &mut errors);
    }

    if config.github.is_none() && config.target_process.is_none() {
        tracing::warn!("No sources configured, nothing will be mirrored");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_github(github: &GitHubSettings, errors: &mut Vec<ValidationError>) {
    let section = "github";

    if github.token.trim().is_empty() {
        errors.push(
            ValidationError::new("token", "GitHub token is required (or set GH_TOKEN)")
                .in_section(section),
        );
    }
    if !is_http_url(&github.url) {
        errors.push(
            ValidationError::new("url", format!("Invalid GitHub URL: {}", github.url))
                .in_section(section),
        );
    }
    if github.query.trim().is_empty() {
        errors.push(ValidationError::new("query", "Search query cannot be empty").in_section(section));
    }
    validate_limit(github.limit, section, errors);
    validate_label(&github.default_label, section, errors);

    if github.label_map.keys().any(|k| k.is_empty()) {
        errors.push(
            ValidationError::new("labelMap", "Mapping keys cannot be empty").in_section(section),
        );
    }
    if github.project_map.keys().any(|k| k.is_empty()) {
        errors.push(
            ValidationError::new("projectMap", "Mapping keys cannot be empty").in_section(section),
        );
    }
    for (a, b) in overlapping_keys(github.project_map.keys()) {
        errors.push(
            ValidationError::new(
                "projectMap",
                format!(
                    "Keys '{}' and '{}' overlap: every repository matching '{}' also matches '{}'",
                    a, b, b, a
                ),
            )
            .in_section(section),
        );
    }
}

fn validate_target_process(tp: &TargetProcessSettings, errors: &mut Vec<ValidationError>) {
    let section = "targetProcess";

    if tp.token.trim().is_empty() {
        errors.push(
            ValidationError::new("token", "TargetProcess token is required (or set TP_TOKEN)")
                .in_section(section),
        );
    }
    if !is_http_url(&tp.url) {
        errors.push(
            ValidationError::new("url", format!("Invalid TargetProcess URL: '{}'", tp.url))
                .in_section(section),
        );
    }
    if tp.query.trim().is_empty() {
        errors.push(ValidationError::new("query", "Filter query cannot be empty").in_section(section));
    }
    validate_limit(tp.limit, section, errors);
    validate_label(&tp.default_label, section, errors);

    if let Some(ref parent) = tp.default_parent_project {
        if parent.trim().is_empty() {
            errors.push(
                ValidationError::new("defaultParentProject", "Project name cannot be empty")
                    .in_section(section),
            );
        }
    }
}

fn validate_limit(limit: u32, section: &str, errors: &mut Vec<ValidationError>) {
    if limit == 0 || limit > MAX_LIMIT {
        errors.push(
            ValidationError::new(
                "limit",
                format!("Must be between 1 and {}, got {}", MAX_LIMIT, limit),
            )
            .in_section(section),
        );
    }
}

fn validate_label(label: &str, section: &str, errors: &mut Vec<ValidationError>) {
    if label.trim().is_empty() {
        errors.push(
            ValidationError::new("defaultLabel", "Marker label cannot be empty").in_section(section),
        );
    }
}

/// Pairs `(shorter, longer)` of keys where `shorter` is a substring of `longer`
fn overlapping_keys<'a, I>(keys: I) -> Vec<(&'a str, &'a str)>
where
    I: IntoIterator<Item = &'a String>,
{
    let keys: Vec<&str> = keys
        .into_iter()
        .map(String::as_str)
        .filter(|k| !k.is_empty())
        .collect();
    let mut pairs = Vec::new();
    for (i, a) in keys.iter().enumerate() {
        for (j, b) in keys.iter().enumerate() {
            if i != j && b.contains(a) && (a.len() < b.len() || i < j) {
                pairs.push((*a, *b));
            }
        }
    }
    pairs
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Validate configuration and return a Result
pub fn validate_config_result(config: &NirvanaConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        NirvanaError::Validation(errors.iter().map(|e| e.to_string()).collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GitHubSettings, TargetProcessSettings, TodoistSettings};

    fn valid_config() -> NirvanaConfig {
        NirvanaConfig {
            todoist: Some(TodoistSettings::new("td")),
            github: Some(GitHubSettings::new("gh", "is:open assignee:@me")),
            target_process: Some(TargetProcessSettings::new(
                "tp",
                "https://acme.tpondemand.com",
                "EntityState.IsFinal != true",
            )),
        }
    }

    fn fields(result: ValidationResult) -> Vec<String> {
        result
            .unwrap_err()
            .iter()
            .map(|e| format!("{}.{}", e.section.as_deref().unwrap_or(""), e.field))
            .collect()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_todoist_is_required() {
        let mut config = valid_config();
        config.todoist = None;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "todoist");
    }

    #[test]
    fn test_missing_tokens() {
        let mut config = valid_config();
        config.todoist.as_mut().unwrap().token = String::new();
        config.github.as_mut().unwrap().token = "  ".to_string();
        config.target_process.as_mut().unwrap().token = String::new();

        let fields = fields(validate_config(&config));
        assert!(fields.contains(&"todoist.token".to_string()));
        assert!(fields.contains(&"github.token".to_string()));
        assert!(fields.contains(&"targetProcess.token".to_string()));
    }

    #[test]
    fn test_invalid_limits_and_urls() {
        let mut config = valid_config();
        config.github.as_mut().unwrap().limit = 0;
        config.target_process.as_mut().unwrap().url = "acme.tpondemand.com".to_string();

        let fields = fields(validate_config(&config));
        assert_eq!(fields, vec!["github.limit", "targetProcess.url"]);
    }

    #[test]
    fn test_overlapping_project_map_keys() {
        let mut config = valid_config();
        let github = config.github.as_mut().unwrap();
        github
            .project_map
            .insert("acme/".to_string(), "Acme".to_string());
        github
            .project_map
            .insert("acme/api".to_string(), "API".to_string());
        github
            .project_map
            .insert("other/".to_string(), "Other".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("'acme/' and 'acme/api'"));
    }

    #[test]
    fn test_overlapping_keys_pairs() {
        let keys = vec!["a".to_string(), "ab".to_string(), "c".to_string()];
        assert_eq!(overlapping_keys(keys.iter()), vec![("a", "ab")]);
    }

    #[test]
    fn test_result_wraps_messages() {
        let config = NirvanaConfig::new();
        match validate_config_result(&config) {
            Err(NirvanaError::Validation(messages)) => {
                assert!(messages[0].starts_with("todoist:"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
