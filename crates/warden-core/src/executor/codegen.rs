//! Intent-to-code generation

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{WardenError, WardenResult};

/// Produces the code string executed for an intent
#[cfg_attr(test, mockall::automock)]
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, intent: &str, params: &Value) -> WardenResult<String>;
}

const LIST_ERRORS: &str = r#"import json
project = "{project}"
errors = [{"id": n, "project": project, "title": "Error " + str(n)} for n in range(1, 6)]
print(json.dumps(errors))
"#;

const ANALYZE_ERROR: &str = r#"import json
error_id = "{error_id}"
severity = "high" if error_id.upper().startswith("E") else "low"
print(json.dumps({"error_id": error_id, "severity": severity}))
"#;

const GET_ISSUE_COUNT: &str = r#"import json
project = "{project}"
print(json.dumps({"project": project, "count": len(project)}))
"#;

const COMPUTE: &str = r#"import json
import math
value = float("{value}")
print(json.dumps({"value": value, "sqrt": math.sqrt(abs(value))}))
"#;

/// Per-intent templates with `{key}` placeholders
///
/// Only string parameters are substituted; any other placeholder is left
/// as written.
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    templates: BTreeMap<String, String>,
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::empty()
            .with_template("list_errors", LIST_ERRORS)
            .with_template("analyze_error", ANALYZE_ERROR)
            .with_template("get_issue_count", GET_ISSUE_COUNT)
            .with_template("compute", COMPUTE)
    }
}

impl TemplateGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator with no templates at all
    pub fn empty() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    pub fn with_template(mut self, intent: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(intent.into(), template.into());
        self
    }

    pub fn intents(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

impl CodeGenerator for TemplateGenerator {
    fn generate(&self, intent: &str, params: &Value) -> WardenResult<String> {
        let template = self
            .templates
            .get(intent)
            .ok_or_else(|| WardenError::invalid_input(format!("Unknown intent: {}", intent)))?;

        let mut code = template.clone();
        if let Some(params) = params.as_object() {
            for (key, value) in params {
                if let Some(value) = value.as_str() {
                    code = code.replace(&format!("{{{}}}", key), value);
                }
            }
        }
        Ok(code)
    }
}
