//! CLI commands

pub mod capabilities;
pub mod doctor;
pub mod intent;
pub mod policy;
pub mod report;
pub mod run;
pub mod session;

use anyhow::Context;
use serde_json::Value;

/// Parse a `--params` argument, which must be a JSON object
pub(crate) fn parse_params(raw: &str) -> anyhow::Result<Value> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("--params is not valid JSON: {raw}"))?;
    if !value.is_object() {
        anyhow::bail!("--params must be a JSON object");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        assert_eq!(parse_params(r#"{"a": 1}"#).unwrap()["a"], 1);
        assert!(parse_params("[1]").is_err());
        assert!(parse_params("{oops").is_err());
    }
}
