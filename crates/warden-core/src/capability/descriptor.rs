//! Capability descriptors and their HMAC signatures

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;

use super::CapabilityError;

type HmacSha256 = Hmac<Sha256>;

pub const MAX_NAME_CHARS: usize = 20;
pub const MAX_DESC_CHARS: usize = 50;
pub const MAX_COST: u32 = 10_000;
pub const MAX_TAGS: usize = 3;

/// What an agent sees before it decides to load a capability
///
/// `cost` is the estimated token price of loading the full details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub cost: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

impl CapabilityDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        desc: impl Into<String>,
        cost: u32,
        tags: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            desc: desc.into(),
            cost,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            sig: None,
        }
    }

    /// Enforce the size limits that keep the manifest small
    pub fn validate(&self) -> Result<(), CapabilityError> {
        let invalid = |reason: String| CapabilityError::InvalidDescriptor {
            id: self.id.clone(),
            reason,
        };
        if self.id.is_empty() {
            return Err(invalid("id must not be empty".into()));
        }
        if self.name.chars().count() > MAX_NAME_CHARS {
            return Err(invalid(format!("name exceeds {} characters", MAX_NAME_CHARS)));
        }
        if self.desc.chars().count() > MAX_DESC_CHARS {
            return Err(invalid(format!("desc exceeds {} characters", MAX_DESC_CHARS)));
        }
        if self.cost > MAX_COST {
            return Err(invalid(format!("cost {} exceeds {}", self.cost, MAX_COST)));
        }
        if self.tags.len() > MAX_TAGS {
            return Err(invalid(format!("more than {} tags", MAX_TAGS)));
        }
        Ok(())
    }

    /// Bytes covered by the signature; tags are not signed
    fn signed_content(&self) -> Vec<u8> {
        format!("{}\n{}\n{}\n{}", self.id, self.name, self.desc, self.cost).into_bytes()
    }

    fn mac(&self, secret: &[u8]) -> Result<HmacSha256, CapabilityError> {
        let mut mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| CapabilityError::InvalidSecret(e.to_string()))?;
        mac.update(&self.signed_content());
        Ok(mac)
    }

    pub fn sign(&mut self, secret: &[u8]) -> Result<(), CapabilityError> {
        let tag = self.mac(secret)?.finalize().into_bytes();
        self.sig = Some(BASE64.encode(tag));
        Ok(())
    }

    /// Constant-time check of `sig`; a missing or malformed signature fails
    pub fn verify(&self, secret: &[u8]) -> bool {
        let Some(encoded) = self.sig.as_deref() else {
            return false;
        };
        let Ok(bytes) = BASE64.decode(encoded) else {
            return false;
        };
        self.mac(secret)
            .is_ok_and(|mac| mac.verify_slice(&bytes).is_ok())
    }

    /// Rough token count of the serialised descriptor, four characters per token
    pub fn token_estimate(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len() / 4).unwrap_or(0)
    }
}

/// Full details, paid for only when an agent calls `discover`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityDetails {
    pub functions: Vec<String>,
    pub setup: Option<String>,
    pub examples: Vec<String>,
    /// Intent name to the tools that serve it
    pub routes: BTreeMap<String, Vec<String>>,
}

/// A descriptor together with its details, as stored in the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    #[serde(flatten)]
    pub descriptor: CapabilityDescriptor,
    #[serde(default)]
    pub details: CapabilityDetails,
}

impl Capability {
    pub fn new(descriptor: CapabilityDescriptor, details: CapabilityDetails) -> Self {
        Self { descriptor, details }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn routes(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(intent, tools)| (intent.to_string(), strings(tools)))
        .collect()
}

/// Capabilities every registry starts with, unsigned
pub fn builtin_capabilities() -> Vec<Capability> {
    vec![
        Capability::new(
            CapabilityDescriptor::new("sentry", "Sentry", "Error tracking: list, analyze, fix", 500, &[
                "error", "debug", "monitor",
            ]),
            CapabilityDetails {
                functions: strings(&[
                    "list_errors(limit=5)",
                    "get_trace(error_id)",
                    "analyze_pattern(timeframe='24h')",
                ]),
                setup: Some("from integrations.sentry import SentryClient".into()),
                examples: strings(&["errors = list_errors(5)", "trace = get_trace('12345')"]),
                routes: routes(&[
                    ("list_errors", &["sentry.list_issues"][..]),
                    ("get_issue_count", &["sentry.list_issues"][..]),
                    ("analyze_error", &["sentry.get_trace", "sentry.analyze"][..]),
                ]),
            },
        ),
        Capability::new(
            CapabilityDescriptor::new("github", "GitHub", "Code: PR, issues, commits", 400, &[
                "code", "git", "pr",
            ]),
            CapabilityDetails {
                functions: strings(&[
                    "create_pr(title, body)",
                    "create_issue(title, body)",
                    "list_commits(branch='main')",
                ]),
                setup: Some("from integrations.github import GitHubClient".into()),
                examples: strings(&["issue = create_issue('Bug report', 'Steps...')"]),
                routes: routes(&[("create_issue", &["github.create_issue"][..])]),
            },
        ),
        Capability::new(
            CapabilityDescriptor::new("codegen", "Codegen", "Code: generate fixes and patches", 250, &[
                "code", "fix",
            ]),
            CapabilityDetails {
                functions: strings(&["generate_fix(error_id)"]),
                setup: None,
                examples: strings(&["patch = generate_fix('E1')"]),
                routes: routes(&[("fix_error", &["code.generate_fix"][..])]),
            },
        ),
        Capability::new(
            CapabilityDescriptor::new("db", "Database", "Query, analyze, optimize SQL", 300, &[
                "sql", "data", "query",
            ]),
            CapabilityDetails::default(),
        ),
        Capability::new(
            CapabilityDescriptor::new("docker", "Docker", "Container: build, run, logs", 350, &[
                "container", "deploy",
            ]),
            CapabilityDetails::default(),
        ),
        Capability::new(
            CapabilityDescriptor::new("aws", "AWS", "Cloud: EC2, S3, Lambda", 600, &[
                "cloud", "deploy", "infra",
            ]),
            CapabilityDetails::default(),
        ),
        Capability::new(
            CapabilityDescriptor::new("metrics", "Metrics", "Monitor: APM, logs, alerts", 450, &[
                "monitor", "apm", "alert",
            ]),
            CapabilityDetails::default(),
        ),
    ]
}
