use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Endpoints that no exemption rule may ever cover
pub const PROTECTED_PATHS: &[&str] = &["/stream"];

/// Path matcher used by exemption rules
///
/// Text forms:
/// - `/get-token` exact path
/// - `/static/*` every path under the prefix
/// - `*.ts` every path with the suffix
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathPattern::Suffix(suffix) => path.ends_with(suffix.as_str()),
        }
    }
}

impl FromStr for PathPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Err(format!("Invalid path pattern '{s}'"));
        }

        let pattern = if let Some(suffix) = s.strip_prefix('*') {
            PathPattern::Suffix(suffix.to_string())
        } else if let Some(prefix) = s.strip_suffix('*') {
            PathPattern::Prefix(prefix.to_string())
        } else {
            PathPattern::Exact(s.to_string())
        };

        match &pattern {
            PathPattern::Exact(p) | PathPattern::Prefix(p) | PathPattern::Suffix(p)
                if p.contains('*') =>
            {
                Err(format!("Invalid path pattern '{s}': only one leading or trailing '*' allowed"))
            }
            PathPattern::Exact(p) | PathPattern::Prefix(p) if !p.starts_with('/') => {
                Err(format!("Invalid path pattern '{s}': must start with '/'"))
            }
            _ => Ok(pattern),
        }
    }
}

impl TryFrom<String> for PathPattern {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PathPattern> for String {
    fn from(value: PathPattern) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Exact(p) => write!(f, "{p}"),
            PathPattern::Prefix(p) => write!(f, "{p}*"),
            PathPattern::Suffix(p) => write!(f, "*{p}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExemptionScope {
    /// Skip gating entirely, even when a token is presented
    Always,
    /// Skip gating only for requests that carry no token
    Anonymous,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExemptionRule {
    pub pattern: PathPattern,
    pub scope: ExemptionScope,
    pub rationale: String,
}

/// Ordered table of exemption rules, first match wins
#[derive(Debug, Clone)]
pub struct ExemptionPolicy {
    rules: Vec<ExemptionRule>,
}

impl ExemptionPolicy {
    pub fn new(rules: Vec<ExemptionRule>) -> Result<Self> {
        for rule in &rules {
            for protected in PROTECTED_PATHS {
                if rule.pattern.matches(protected)
                    || rule.pattern.matches(&format!("{protected}/"))
                {
                    return Err(anyhow!(
                        "Exemption rule '{}' would expose protected endpoint {protected}",
                        rule.pattern
                    ));
                }
            }
        }

        Ok(Self { rules })
    }

    /// Build from configured patterns. Known defaults keep their rationale.
    pub fn from_patterns(always: &[PathPattern], anonymous: &[PathPattern]) -> Result<Self> {
        let rule = |pattern: &PathPattern, scope| ExemptionRule {
            pattern: pattern.clone(),
            scope,
            rationale: default_rationale(pattern)
                .unwrap_or("configured exemption")
                .to_string(),
        };

        let rules = always
            .iter()
            .map(|p| rule(p, ExemptionScope::Always))
            .chain(anonymous.iter().map(|p| rule(p, ExemptionScope::Anonymous)))
            .collect();

        Self::new(rules)
    }

    pub fn rules(&self) -> &[ExemptionRule] {
        &self.rules
    }

    /// First rule covering `path`. Paths with dot or empty segments never match.
    pub fn classify(&self, path: &str) -> Option<&ExemptionRule> {
        if has_unsafe_segment(path) {
            return None;
        }
        self.rules.iter().find(|rule| rule.pattern.matches(path))
    }
}

impl Default for ExemptionPolicy {
    fn default() -> Self {
        Self {
            rules: default_always_exempt()
                .iter()
                .map(|p| (p, ExemptionScope::Always))
                .chain(
                    default_anonymous_exempt()
                        .iter()
                        .map(|p| (p, ExemptionScope::Anonymous)),
                )
                .map(|(pattern, scope)| ExemptionRule {
                    pattern: pattern.clone(),
                    scope,
                    rationale: default_rationale(pattern)
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect(),
        }
    }
}

pub fn default_always_exempt() -> Vec<PathPattern> {
    vec![
        PathPattern::Exact("/".to_string()),
        PathPattern::Exact("/get-token".to_string()),
    ]
}

pub fn default_anonymous_exempt() -> Vec<PathPattern> {
    vec![PathPattern::Prefix("/static/".to_string())]
}

fn default_rationale(pattern: &PathPattern) -> Option<&'static str> {
    match pattern {
        PathPattern::Exact(p) if p == "/" => Some("liveness probe, static payload"),
        PathPattern::Exact(p) if p == "/get-token" => {
            Some("token issuance, a client cannot hold a token yet")
        }
        PathPattern::Prefix(p) if p == "/static/" => {
            Some("public assets; manifests live outside the static directory")
        }
        _ => None,
    }
}

fn has_unsafe_segment(path: &str) -> bool {
    path.contains("//")
        || path.split('/').any(|segment| {
            matches!(
                segment.to_ascii_lowercase().as_str(),
                "." | ".." | "%2e" | "%2e%2e" | ".%2e" | "%2e."
            )
        })
}
