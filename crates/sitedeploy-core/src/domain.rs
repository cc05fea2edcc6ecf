use crate::error::{DeployError, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Hostname validation
// ---------------------------------------------------------------------------

static HOSTNAME_RE: OnceLock<Regex> = OnceLock::new();

fn hostname_re() -> &'static Regex {
    // Labels of 1-63 chars, no leading/trailing hyphen, at least one dot,
    // alphabetic TLD of 2+ chars.
    HOSTNAME_RE.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$")
            .unwrap()
    })
}

// ---------------------------------------------------------------------------
// DomainName
// ---------------------------------------------------------------------------

/// A validated hostname. Construction through [`DomainName::parse`] is the
/// only validation point: any `DomainName` in circulation is well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DomainName(String);

impl DomainName {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() || raw.len() > 253 || !hostname_re().is_match(raw) {
            return Err(DeployError::InvalidInput(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `www.` alias the stack serves alongside the apex.
    pub fn www(&self) -> String {
        format!("www.{}", self.0)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// DeploymentTarget
// ---------------------------------------------------------------------------

/// What the operator asked for: a domain, and optionally a local directory
/// of site content to publish once the infrastructure is up. Immutable for
/// the duration of a run.
#[derive(Debug, Clone)]
pub struct DeploymentTarget {
    pub domain: DomainName,
    pub website_path: Option<PathBuf>,
}

impl DeploymentTarget {
    pub fn new(domain: DomainName, website_path: Option<PathBuf>) -> Self {
        Self {
            domain,
            website_path,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
