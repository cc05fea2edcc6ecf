//! Deterministic stack naming and provider status mapping.
//!
//! Nothing about a deployment is persisted locally; the naming scheme is the
//! only index used to rediscover previously created resources on rerun.

use crate::domain::DomainName;
use serde::Serialize;
use std::fmt;

/// Prefix shared by every stack this tool manages.
pub const STACK_PREFIX: &str = "website";

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The two halves of a deployment: phase 1 owns the hosted zone (so the
/// operator can delegate before anything depends on DNS), phase 2 owns the
/// certificate, CDN, storage, and alias records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    One,
    Two,
}

impl Phase {
    pub fn suffix(&self) -> &'static str {
        match self {
            Phase::One => "phase1",
            Phase::Two => "phase2",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// `website-<domain with dots as hyphens>-<phase suffix>`.
pub fn stack_name(domain: &DomainName, phase: Phase) -> String {
    format!(
        "{STACK_PREFIX}-{}-{}",
        domain.as_str().replace('.', "-"),
        phase.suffix()
    )
}

/// Name used by the earlier single-stack layout. Only consulted during
/// teardown so upgrades don't strand old deployments.
pub fn legacy_stack_name(domain: &DomainName) -> String {
    format!("{STACK_PREFIX}-{}", domain.as_str().replace('.', "-"))
}

// ---------------------------------------------------------------------------
// StackStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StackStatus {
    NotFound,
    InProgress,
    Complete,
    Failed,
}

impl StackStatus {
    /// Collapse the provider's status vocabulary into the four states the
    /// orchestrator reasons about. Anything rolled back or failed is Failed;
    /// a deleted stack is indistinguishable from one that never existed.
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "CREATE_COMPLETE" | "UPDATE_COMPLETE" | "IMPORT_COMPLETE" => StackStatus::Complete,
            "DELETE_COMPLETE" => StackStatus::NotFound,
            s if s.ends_with("_IN_PROGRESS") => StackStatus::InProgress,
            _ => StackStatus::Failed,
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StackStatus::NotFound => "not found",
            StackStatus::InProgress => "in progress",
            StackStatus::Complete => "complete",
            StackStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// PhaseStackHandle
// ---------------------------------------------------------------------------

/// A reference to one phase's stack as last observed. The handle carries no
/// resource identifiers of its own; everything is re-queried by name.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseStackHandle {
    pub phase: Phase,
    pub name: String,
    pub status: StackStatus,
}

impl PhaseStackHandle {
    pub fn new(domain: &DomainName, phase: Phase, status: StackStatus) -> Self {
        Self {
            phase,
            name: stack_name(domain, phase),
            status,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(raw: &str) -> DomainName {
        DomainName::parse(raw).unwrap()
    }

    #[test]
    fn deterministic_phase_names() {
        let d = domain("example.com");
        assert_eq!(stack_name(&d, Phase::One), "website-example-com-phase1");
        assert_eq!(stack_name(&d, Phase::Two), "website-example-com-phase2");
    }

    #[test]
    fn legacy_name_has_no_suffix() {
        assert_eq!(legacy_stack_name(&domain("example.com")), "website-example-com");
    }

    #[test]
    fn multi_label_domains_flatten() {
        let d = domain("blog.team.example.co.uk");
        assert_eq!(
            stack_name(&d, Phase::One),
            "website-blog-team-example-co-uk-phase1"
        );
    }

    #[test]
    fn provider_status_mapping() {
        assert_eq!(
            StackStatus::from_provider("CREATE_COMPLETE"),
            StackStatus::Complete
        );
        assert_eq!(
            StackStatus::from_provider("UPDATE_COMPLETE"),
            StackStatus::Complete
        );
        assert_eq!(
            StackStatus::from_provider("DELETE_COMPLETE"),
            StackStatus::NotFound
        );
        assert_eq!(
            StackStatus::from_provider("CREATE_IN_PROGRESS"),
            StackStatus::InProgress
        );
        assert_eq!(
            StackStatus::from_provider("DELETE_IN_PROGRESS"),
            StackStatus::InProgress
        );
        assert_eq!(
            StackStatus::from_provider("ROLLBACK_COMPLETE"),
            StackStatus::Failed
        );
        assert_eq!(
            StackStatus::from_provider("CREATE_FAILED"),
            StackStatus::Failed
        );
        assert_eq!(
            StackStatus::from_provider("DELETE_FAILED"),
            StackStatus::Failed
        );
    }
}
