//! Best-effort delegation probe.
//!
//! Right before releasing the phase-1 checkpoint we ask the first delegated
//! nameserver directly whether it answers for the domain. A negative answer
//! is only a warning: propagation now says nothing about propagation two
//! minutes from now, when phase 2 actually needs it.

use crate::domain::DomainName;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Upper bound on the whole probe. The dig invocation below stays under it
/// (2 tries at a 4 second timeout each).
pub const PROBE_TIMEOUT_SECS: u64 = 10;

pub trait Probe {
    /// Whether `nameserver` currently answers an A query for `domain`.
    fn resolve(&self, domain: &DomainName, nameserver: &str) -> bool;
}

/// Probe backed by the `dig` binary. Discovery is optional: without dig the
/// probe always reports failure and the caller's warning path covers it.
pub struct DigProbe {
    bin: Option<PathBuf>,
}

impl DigProbe {
    pub fn discover() -> Self {
        Self {
            bin: which::which("dig").ok(),
        }
    }
}

impl Probe for DigProbe {
    fn resolve(&self, domain: &DomainName, nameserver: &str) -> bool {
        let Some(bin) = &self.bin else {
            tracing::warn!("dig not found; skipping delegation probe");
            return false;
        };

        let output = Command::new(bin)
            .arg(format!("@{}", nameserver.trim_end_matches('.')))
            .arg(domain.as_str())
            .args(["A", "+short", "+time=4", "+tries=2"])
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(out) => out.status.success() && !out.stdout.trim_ascii().is_empty(),
            Err(e) => {
                tracing::warn!("delegation probe did not run: {e}");
                false
            }
        }
    }
}
