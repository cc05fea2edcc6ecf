//! The two-phase deployment state machine.
//!
//! Phase 1 creates the hosted zone and surfaces its delegation nameservers;
//! the operator must point the registrar at them, which this system cannot
//! verify, only request. Phase 2 provisions the certificate, CDN, storage,
//! and alias records, retrying a bounded number of times because certificate
//! validation races registrar-side DNS propagation.

use crate::clock::Clock;
use crate::context::ExecutionContext;
use crate::domain::DomainName;
use crate::error::{DeployError, Result};
use crate::poll::{self, PollConfig, PollStatus, WaitGoal};
use crate::probe::Probe;
use crate::provisioner::{Provisioner, StackRequest};
use crate::stack::{stack_name, Phase, PhaseStackHandle, StackStatus};
use crate::template;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Phase 2 attempt budget. Exhaustion is terminal by design: retrying
/// forever would mask a delegation the operator never actually updated.
pub const MAX_ATTEMPTS: u32 = 3;

/// Fixed (not exponential) spacing between phase 2 attempts. The dominant
/// failure cause is DNS TTL expiry and resolver cache refresh, a
/// fixed-latency external process, not contention.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(120);

// Parameter and output keys shared with the embedded templates.
pub const PARAM_DOMAIN_NAME: &str = "DomainName";
pub const PARAM_HOSTED_ZONE_ID: &str = "HostedZoneId";
pub const OUTPUT_NAME_SERVERS: &str = "NameServers";
pub const OUTPUT_HOSTED_ZONE_ID: &str = "HostedZoneId";
pub const OUTPUT_WEBSITE_URL: &str = "WebsiteURL";
pub const OUTPUT_BUCKET: &str = "S3BucketName";
pub const OUTPUT_DISTRIBUTION_ID: &str = "CloudFrontDistributionId";

// ---------------------------------------------------------------------------
// NameServerSet
// ---------------------------------------------------------------------------

/// The delegation nameservers reported by phase 1. Ordered, never empty,
/// and consumed only for operator display; no further parsing happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NameServerSet(Vec<String>);

impl NameServerSet {
    /// Parse the comma-joined output value the zone template emits.
    fn from_output(raw: &str) -> Option<Self> {
        let servers: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if servers.is_empty() {
            None
        } else {
            Some(Self(servers))
        }
    }

    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

/// The human checkpoint between the phases: surface the nameservers and
/// block, with no timeout, until the operator confirms the registrar has
/// been updated. A single synchronous call, kept entirely out of the retry
/// logic so tests can auto-acknowledge.
pub trait Checkpoint {
    fn acknowledge_delegation(
        &self,
        domain: &DomainName,
        nameservers: &NameServerSet,
    ) -> std::io::Result<()>;
}

// ---------------------------------------------------------------------------
// DeploymentOutputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutputs {
    pub website_url: String,
    pub bucket: String,
    pub distribution_id: String,
    /// Every output the stack reported, for display.
    pub all: BTreeMap<String, String>,
}

impl DeploymentOutputs {
    fn from_outputs(stack: &str, outputs: BTreeMap<String, String>) -> Result<Self> {
        let get = |key: &str| -> Result<String> {
            outputs
                .get(key)
                .cloned()
                .ok_or_else(|| DeployError::Provisioning {
                    target: stack.to_string(),
                    reason: format!("stack completed but output '{key}' is missing"),
                })
        };
        Ok(Self {
            website_url: get(OUTPUT_WEBSITE_URL)?,
            bucket: get(OUTPUT_BUCKET)?,
            distribution_id: get(OUTPUT_DISTRIBUTION_ID)?,
            all: outputs,
        })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    pub(crate) provisioner: &'a dyn Provisioner,
    pub(crate) clock: &'a dyn Clock,
    pub(crate) create_poll: PollConfig,
    pub(crate) delete_poll: PollConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(provisioner: &'a dyn Provisioner, clock: &'a dyn Clock) -> Self {
        Self {
            provisioner,
            clock,
            create_poll: PollConfig::for_create(),
            delete_poll: PollConfig::for_delete(),
        }
    }

    /// Create (or rediscover) the hosted zone stack and hand its delegation
    /// nameservers to the operator. Returns only after the operator has
    /// acknowledged updating the registrar.
    pub fn run_phase1(
        &self,
        ctx: &ExecutionContext,
        domain: &DomainName,
        probe: &dyn Probe,
        checkpoint: &dyn Checkpoint,
    ) -> Result<(NameServerSet, PhaseStackHandle)> {
        let name = stack_name(domain, Phase::One);

        match self.provisioner.describe(ctx, &name)?.map(|d| d.status) {
            Some(StackStatus::Complete) => {
                tracing::info!(stack = %name, "hosted zone stack already exists; skipping creation");
            }
            Some(StackStatus::InProgress) => {
                tracing::info!(stack = %name, "hosted zone operation already in flight; waiting");
                self.wait_settled(ctx, &name)?;
            }
            Some(StackStatus::Failed) => {
                // A rolled-back stack can't be updated; clear it and recreate.
                tracing::warn!(stack = %name, "hosted zone stack is in a failed state; recreating");
                self.provisioner.delete(ctx, &name)?;
                self.wait_deleted(ctx, &name)?;
                self.create_zone_stack(ctx, domain, &name)?;
            }
            Some(StackStatus::NotFound) | None => {
                self.create_zone_stack(ctx, domain, &name)?;
            }
        }

        let described =
            self.provisioner
                .describe(ctx, &name)?
                .ok_or_else(|| DeployError::Provisioning {
                    target: name.clone(),
                    reason: "hosted zone stack disappeared after creation".to_string(),
                })?;

        let nameservers = described
            .outputs
            .get(OUTPUT_NAME_SERVERS)
            .and_then(|raw| NameServerSet::from_output(raw))
            .ok_or_else(|| DeployError::Provisioning {
                target: name.clone(),
                reason: "stack reported no delegation nameservers".to_string(),
            })?;

        // Best-effort: absence of propagation right now says nothing about
        // the state minutes from now, so a miss is only a warning.
        if !probe.resolve(domain, nameservers.first()) {
            tracing::warn!(
                nameserver = nameservers.first(),
                "delegation not yet answering for {domain}; continuing anyway"
            );
        }

        checkpoint.acknowledge_delegation(domain, &nameservers)?;

        Ok((
            nameservers,
            PhaseStackHandle::new(domain, Phase::One, StackStatus::Complete),
        ))
    }

    /// Provision certificate, CDN, storage, and alias records, retrying
    /// through the DNS-propagation window. Requires a completed phase 1.
    pub fn run_phase2(
        &self,
        ctx: &ExecutionContext,
        domain: &DomainName,
        phase1: &PhaseStackHandle,
    ) -> Result<DeploymentOutputs> {
        if phase1.status != StackStatus::Complete {
            return Err(DeployError::Provisioning {
                target: phase1.name.clone(),
                reason: format!(
                    "phase 1 stack is {}; the hosted zone must exist before phase 2",
                    phase1.status
                ),
            });
        }

        let zone_id = self
            .provisioner
            .describe(ctx, &phase1.name)?
            .and_then(|d| d.outputs.get(OUTPUT_HOSTED_ZONE_ID).cloned())
            .ok_or_else(|| DeployError::Provisioning {
                target: phase1.name.clone(),
                reason: "hosted zone id missing from phase 1 outputs".to_string(),
            })?;

        // The certificate in this stack forces the pinned region.
        let cert_ctx = ctx.for_certificate_operations();
        let name = stack_name(domain, Phase::Two);

        let mut parameters = BTreeMap::new();
        parameters.insert(PARAM_DOMAIN_NAME.to_string(), domain.as_str().to_string());
        parameters.insert(PARAM_HOSTED_ZONE_ID.to_string(), zone_id);
        let request = StackRequest {
            name: name.clone(),
            template_body: template::body(Phase::Two).to_string(),
            parameters,
            iam_capabilities: true,
        };

        for attempt in 1..=MAX_ATTEMPTS {
            tracing::info!(attempt, max = MAX_ATTEMPTS, stack = %name, "provisioning website stack");

            // A remnant rolled back by an earlier attempt blocks creation.
            if let Some(d) = self.provisioner.describe(&cert_ctx, &name)? {
                if d.status == StackStatus::Failed {
                    self.provisioner.delete(&cert_ctx, &name)?;
                    self.wait_deleted(&cert_ctx, &name)?;
                }
            }

            self.provisioner.submit(&cert_ctx, &request)?;
            match poll::wait_for_stack(
                self.provisioner,
                &cert_ctx,
                &name,
                WaitGoal::Settled,
                self.clock,
                self.create_poll,
            )? {
                PollStatus::Complete => {
                    let described = self
                        .provisioner
                        .describe(&cert_ctx, &name)?
                        .ok_or_else(|| DeployError::Provisioning {
                            target: name.clone(),
                            reason: "stack disappeared after completing".to_string(),
                        })?;
                    return DeploymentOutputs::from_outputs(&name, described.outputs);
                }
                PollStatus::Failed | PollStatus::TimedOut => {
                    if attempt < MAX_ATTEMPTS {
                        tracing::warn!(
                            attempt,
                            backoff_secs = RETRY_BACKOFF.as_secs(),
                            "stack operation failed, most likely because certificate \
                             validation cannot see the delegated zone yet; backing off"
                        );
                        self.clock.sleep(RETRY_BACKOFF);
                    }
                }
                PollStatus::Pending => {
                    unreachable!("wait_for_stack only returns terminal states")
                }
            }
        }

        Err(DeployError::DeploymentExhausted {
            attempts: MAX_ATTEMPTS,
        })
    }

    fn create_zone_stack(
        &self,
        ctx: &ExecutionContext,
        domain: &DomainName,
        name: &str,
    ) -> Result<()> {
        let mut parameters = BTreeMap::new();
        parameters.insert(PARAM_DOMAIN_NAME.to_string(), domain.as_str().to_string());
        let request = StackRequest {
            name: name.to_string(),
            template_body: template::body(Phase::One).to_string(),
            parameters,
            iam_capabilities: true,
        };
        self.provisioner.submit(ctx, &request)?;
        self.wait_settled(ctx, name)
    }

    pub(crate) fn wait_settled(&self, ctx: &ExecutionContext, name: &str) -> Result<()> {
        match poll::wait_for_stack(
            self.provisioner,
            ctx,
            name,
            WaitGoal::Settled,
            self.clock,
            self.create_poll,
        )? {
            PollStatus::Complete => Ok(()),
            PollStatus::Failed => {
                let raw = self
                    .provisioner
                    .describe(ctx, name)?
                    .map(|d| d.raw_status)
                    .unwrap_or_else(|| "stack no longer exists".to_string());
                Err(DeployError::Provisioning {
                    target: name.to_string(),
                    reason: format!("stack operation did not complete ({raw})"),
                })
            }
            PollStatus::TimedOut => Err(DeployError::Provisioning {
                target: name.to_string(),
                reason: "timed out waiting for the stack operation to finish".to_string(),
            }),
            PollStatus::Pending => unreachable!("wait_for_stack only returns terminal states"),
        }
    }

    pub(crate) fn wait_deleted(&self, ctx: &ExecutionContext, name: &str) -> Result<()> {
        match poll::wait_for_stack(
            self.provisioner,
            ctx,
            name,
            WaitGoal::Deleted,
            self.clock,
            self.delete_poll,
        )? {
            PollStatus::Complete => Ok(()),
            PollStatus::Failed => Err(DeployError::Provisioning {
                target: name.to_string(),
                reason: "stack deletion failed".to_string(),
            }),
            PollStatus::TimedOut => Err(DeployError::Provisioning {
                target: name.to_string(),
                reason: "timed out waiting for stack deletion".to_string(),
            }),
            PollStatus::Pending => unreachable!("wait_for_stack only returns terminal states"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
