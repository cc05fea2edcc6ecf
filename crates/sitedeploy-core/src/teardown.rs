//! Best-effort complete teardown of everything a domain's deployment owns.
//!
//! Ordering is imposed by the provider: storage must be empty before its
//! stack can delete, and a zone holding extraneous records refuses deletion.
//! Every step is individually idempotent so a partially failed run can
//! simply be rerun. The contract is visibility into stragglers, not
//! guaranteed zero residue: in-flight CDN disablement can leave transient
//! leftovers that resolve themselves shortly after.

use crate::context::ExecutionContext;
use crate::domain::DomainName;
use crate::error::{DeployError, Result};
use crate::orchestrator::Orchestrator;
use crate::poll::{self, PollStatus, WaitGoal};
use crate::provisioner::{ObjectStore, ZoneAdmin};
use crate::stack::{legacy_stack_name, stack_name, Phase};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    /// What this run actually removed, in order.
    pub removed: Vec<String>,
    /// Resources that could not be proven gone. Warnings, never an error.
    pub residue: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.residue.is_empty()
    }
}

impl<'a> Orchestrator<'a> {
    pub fn teardown(
        &self,
        ctx: &ExecutionContext,
        domain: &DomainName,
        store: &dyn ObjectStore,
        zones: &dyn ZoneAdmin,
    ) -> Result<TeardownReport> {
        let mut removed = Vec::new();
        let mut residue = Vec::new();
        let buckets = [domain.as_str().to_string(), domain.www()];

        // Storage first: the provisioner refuses to delete non-empty buckets.
        for bucket in &buckets {
            if store.empty(ctx, bucket)? {
                removed.push(format!("emptied bucket {bucket}"));
            }
        }

        // Then any records beyond the mandatory apex pair, which block zone
        // deletion.
        if let Some(zone_id) = zones.find_zone(ctx, domain)? {
            let count = zones.delete_extra_records(ctx, &zone_id)?;
            if count > 0 {
                removed.push(format!("removed {count} record set(s) from zone {zone_id}"));
            }
        }

        // Stacks in reverse dependency order, plus the legacy single-stack
        // name from the pre-split layout.
        let cert_ctx = ctx.for_certificate_operations();
        let targets = [
            (stack_name(domain, Phase::Two), cert_ctx.clone()),
            (stack_name(domain, Phase::One), ctx.clone()),
            (legacy_stack_name(domain), cert_ctx),
        ];
        for (name, op_ctx) in &targets {
            if self.provisioner.describe(op_ctx, name)?.is_none() {
                continue;
            }
            self.provisioner.delete(op_ctx, name)?;
            match poll::wait_for_stack(
                self.provisioner,
                op_ctx,
                name,
                WaitGoal::Deleted,
                self.clock,
                self.delete_poll,
            )? {
                PollStatus::Complete => removed.push(format!("deleted stack {name}")),
                PollStatus::Failed => {
                    return Err(DeployError::Provisioning {
                        target: name.clone(),
                        reason: "stack deletion failed".to_string(),
                    })
                }
                PollStatus::TimedOut => {
                    tracing::warn!(stack = %name, "deletion still in progress after wait budget");
                    residue.push(format!("stack {name} is still deleting"));
                }
                PollStatus::Pending => unreachable!("wait_for_stack only returns terminal states"),
            }
        }

        // Re-query for stragglers and report rather than fail.
        for bucket in &buckets {
            if store.exists(ctx, bucket)? {
                tracing::warn!(bucket = %bucket, "bucket still exists after teardown");
                residue.push(format!("bucket {bucket} still exists"));
            }
        }
        if let Some(zone_id) = zones.find_zone(ctx, domain)? {
            tracing::warn!(zone = %zone_id, "hosted zone still exists after teardown");
            residue.push(format!("hosted zone {zone_id} still exists"));
        }

        Ok(TeardownReport {
            removed,
            residue,
            completed_at: self.clock.now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
