//! Bounded-interval waiting for a stack to reach a terminal state.
//!
//! This is deliberately a free function over the `Provisioner` and `Clock`
//! seams rather than a sleep loop inside the provisioner, so it can be
//! exercised in tests with a fake clock and scripted describe results.

use crate::clock::Clock;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::provisioner::Provisioner;
use crate::stack::StackStatus;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Pending,
    Complete,
    Failed,
    TimedOut,
}

/// What terminal state we are waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitGoal {
    /// A create/update settling into a terminal status.
    Settled,
    /// The stack ceasing to exist.
    Deleted,
}

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    /// Certificate validation dominates create time; the provider's own
    /// ceiling is about an hour at this cadence.
    pub fn for_create() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_attempts: 120,
        }
    }

    /// Deletion is mostly bounded by CDN disablement latency.
    pub fn for_delete() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_attempts: 60,
        }
    }
}

/// Poll `describe` until the goal is reached, an attempt budget is spent, or
/// the stack reports failure. The first describe happens immediately; sleeps
/// only separate attempts.
pub fn wait_for_stack(
    provisioner: &dyn Provisioner,
    ctx: &ExecutionContext,
    name: &str,
    goal: WaitGoal,
    clock: &dyn Clock,
    config: PollConfig,
) -> Result<PollStatus> {
    for attempt in 0..config.max_attempts {
        if attempt > 0 {
            clock.sleep(config.interval);
        }

        let described = provisioner.describe(ctx, name)?;
        let observed = match &described {
            Some(d) => d.status,
            None => StackStatus::NotFound,
        };

        let status = classify(goal, observed);
        match status {
            PollStatus::Pending => continue,
            terminal => return Ok(terminal),
        }
    }
    Ok(PollStatus::TimedOut)
}

fn classify(goal: WaitGoal, observed: StackStatus) -> PollStatus {
    match (goal, observed) {
        (WaitGoal::Settled, StackStatus::Complete) => PollStatus::Complete,
        (WaitGoal::Settled, StackStatus::Failed) => PollStatus::Failed,
        // A stack that vanishes mid-create was rolled back and deleted.
        (WaitGoal::Settled, StackStatus::NotFound) => PollStatus::Failed,
        (WaitGoal::Settled, StackStatus::InProgress) => PollStatus::Pending,

        (WaitGoal::Deleted, StackStatus::NotFound) => PollStatus::Complete,
        (WaitGoal::Deleted, StackStatus::Failed) => PollStatus::Failed,
        (WaitGoal::Deleted, _) => PollStatus::Pending,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
