//! Hand-rolled fakes shared by the orchestrator, teardown, and poll tests.
//! All of them write into a shared call log so tests can assert cross-
//! collaborator ordering (e.g. buckets emptied before stacks deleted).

use crate::clock::Clock;
use crate::context::ExecutionContext;
use crate::domain::DomainName;
use crate::error::Result;
use crate::orchestrator::{Checkpoint, NameServerSet};
use crate::probe::Probe;
use crate::provisioner::{ObjectStore, Provisioner, StackDescription, StackRequest, ZoneAdmin};
use crate::stack::StackStatus;
use chrono::{DateTime, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

pub type CallLog = Rc<RefCell<Vec<String>>>;

pub fn new_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

// ---------------------------------------------------------------------------
// FakeClock
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeClock {
    sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

// ---------------------------------------------------------------------------
// SequenceProvisioner: scripted describe results, for the poller tests
// ---------------------------------------------------------------------------

pub struct SequenceProvisioner {
    statuses: RefCell<VecDeque<Option<StackStatus>>>,
    pending_forever: bool,
    describes: RefCell<u32>,
}

impl SequenceProvisioner {
    pub fn new(statuses: Vec<Option<StackStatus>>) -> Self {
        Self {
            statuses: RefCell::new(statuses.into()),
            pending_forever: false,
            describes: RefCell::new(0),
        }
    }

    pub fn pending_forever() -> Self {
        Self {
            statuses: RefCell::new(VecDeque::new()),
            pending_forever: true,
            describes: RefCell::new(0),
        }
    }

    pub fn describe_count(&self) -> u32 {
        *self.describes.borrow()
    }
}

impl Provisioner for SequenceProvisioner {
    fn describe(&self, _ctx: &ExecutionContext, name: &str) -> Result<Option<StackDescription>> {
        *self.describes.borrow_mut() += 1;
        let next = if self.pending_forever {
            Some(StackStatus::InProgress)
        } else {
            self.statuses.borrow_mut().pop_front().flatten()
        };
        Ok(next.map(|status| description(name, status, BTreeMap::new())))
    }

    fn submit(&self, _ctx: &ExecutionContext, _request: &StackRequest) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _ctx: &ExecutionContext, _name: &str) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeStacks: stateful provisioner for orchestrator and teardown tests
// ---------------------------------------------------------------------------

fn description(
    name: &str,
    status: StackStatus,
    outputs: BTreeMap<String, String>,
) -> StackDescription {
    StackDescription {
        name: name.to_string(),
        status,
        raw_status: format!("{status:?}").to_uppercase(),
        creation_time: None,
        outputs,
    }
}

pub struct FakeStacks {
    stacks: RefCell<BTreeMap<String, StackDescription>>,
    /// Terminal status (and outputs) each successive submit settles into.
    submit_script: RefCell<VecDeque<(StackStatus, BTreeMap<String, String>)>>,
    log: CallLog,
}

impl FakeStacks {
    pub fn new(log: CallLog) -> Self {
        Self {
            stacks: RefCell::new(BTreeMap::new()),
            submit_script: RefCell::new(VecDeque::new()),
            log,
        }
    }

    /// Pre-seed an already-existing stack.
    pub fn seed(&self, name: &str, status: StackStatus, outputs: BTreeMap<String, String>) {
        self.stacks
            .borrow_mut()
            .insert(name.to_string(), description(name, status, outputs));
    }

    /// Script the terminal state the next submit settles into.
    pub fn on_submit(&self, status: StackStatus, outputs: BTreeMap<String, String>) {
        self.submit_script.borrow_mut().push_back((status, outputs));
    }

    pub fn submit_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|c| c.starts_with("submit "))
            .count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stacks.borrow().contains_key(name)
    }
}

impl Provisioner for FakeStacks {
    fn describe(&self, _ctx: &ExecutionContext, name: &str) -> Result<Option<StackDescription>> {
        self.log.borrow_mut().push(format!("describe {name}"));
        Ok(self.stacks.borrow().get(name).cloned())
    }

    fn submit(&self, _ctx: &ExecutionContext, request: &StackRequest) -> Result<()> {
        self.log.borrow_mut().push(format!("submit {}", request.name));
        let (status, outputs) = self
            .submit_script
            .borrow_mut()
            .pop_front()
            .unwrap_or((StackStatus::Complete, BTreeMap::new()));
        self.stacks
            .borrow_mut()
            .insert(request.name.clone(), description(&request.name, status, outputs));
        Ok(())
    }

    fn delete(&self, _ctx: &ExecutionContext, name: &str) -> Result<()> {
        self.log.borrow_mut().push(format!("delete {name}"));
        self.stacks.borrow_mut().remove(name);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeStore: object store with bucket contents flags
// ---------------------------------------------------------------------------

pub struct FakeStore {
    buckets: RefCell<BTreeMap<String, bool>>, // bucket -> has objects
    log: CallLog,
}

impl FakeStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            buckets: RefCell::new(BTreeMap::new()),
            log,
        }
    }

    pub fn seed_bucket(&self, name: &str, non_empty: bool) {
        self.buckets.borrow_mut().insert(name.to_string(), non_empty);
    }

    /// Simulate the stack deletion having taken the bucket with it, which
    /// the real provider does but this fake cannot observe.
    pub fn remove_bucket(&self, name: &str) {
        self.buckets.borrow_mut().remove(name);
    }
}

impl ObjectStore for FakeStore {
    fn exists(&self, _ctx: &ExecutionContext, bucket: &str) -> Result<bool> {
        Ok(self.buckets.borrow().contains_key(bucket))
    }

    fn empty(&self, _ctx: &ExecutionContext, bucket: &str) -> Result<bool> {
        self.log.borrow_mut().push(format!("empty {bucket}"));
        let mut buckets = self.buckets.borrow_mut();
        match buckets.get_mut(bucket) {
            Some(non_empty) => {
                let had_objects = *non_empty;
                *non_empty = false;
                Ok(had_objects)
            }
            None => Ok(false),
        }
    }

    fn sync(
        &self,
        _ctx: &ExecutionContext,
        local: &Path,
        bucket: &str,
        _delete_extraneous: bool,
    ) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("sync {} {bucket}", local.display()));
        Ok(())
    }

    fn invalidate(&self, _ctx: &ExecutionContext, distribution_id: &str, glob: &str) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("invalidate {distribution_id} {glob}"));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeZones
// ---------------------------------------------------------------------------

pub struct FakeZones {
    zone: RefCell<Option<(String, usize)>>, // (zone id, extra record count)
    log: CallLog,
}

impl FakeZones {
    pub fn new(log: CallLog) -> Self {
        Self {
            zone: RefCell::new(None),
            log,
        }
    }

    pub fn seed_zone(&self, id: &str, extra_records: usize) {
        *self.zone.borrow_mut() = Some((id.to_string(), extra_records));
    }

    pub fn remove_zone(&self) {
        *self.zone.borrow_mut() = None;
    }
}

impl ZoneAdmin for FakeZones {
    fn find_zone(&self, _ctx: &ExecutionContext, _domain: &DomainName) -> Result<Option<String>> {
        Ok(self.zone.borrow().as_ref().map(|(id, _)| id.clone()))
    }

    fn delete_extra_records(&self, _ctx: &ExecutionContext, zone_id: &str) -> Result<usize> {
        self.log.borrow_mut().push(format!("strip-records {zone_id}"));
        let mut zone = self.zone.borrow_mut();
        match zone.as_mut() {
            Some((_, extra)) => {
                let removed = *extra;
                *extra = 0;
                Ok(removed)
            }
            None => Ok(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Probe / checkpoint fakes
// ---------------------------------------------------------------------------

pub struct ScriptedProbe {
    pub resolves: bool,
    queried: RefCell<Vec<String>>,
}

impl ScriptedProbe {
    pub fn resolving() -> Self {
        Self {
            resolves: true,
            queried: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            resolves: false,
            queried: RefCell::new(Vec::new()),
        }
    }

    pub fn queried_nameservers(&self) -> Vec<String> {
        self.queried.borrow().clone()
    }
}

impl Probe for ScriptedProbe {
    fn resolve(&self, _domain: &DomainName, nameserver: &str) -> bool {
        self.queried.borrow_mut().push(nameserver.to_string());
        self.resolves
    }
}

#[derive(Default)]
pub struct AutoCheckpoint {
    acknowledged: RefCell<Vec<Vec<String>>>,
}

impl AutoCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acknowledgements(&self) -> Vec<Vec<String>> {
        self.acknowledged.borrow().clone()
    }
}

impl Checkpoint for AutoCheckpoint {
    fn acknowledge_delegation(
        &self,
        _domain: &DomainName,
        nameservers: &NameServerSet,
    ) -> std::io::Result<()> {
        self.acknowledged
            .borrow_mut()
            .push(nameservers.iter().map(String::from).collect());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn outputs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn positions(log: &CallLog, needles: &[&str]) -> Vec<usize> {
    let entries = log.borrow();
    needles
        .iter()
        .map(|needle| {
            entries
                .iter()
                .position(|e| e == needle)
                .unwrap_or_else(|| panic!("call '{needle}' not recorded in {entries:?}"))
        })
        .collect()
}

pub fn assert_ordered(log: &CallLog, needles: &[&str]) {
    let found = positions(log, needles);
    let mut sorted = found.clone();
    sorted.sort_unstable();
    assert_eq!(
        found,
        sorted,
        "calls out of order: wanted {needles:?}, log was {:?}",
        log.borrow()
    );
}
