//! Trait seams for the external collaborators: the cloud resource
//! provisioner, the object store, and the hosted-zone admin. The orchestrator
//! only ever talks to these traits; production wires in the CLI-backed
//! implementations from [`crate::aws`], tests wire in recorders.

use crate::context::ExecutionContext;
use crate::domain::DomainName;
use crate::error::Result;
use crate::stack::StackStatus;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Request / description types
// ---------------------------------------------------------------------------

/// A create-or-update request for one stack. The target region comes from
/// the `ExecutionContext` it is submitted under; the certificate-bearing
/// phase runs under [`ExecutionContext::for_certificate_operations`].
#[derive(Debug, Clone)]
pub struct StackRequest {
    pub name: String,
    pub template_body: String,
    pub parameters: BTreeMap<String, String>,
    pub iam_capabilities: bool,
}

/// What a describe call reports about an existing stack.
#[derive(Debug, Clone, Serialize)]
pub struct StackDescription {
    pub name: String,
    pub status: StackStatus,
    /// The provider's own status string, kept for operator display.
    pub raw_status: String,
    pub creation_time: Option<String>,
    pub outputs: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Provisioner
// ---------------------------------------------------------------------------

/// The cloud resource provisioner. `submit` and `delete` return as soon as
/// the operation is accepted; callers wait for terminal state through
/// [`crate::poll::wait_for_stack`].
pub trait Provisioner {
    /// Idempotent inspection by name. `Ok(None)` means no such stack.
    fn describe(&self, ctx: &ExecutionContext, name: &str) -> Result<Option<StackDescription>>;

    /// Start a create (or update, if the stack already exists) operation.
    fn submit(&self, ctx: &ExecutionContext, request: &StackRequest) -> Result<()>;

    /// Start deletion of the named stack.
    fn delete(&self, ctx: &ExecutionContext, name: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

/// Bucket-shaped storage plus the downstream cache in front of it.
pub trait ObjectStore {
    fn exists(&self, ctx: &ExecutionContext, bucket: &str) -> Result<bool>;

    /// Remove every object from the bucket. Returns whether anything was
    /// there to remove; a missing bucket is a no-op.
    fn empty(&self, ctx: &ExecutionContext, bucket: &str) -> Result<bool>;

    /// Mirror a local directory into the bucket, deleting extraneous remote
    /// objects when asked.
    fn sync(
        &self,
        ctx: &ExecutionContext,
        local: &Path,
        bucket: &str,
        delete_extraneous: bool,
    ) -> Result<()>;

    /// Invalidate the CDN cache for paths matching the glob.
    fn invalidate(&self, ctx: &ExecutionContext, distribution_id: &str, glob: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// ZoneAdmin
// ---------------------------------------------------------------------------

/// Direct hosted-zone operations needed only during teardown: the
/// provisioner refuses to delete a zone that still holds records beyond the
/// mandatory apex NS/SOA pair.
pub trait ZoneAdmin {
    /// Zone id for the exact domain, if one exists.
    fn find_zone(&self, ctx: &ExecutionContext, domain: &DomainName) -> Result<Option<String>>;

    /// Delete every record set except the apex NS and SOA. Returns how many
    /// record sets were removed.
    fn delete_extra_records(&self, ctx: &ExecutionContext, zone_id: &str) -> Result<usize>;
}
