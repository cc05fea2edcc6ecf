//! Execution context threaded through every provisioner call.
//!
//! Credentials are an explicit value, never process-global environment
//! mutation: when present they are applied only to the child process being
//! spawned, so they vanish with it on every exit path.

use std::process::Command;

/// Certificates consumed by the CDN must live in this region regardless of
/// where the rest of the stack is deployed. Hard platform requirement.
pub const CERTIFICATE_REGION: &str = "us-east-1";

/// Default provider region when the operator specifies none.
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub region: String,
    pub credentials: Option<Credentials>,
}

impl ExecutionContext {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// The same context pinned to the certificate region. Every operation on
    /// the certificate-bearing stack runs under this, whatever `--region`
    /// says, because the CDN only accepts certificates issued there.
    pub fn for_certificate_operations(&self) -> ExecutionContext {
        ExecutionContext {
            region: CERTIFICATE_REGION.to_string(),
            credentials: self.credentials.clone(),
        }
    }

    /// Apply the explicit credentials (if any) to a child process.
    pub(crate) fn apply_credentials(&self, cmd: &mut Command) {
        if let Some(c) = &self.credentials {
            cmd.env("AWS_ACCESS_KEY_ID", &c.access_key_id);
            cmd.env("AWS_SECRET_ACCESS_KEY", &c.secret_access_key);
            match &c.session_token {
                Some(token) => {
                    cmd.env("AWS_SESSION_TOKEN", token);
                }
                None => {
                    cmd.env_remove("AWS_SESSION_TOKEN");
                }
            }
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}
