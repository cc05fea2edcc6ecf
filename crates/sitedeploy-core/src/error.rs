use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid domain name '{0}': expected labels of 1-63 characters (letters, digits, hyphens, no leading/trailing hyphen), at least one dot, and an alphabetic TLD of 2+ characters")]
    InvalidInput(String),

    #[error("required tool '{tool}' not found: {remediation}")]
    PrerequisiteMissing { tool: String, remediation: String },

    #[error("remote operation failed for '{target}': {reason}")]
    Provisioning { target: String, reason: String },

    #[error("deployment not complete after {attempts} attempts: certificate validation is still waiting on DNS propagation. Verify the nameservers are set at your registrar, wait a while, and rerun the deploy (already-created resources are reused)")]
    DeploymentExhausted { attempts: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DeployError>;
