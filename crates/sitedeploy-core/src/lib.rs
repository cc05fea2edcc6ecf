pub mod aws;
pub mod clock;
pub mod context;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod poll;
pub mod probe;
pub mod provisioner;
pub mod stack;
pub mod teardown;
pub mod template;

#[cfg(test)]
pub(crate) mod fakes;

pub use error::{DeployError, Result};
