//! The Azure DevOps Server integration and its capability routing.

mod adapter;
mod capability;
mod key;
mod outcome;

#[cfg(test)]
mod test_support;

pub use adapter::{lazy_providers_api, AzureDevOpsServerIntegration};
pub use capability::{Capability, CapabilityOptions};
pub use key::{IntegrationId, IntegrationKey};
pub use outcome::{MergeOutcome, Outcome};
