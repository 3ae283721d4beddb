use std::fmt;

use serde::Serialize;

/// Integration type tags for self-managed git hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IntegrationId {
    #[serde(rename = "azureDevOpsServer")]
    AzureDevOpsServer,
}

impl IntegrationId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AzureDevOpsServer => "azureDevOpsServer",
        }
    }
}

impl fmt::Display for IntegrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one configured server connection: `{integration id}:{domain}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IntegrationKey(String);

impl IntegrationKey {
    pub fn new(id: IntegrationId, domain: &str) -> Self {
        Self(format!("{id}:{domain}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntegrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
