use serde::Serialize;

use super::capability::Capability;

/// Result of a capability call.
///
/// `NotFound` means the server was asked and had nothing; `Unsupported`
/// means this integration cannot answer the question at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Found(T),
    NotFound,
    Unsupported(Capability),
}

impl<T> Outcome<T> {
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound | Self::Unsupported(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Found(value) => Outcome::Found(f(value)),
            Self::NotFound => Outcome::NotFound,
            Self::Unsupported(capability) => Outcome::Unsupported(capability),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
    Merged,
    NotMerged { reason: String },
    Unsupported,
}

impl MergeOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged)
    }
}
