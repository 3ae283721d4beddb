mod token;

pub use token::Token;

use serde::Serialize;

/// Protocol assumed when a session does not carry one.
pub const DEFAULT_PROTOCOL: &str = "https:";

/// An authenticated session handed to the adapter by the host on every call.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: Token,
    pub protocol: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<Token>) -> Self {
        Self {
            access_token: access_token.into(),
            protocol: None,
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn protocol_or_default(&self) -> &str {
        self.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL)
    }
}

/// Identifies the authentication provider a host must use to obtain sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthProviderDescriptor {
    pub id: &'static str,
    pub scopes: &'static [&'static str],
}
