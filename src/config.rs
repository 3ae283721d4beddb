use url::Url;

use crate::auth::{Session, Token};
use crate::error::{IntegrationError, Result};
use crate::integration::CapabilityOptions;

const SUPPORTED_PROTOCOLS: [&str; 2] = ["https:", "http:"];

/// Validated connection settings for one server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub domain: String,
    pub protocol: Option<String>,
    pub merge_enabled: bool,
}

impl ServerConfig {
    pub fn new(domain: &str, protocol: Option<&str>, merge_enabled: bool) -> Result<Self> {
        let domain = validate_domain(domain)?;
        let protocol = protocol.map(validate_protocol).transpose()?;

        Ok(Self {
            domain,
            protocol,
            merge_enabled,
        })
    }

    pub fn capability_options(&self) -> CapabilityOptions {
        CapabilityOptions {
            merge_enabled: self.merge_enabled,
        }
    }

    pub fn session(&self, token: Token) -> Session {
        let session = Session::new(token);
        match &self.protocol {
            Some(protocol) => session.with_protocol(protocol.clone()),
            None => session,
        }
    }
}

fn validate_domain(domain: &str) -> Result<String> {
    let domain = domain.trim().trim_end_matches('/');

    if domain.is_empty() {
        return Err(IntegrationError::Config(
            "Server domain must not be empty".to_string(),
        ));
    }
    if domain.contains("://") {
        return Err(IntegrationError::Config(format!(
            "Server domain '{domain}' must not include a scheme; use --protocol instead"
        )));
    }
    if domain.contains(['?', '#']) {
        return Err(IntegrationError::Config(format!(
            "Server domain '{domain}' must not include a query or fragment"
        )));
    }
    if domain.starts_with('/') || domain.contains("//") {
        return Err(IntegrationError::Config(format!(
            "Server domain '{domain}' has an empty host or path segment"
        )));
    }

    let parsed = Url::parse(&format!("https://{domain}"))
        .map_err(|e| IntegrationError::Config(format!("Invalid server domain '{domain}': {e}")))?;
    if parsed.host_str().is_none() {
        return Err(IntegrationError::Config(format!(
            "Server domain '{domain}' has no host"
        )));
    }

    Ok(domain.to_string())
}

fn validate_protocol(protocol: &str) -> Result<String> {
    let protocol = protocol.trim().to_ascii_lowercase();
    let protocol = if protocol.ends_with(':') {
        protocol
    } else {
        format!("{protocol}:")
    };

    if SUPPORTED_PROTOCOLS.contains(&protocol.as_str()) {
        Ok(protocol)
    } else {
        Err(IntegrationError::Config(format!(
            "Unsupported protocol '{protocol}', expected one of {}",
            SUPPORTED_PROTOCOLS.join(", ")
        )))
    }
}
