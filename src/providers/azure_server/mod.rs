//! REST implementations of the collaborator traits for Azure DevOps Server.

mod api;
mod client;
mod dto;
mod url_utils;

pub use api::AzureProvidersApi;
pub use client::AzureServerClient;
