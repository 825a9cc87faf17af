//! Environment-derived server settings.
//!
//! Connection parameters and credentials come from the environment, not
//! flags, so scripts can point a whole pipeline of invocations at one
//! server without repeating them.

use std::env;

use anyhow::{Context, Result};

use avp_core::ServerConfig;

pub const SERVER: &str = "AVP_SERVER";
pub const PORT: &str = "AVP_PORT";
pub const URI_PREFIX: &str = "AVP_URI_PREFIX";
pub const API_CONTEXT: &str = "AVP_API_CONTEXT";
pub const CA_FILE: &str = "AVP_CA_FILE";
pub const CERT_FILE: &str = "AVP_CERT_FILE";
pub const KEY_FILE: &str = "AVP_KEY_FILE";
pub const TOTP_SEED: &str = "AVP_TOTP_SEED";

/// Read the server configuration from the process environment, falling
/// back to the built-in defaults for anything unset.
pub fn server_config() -> Result<ServerConfig> {
    server_config_from(|name| env::var(name).ok())
}

fn server_config_from(lookup: impl Fn(&str) -> Option<String>) -> Result<ServerConfig> {
    let mut server = ServerConfig::default();
    if let Some(host) = lookup(SERVER) {
        server.host = host;
    }
    if let Some(port) = lookup(PORT) {
        server.port = port
            .parse()
            .with_context(|| format!("{PORT} must be a port number, got {port:?}"))?;
    }
    if let Some(prefix) = lookup(URI_PREFIX) {
        server.uri_prefix = prefix;
    }
    if let Some(context) = lookup(API_CONTEXT) {
        server.api_context = context;
    }
    if let Some(ca) = lookup(CA_FILE) {
        server.ca_file = Some(ca.into());
    }
    if let Some(cert) = lookup(CERT_FILE) {
        server.cert_file = Some(cert.into());
    }
    if let Some(key) = lookup(KEY_FILE) {
        server.key_file = Some(key.into());
    }
    if let Some(seed) = lookup(TOTP_SEED) {
        server.totp_seed = Some(seed);
    }
    Ok(server)
}
