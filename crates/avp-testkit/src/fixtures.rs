//! Configuration fixtures and stand-in handlers for control-layer tests.

use avp_core::capability::{HashAlgorithm, HashTestCase};
use avp_core::config::Config;
use avp_core::error::SessionError;

/// A baseline configuration with one hash capability enabled.
#[must_use]
pub fn config() -> Config {
    Config {
        hashes: vec![HashAlgorithm::Sha2_256],
        ..Config::default()
    }
}

/// A configuration for a session-scoped mode, with a state file attached.
#[must_use]
pub fn session_config() -> Config {
    Config {
        session_file: Some("session.json".into()),
        ..config()
    }
}

/// Hash handler that writes a zero digest of the right length.
///
/// # Errors
/// Never fails.
pub fn noop_hash_handler(tc: &mut HashTestCase) -> Result<(), SessionError> {
    tc.digest = vec![0; tc.algorithm.digest_len()];
    Ok(())
}
