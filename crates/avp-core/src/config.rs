//! Immutable configuration model for one invocation.
//!
//! The surrounding CLI layer populates a [`Config`] from flags and
//! environment variables and hands it to [`run_session`]; nothing in the
//! core reads process-wide state.
//!
//! [`run_session`]: crate::run_session

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capability::HashAlgorithm;
use crate::error::ConfigError;
use crate::provider::LogLevel;

/// Fallback server host when `AVP_SERVER` is unset.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Fallback server port when `AVP_PORT` is unset.
pub const DEFAULT_PORT: u16 = 443;
/// Fallback URI prefix when `AVP_URI_PREFIX` is unset.
pub const DEFAULT_URI_PREFIX: &str = "avp/v1";

/// Server identity and credentials for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub uri_prefix: String,
    pub api_context: String,
    /// CA bundle used to verify the server's TLS certificate.
    pub ca_file: Option<PathBuf>,
    /// Client certificate for TLS client auth, paired with `key_file`.
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    /// Two-factor TOTP seed, if the server requires one.
    pub totp_seed: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            uri_prefix: DEFAULT_URI_PREFIX.to_owned(),
            api_context: String::new(),
            ca_file: None,
            cert_file: None,
            key_file: None,
            totp_seed: None,
        }
    }
}

impl ServerConfig {
    /// True when the host was never overridden from its fallback.
    #[must_use]
    pub fn is_default_host(&self) -> bool {
        self.host == DEFAULT_HOST
    }
}

/// Everything the user or environment supplied for one run.
///
/// Mode flags select the session action by the dispatcher's precedence
/// order; auxiliary fields carry the files those modes operate on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub level: LogLevel,

    // session marks
    pub sample: bool,
    pub get_url: Option<String>,
    pub post_file: Option<PathBuf>,
    pub delete_url: Option<String>,
    pub request_only_file: Option<PathBuf>,

    // dispatch mode flags
    pub manual_registration_file: Option<PathBuf>,
    pub get_cost: bool,
    pub get_registration: bool,
    pub kat_file: Option<PathBuf>,
    pub vector_request_file: Option<PathBuf>,
    pub vector_response_file: Option<PathBuf>,
    pub vector_upload_file: Option<PathBuf>,
    pub put_file: Option<PathBuf>,
    pub get_results: bool,
    pub resume_session: bool,
    pub cancel_session: bool,
    pub get_expected: bool,
    pub post_resources_file: Option<PathBuf>,
    pub cert_request_file: Option<PathBuf>,

    // auxiliary data
    pub session_file: Option<PathBuf>,
    pub save_file: Option<PathBuf>,
    pub metadata_file: Option<PathBuf>,
    pub fips_validation: bool,
    /// PUT bifurcation: with an empty algorithm list the PUT payload is
    /// submitted directly instead of deferred until after the run.
    pub empty_algorithms: bool,
    /// Hash algorithms the capability registrar declares.
    pub hashes: Vec<HashAlgorithm>,
}

impl Config {
    /// Reject invalid flag combinations locally, before any network action.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vector_request_file.is_some() != self.vector_response_file.is_some() {
            return Err(ConfigError::VectorFilePair);
        }
        if self.fips_validation && self.metadata_file.is_none() {
            return Err(ConfigError::MissingMetadataFile);
        }
        let session_modes = [
            (self.get_results, "get-results"),
            (self.resume_session, "resume"),
            (self.cancel_session, "cancel"),
            (self.get_expected, "get-expected-results"),
        ];
        for (active, mode) in session_modes {
            if active && self.session_file.is_none() {
                return Err(ConfigError::MissingSessionFile { mode });
            }
        }
        Ok(())
    }
}
