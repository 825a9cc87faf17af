//! The collaborator-library contract.
//!
//! [`SessionProvider`] is the seam between this control layer and the
//! validation-protocol client library: capability registration, transport,
//! JSON encoding, and polling all live behind it. The core calls it but
//! never reimplements it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capability::{Domain, DomainParam, HashAlgorithm, HashHandler};
use crate::error::SessionError;

/// Verbosity levels for provider progress messages.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum LogLevel {
    None,
    Error,
    Warning,
    #[default]
    Status,
    Info,
    Verbose,
    Debug,
}

/// Sink the provider reports status updates, warnings, and errors through.
pub type ProgressCallback = Box<dyn Fn(LogLevel, &str) + Send>;

/// One validation session against a remote server.
///
/// Implementations own the server connection parameters, the registration
/// payload, authentication state, and accumulated results. The handle is
/// exclusively owned by the single process thread and is destroyed exactly
/// once at process end by the owning [`SessionContext`].
///
/// Network-bearing operations block until completion or a provider-internal
/// timeout; retry and backoff are entirely the provider's responsibility.
///
/// [`SessionContext`]: crate::session::SessionContext
pub trait SessionProvider {
    // connection parameters
    fn set_server(&mut self, host: &str, port: u16) -> Result<(), SessionError>;
    fn set_api_context(&mut self, context: &str) -> Result<(), SessionError>;
    fn set_path_segment(&mut self, segment: &str) -> Result<(), SessionError>;
    fn set_ca_bundle(&mut self, path: &Path) -> Result<(), SessionError>;
    fn set_client_identity(&mut self, cert: &Path, key: &Path) -> Result<(), SessionError>;
    fn set_totp_seed(&mut self, seed: &str) -> Result<(), SessionError>;

    // session marks
    fn mark_as_sample(&mut self) -> Result<(), SessionError>;
    fn mark_as_get_only(&mut self, url: &str) -> Result<(), SessionError>;
    fn set_get_save_file(&mut self, path: &Path) -> Result<(), SessionError>;
    fn mark_as_post_only(&mut self, path: &Path) -> Result<(), SessionError>;
    fn mark_as_delete_only(&mut self, url: &str) -> Result<(), SessionError>;
    fn mark_as_request_only(&mut self, path: &Path) -> Result<(), SessionError>;
    fn mark_as_put_after_test(&mut self, path: &Path) -> Result<(), SessionError>;

    // registration
    /// Bind the session to a user-supplied registration document instead of
    /// registering capabilities one by one.
    fn set_registration_file(&mut self, path: &Path) -> Result<(), SessionError>;
    fn register_capability(
        &mut self,
        algorithm: HashAlgorithm,
        handler: HashHandler,
    ) -> Result<(), SessionError>;
    fn set_capability_domain(
        &mut self,
        algorithm: HashAlgorithm,
        parameter: DomainParam,
        domain: Domain,
    ) -> Result<(), SessionError>;

    /// Expected number of vector sets for the current registration.
    /// `None` means the provider cannot estimate.
    fn vector_set_count(&mut self) -> Option<usize>;

    /// The registration document the session would submit, as JSON text.
    fn current_registration(&mut self) -> Result<String, SessionError>;

    // local file processing
    fn load_kat_file(&mut self, path: &Path) -> Result<(), SessionError>;
    fn run_vectors_from_files(&mut self, request: &Path, response: &Path)
        -> Result<(), SessionError>;
    fn upload_vectors_from_file(
        &mut self,
        path: &Path,
        fips_validation: bool,
    ) -> Result<(), SessionError>;

    // FIPS validation metadata
    fn ingest_oe_metadata(&mut self, path: &Path) -> Result<(), SessionError>;
    fn set_fips_validation_metadata(
        &mut self,
        module_id: u32,
        oe_id: u32,
    ) -> Result<(), SessionError>;

    // session actions
    fn put_data_from_file(&mut self, path: &Path) -> Result<(), SessionError>;
    fn run(&mut self, fips_validation: bool) -> Result<(), SessionError>;
    fn resume(&mut self, session_file: &Path, fips_validation: bool) -> Result<(), SessionError>;
    fn cancel(&mut self, session_file: &Path, save_to: Option<&Path>)
        -> Result<(), SessionError>;
    fn expected_results(
        &mut self,
        session_file: &Path,
        save_to: Option<&Path>,
    ) -> Result<(), SessionError>;
    fn results(&mut self, session_file: &Path) -> Result<(), SessionError>;

    // non-terminal side actions
    fn mark_as_post_resources(&mut self, path: &Path) -> Result<(), SessionError>;
    fn mark_as_cert_request(&mut self, path: &Path) -> Result<(), SessionError>;

    /// Release everything the session holds. Called exactly once, from the
    /// owning context's teardown path.
    fn destroy(&mut self);
}
