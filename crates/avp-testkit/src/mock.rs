//! Call-recording mock implementation of [`SessionProvider`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use avp_core::capability::{Domain, DomainParam, HashAlgorithm, HashHandler};
use avp_core::error::SessionError;
use avp_core::provider::SessionProvider;

/// Shared view into a [`MockSession`]'s recorded operations.
///
/// Clones share the same ledger; the handle outlives the session so tests
/// can inspect calls after the provider has been destroyed.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    calls: Arc<Mutex<Vec<String>>>,
    destroys: Arc<AtomicUsize>,
}

impl Ledger {
    /// All recorded operation names, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("ledger lock poisoned").clone()
    }

    /// Number of times `operation` was invoked.
    #[must_use]
    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .expect("ledger lock poisoned")
            .iter()
            .filter(|call| *call == operation)
            .count()
    }

    /// Whether `operation` was invoked at least once.
    #[must_use]
    pub fn called(&self, operation: &str) -> bool {
        self.count(operation) > 0
    }

    /// Number of `destroy` invocations.
    #[must_use]
    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    fn record(&self, operation: &str) {
        self.calls
            .lock()
            .expect("ledger lock poisoned")
            .push(operation.to_owned());
    }
}

/// Scriptable mock session provider.
///
/// Every operation records its name into the ledger, then returns either a
/// scripted failure or success. Operations are keyed by their trait method
/// name (`"run"`, `"resume"`, `"register_capability"`, ...).
#[derive(Debug, Default)]
pub struct MockSession {
    ledger: Ledger,
    failures: HashMap<&'static str, SessionError>,
    vector_set_count: Option<usize>,
    registration: Option<String>,
}

impl MockSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for asserting on recorded calls, valid after teardown.
    #[must_use]
    pub fn ledger(&self) -> Ledger {
        self.ledger.clone()
    }

    /// Script `operation` to fail with `error` every time it is called.
    #[must_use]
    pub fn with_failure(mut self, operation: &'static str, error: SessionError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    /// Script the vector-set estimate; `None` means "cannot estimate".
    #[must_use]
    pub const fn with_vector_set_count(mut self, count: Option<usize>) -> Self {
        self.vector_set_count = count;
        self
    }

    /// Script the registration document returned by
    /// `current_registration`.
    #[must_use]
    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = Some(registration.into());
        self
    }

    fn invoke(&mut self, operation: &'static str) -> Result<(), SessionError> {
        self.ledger.record(operation);
        match self.failures.get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl SessionProvider for MockSession {
    fn set_server(&mut self, _host: &str, _port: u16) -> Result<(), SessionError> {
        self.invoke("set_server")
    }

    fn set_api_context(&mut self, _context: &str) -> Result<(), SessionError> {
        self.invoke("set_api_context")
    }

    fn set_path_segment(&mut self, _segment: &str) -> Result<(), SessionError> {
        self.invoke("set_path_segment")
    }

    fn set_ca_bundle(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("set_ca_bundle")
    }

    fn set_client_identity(&mut self, _cert: &Path, _key: &Path) -> Result<(), SessionError> {
        self.invoke("set_client_identity")
    }

    fn set_totp_seed(&mut self, _seed: &str) -> Result<(), SessionError> {
        self.invoke("set_totp_seed")
    }

    fn mark_as_sample(&mut self) -> Result<(), SessionError> {
        self.invoke("mark_as_sample")
    }

    fn mark_as_get_only(&mut self, _url: &str) -> Result<(), SessionError> {
        self.invoke("mark_as_get_only")
    }

    fn set_get_save_file(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("set_get_save_file")
    }

    fn mark_as_post_only(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("mark_as_post_only")
    }

    fn mark_as_delete_only(&mut self, _url: &str) -> Result<(), SessionError> {
        self.invoke("mark_as_delete_only")
    }

    fn mark_as_request_only(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("mark_as_request_only")
    }

    fn mark_as_put_after_test(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("mark_as_put_after_test")
    }

    fn set_registration_file(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("set_registration_file")
    }

    fn register_capability(
        &mut self,
        _algorithm: HashAlgorithm,
        _handler: HashHandler,
    ) -> Result<(), SessionError> {
        self.invoke("register_capability")
    }

    fn set_capability_domain(
        &mut self,
        _algorithm: HashAlgorithm,
        _parameter: DomainParam,
        _domain: Domain,
    ) -> Result<(), SessionError> {
        self.invoke("set_capability_domain")
    }

    fn vector_set_count(&mut self) -> Option<usize> {
        self.ledger.record("vector_set_count");
        self.vector_set_count
    }

    fn current_registration(&mut self) -> Result<String, SessionError> {
        self.invoke("current_registration")?;
        Ok(self
            .registration
            .clone()
            .unwrap_or_else(|| r#"{"algorithms":[]}"#.to_owned()))
    }

    fn load_kat_file(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("load_kat_file")
    }

    fn run_vectors_from_files(
        &mut self,
        _request: &Path,
        _response: &Path,
    ) -> Result<(), SessionError> {
        self.invoke("run_vectors_from_files")
    }

    fn upload_vectors_from_file(
        &mut self,
        _path: &Path,
        _fips_validation: bool,
    ) -> Result<(), SessionError> {
        self.invoke("upload_vectors_from_file")
    }

    fn ingest_oe_metadata(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("ingest_oe_metadata")
    }

    fn set_fips_validation_metadata(
        &mut self,
        _module_id: u32,
        _oe_id: u32,
    ) -> Result<(), SessionError> {
        self.invoke("set_fips_validation_metadata")
    }

    fn put_data_from_file(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("put_data_from_file")
    }

    fn run(&mut self, _fips_validation: bool) -> Result<(), SessionError> {
        self.invoke("run")
    }

    fn resume(&mut self, _session_file: &Path, _fips_validation: bool) -> Result<(), SessionError> {
        self.invoke("resume")
    }

    fn cancel(
        &mut self,
        _session_file: &Path,
        _save_to: Option<&Path>,
    ) -> Result<(), SessionError> {
        self.invoke("cancel")
    }

    fn expected_results(
        &mut self,
        _session_file: &Path,
        _save_to: Option<&Path>,
    ) -> Result<(), SessionError> {
        self.invoke("expected_results")
    }

    fn results(&mut self, _session_file: &Path) -> Result<(), SessionError> {
        self.invoke("results")
    }

    fn mark_as_post_resources(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("mark_as_post_resources")
    }

    fn mark_as_cert_request(&mut self, _path: &Path) -> Result<(), SessionError> {
        self.invoke("mark_as_cert_request")
    }

    fn destroy(&mut self) {
        self.ledger.destroys.fetch_add(1, Ordering::SeqCst);
    }
}
