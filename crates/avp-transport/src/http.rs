//! Blocking-HTTP session provider.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use avp_core::capability::{Domain, DomainParam, HashAlgorithm, HashHandler};
use avp_core::error::SessionError;
use avp_core::provider::{LogLevel, ProgressCallback, SessionProvider};

/// Request timeout for every server call. The control layer never retries;
/// a timeout surfaces as a transport failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A capability declared against the session.
#[derive(Debug, Clone)]
struct RegisteredCapability {
    algorithm: HashAlgorithm,
    domains: Vec<(DomainParam, Domain)>,
}

/// Reference to a previously persisted session, as stored in a session
/// state file.
#[derive(Debug, Clone, Deserialize)]
struct SessionRef {
    url: String,
    #[serde(rename = "accessToken", default)]
    access_token: Option<String>,
}

/// One validation session over HTTPS.
///
/// Connection parameters and marks accumulate locally until a
/// network-bearing operation builds the client and talks to the server.
pub struct HttpSession {
    progress: ProgressCallback,
    level: LogLevel,

    host: String,
    port: u16,
    path_segment: String,
    api_context: String,
    ca_file: Option<PathBuf>,
    cert_file: Option<PathBuf>,
    key_file: Option<PathBuf>,
    totp_seed: Option<String>,

    sample: bool,
    get_only: Option<String>,
    get_save_file: Option<PathBuf>,
    post_only: Option<PathBuf>,
    delete_only: Option<String>,
    request_only: Option<PathBuf>,
    put_after_test: Option<PathBuf>,
    post_resources: Option<PathBuf>,
    cert_request: Option<PathBuf>,

    manual_registration: Option<Value>,
    capabilities: Vec<RegisteredCapability>,
    handlers: HashMap<HashAlgorithm, HashHandler>,

    module_id: Option<u32>,
    oe_id: Option<u32>,
    oe_metadata: Option<Value>,

    access_token: Option<String>,
    client: Option<Client>,
}

impl HttpSession {
    /// Create a session reporting progress through `progress` at `level`.
    #[must_use]
    pub fn new(progress: ProgressCallback, level: LogLevel) -> Self {
        Self {
            progress,
            level,
            host: String::new(),
            port: 0,
            path_segment: String::new(),
            api_context: String::new(),
            ca_file: None,
            cert_file: None,
            key_file: None,
            totp_seed: None,
            sample: false,
            get_only: None,
            get_save_file: None,
            post_only: None,
            delete_only: None,
            request_only: None,
            put_after_test: None,
            post_resources: None,
            cert_request: None,
            manual_registration: None,
            capabilities: Vec::new(),
            handlers: HashMap::new(),
            module_id: None,
            oe_id: None,
            oe_metadata: None,
            access_token: None,
            client: None,
        }
    }

    fn log(&self, level: LogLevel, message: &str) {
        if level != LogLevel::None && level <= self.level {
            (self.progress)(level, message);
        }
    }

    /// Base URL for API endpoints, honoring an optional API context.
    fn base_url(&self) -> String {
        if self.api_context.is_empty() {
            format!("https://{}:{}/{}", self.host, self.port, self.path_segment)
        } else {
            format!(
                "https://{}:{}/{}/{}",
                self.host, self.port, self.api_context, self.path_segment
            )
        }
    }

    /// Resolve a server-relative URL (as found in session state files).
    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http") {
            url.to_owned()
        } else {
            format!("https://{}:{}{}", self.host, self.port, url)
        }
    }

    /// Build (or reuse) the HTTP client with the configured trust anchors
    /// and client identity. `Client` clones share the connection pool.
    fn client(&mut self) -> Result<Client, SessionError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT).use_rustls_tls();
        if let Some(ca) = &self.ca_file {
            let pem = fs::read(ca).map_err(|err| SessionError::io("CA bundle read", err))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|err| SessionError::validation(format!("bad CA bundle: {err}")))?;
            builder = builder.add_root_certificate(cert);
        }
        if let (Some(cert), Some(key)) = (&self.cert_file, &self.key_file) {
            let mut pem = fs::read(cert)
                .map_err(|err| SessionError::io("client certificate read", err))?;
            let key = fs::read(key).map_err(|err| SessionError::io("client key read", err))?;
            pem.extend_from_slice(&key);
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|err| SessionError::validation(format!("bad client identity: {err}")))?;
            builder = builder.identity(identity);
        }
        let client = builder
            .build()
            .map_err(|err| SessionError::transport(format!("client build failed: {err}")))?;
        self.client = Some(client.clone());
        Ok(client)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request;
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(seed) = &self.totp_seed {
            request = request.header("X-AVP-TOTP", seed);
        }
        request
    }

    /// Send a request and map the status onto the error taxonomy.
    fn send(
        &mut self,
        operation: &'static str,
        build: impl FnOnce(&Client) -> RequestBuilder,
    ) -> Result<String, SessionError> {
        let client = self.client()?;
        let request = self.authorize(build(&client));
        let response = request
            .send()
            .map_err(|err| SessionError::transport(format!("{operation}: {err}")))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| SessionError::transport(format!("{operation}: {err}")))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(SessionError::validation(format!(
                "{operation}: server returned {status}: {body}"
            )))
        }
    }

    /// The registration document the session would submit.
    fn registration_document(&self) -> Value {
        if let Some(manual) = &self.manual_registration {
            return manual.clone();
        }
        let algorithms: Vec<Value> = self
            .capabilities
            .iter()
            .map(|cap| {
                let mut entry = json!({ "algorithm": cap.algorithm.as_str() });
                for (param, domain) in &cap.domains {
                    entry[param.as_str()] = json!([{
                        "min": domain.min,
                        "max": domain.max,
                        "increment": domain.granularity,
                    }]);
                }
                entry
            })
            .collect();
        json!({ "isSample": self.sample, "algorithms": algorithms })
    }

    /// Create the test session on the server and remember its token.
    fn create_session(&mut self, fips_validation: bool) -> Result<SessionRef, SessionError> {
        let mut payload = json!({
            "registration": self.registration_document(),
            "fipsValidation": fips_validation,
        });
        if fips_validation {
            payload["moduleId"] = json!(self.module_id);
            payload["oeId"] = json!(self.oe_id);
        }
        let url = format!("{}/testSessions", self.base_url());
        let body = self.send("test session creation", move |client| {
            client.post(&url).json(&payload)
        })?;
        let session: SessionRef = serde_json::from_str(&body).map_err(|err| {
            SessionError::validation(format!("malformed session response: {err}"))
        })?;
        self.access_token.clone_from(&session.access_token);
        self.log(LogLevel::Status, "test session created");
        Ok(session)
    }

    fn load_session_ref(path: &Path) -> Result<SessionRef, SessionError> {
        let text = read_file(path, "session state")?;
        serde_json::from_str(&text)
            .map_err(|err| SessionError::validation(format!("malformed session state: {err}")))
    }

    /// Save a response body for the user; a failed save only costs the
    /// persisted copy, never the action.
    fn save_or_log(&self, label: &str, body: &str, save_to: Option<&Path>) {
        match save_to {
            Some(path) => {
                if let Err(err) = fs::write(path, body) {
                    warn!("failed to save {label} to {}: {err}", path.display());
                }
            }
            None => self.log(LogLevel::Status, body),
        }
    }
}

fn read_file(path: &Path, what: &str) -> Result<String, SessionError> {
    fs::read_to_string(path)
        .map_err(|err| SessionError::io(format!("{what} read from {}", path.display()), err))
}

impl SessionProvider for HttpSession {
    fn set_server(&mut self, host: &str, port: u16) -> Result<(), SessionError> {
        if host.is_empty() {
            return Err(SessionError::validation("server host must not be empty"));
        }
        self.host = host.to_owned();
        self.port = port;
        Ok(())
    }

    fn set_api_context(&mut self, context: &str) -> Result<(), SessionError> {
        self.api_context = context.trim_matches('/').to_owned();
        Ok(())
    }

    fn set_path_segment(&mut self, segment: &str) -> Result<(), SessionError> {
        self.path_segment = segment.trim_matches('/').to_owned();
        Ok(())
    }

    fn set_ca_bundle(&mut self, path: &Path) -> Result<(), SessionError> {
        self.ca_file = Some(path.to_owned());
        self.client = None;
        Ok(())
    }

    fn set_client_identity(&mut self, cert: &Path, key: &Path) -> Result<(), SessionError> {
        self.cert_file = Some(cert.to_owned());
        self.key_file = Some(key.to_owned());
        self.client = None;
        Ok(())
    }

    fn set_totp_seed(&mut self, seed: &str) -> Result<(), SessionError> {
        if seed.is_empty() {
            return Err(SessionError::validation("TOTP seed must not be empty"));
        }
        self.totp_seed = Some(seed.to_owned());
        Ok(())
    }

    fn mark_as_sample(&mut self) -> Result<(), SessionError> {
        self.sample = true;
        Ok(())
    }

    fn mark_as_get_only(&mut self, url: &str) -> Result<(), SessionError> {
        self.get_only = Some(url.to_owned());
        Ok(())
    }

    fn set_get_save_file(&mut self, path: &Path) -> Result<(), SessionError> {
        self.get_save_file = Some(path.to_owned());
        Ok(())
    }

    fn mark_as_post_only(&mut self, path: &Path) -> Result<(), SessionError> {
        self.post_only = Some(path.to_owned());
        Ok(())
    }

    fn mark_as_delete_only(&mut self, url: &str) -> Result<(), SessionError> {
        self.delete_only = Some(url.to_owned());
        Ok(())
    }

    fn mark_as_request_only(&mut self, path: &Path) -> Result<(), SessionError> {
        self.request_only = Some(path.to_owned());
        Ok(())
    }

    fn mark_as_put_after_test(&mut self, path: &Path) -> Result<(), SessionError> {
        self.put_after_test = Some(path.to_owned());
        Ok(())
    }

    fn set_registration_file(&mut self, path: &Path) -> Result<(), SessionError> {
        let text = read_file(path, "manual registration")?;
        let document = serde_json::from_str(&text).map_err(|err| {
            SessionError::validation(format!("malformed registration document: {err}"))
        })?;
        self.manual_registration = Some(document);
        Ok(())
    }

    fn register_capability(
        &mut self,
        algorithm: HashAlgorithm,
        handler: HashHandler,
    ) -> Result<(), SessionError> {
        if self.capabilities.iter().any(|c| c.algorithm == algorithm) {
            return Err(SessionError::validation(format!(
                "{algorithm} is already registered"
            )));
        }
        self.capabilities.push(RegisteredCapability {
            algorithm,
            domains: Vec::new(),
        });
        self.handlers.insert(algorithm, handler);
        Ok(())
    }

    fn set_capability_domain(
        &mut self,
        algorithm: HashAlgorithm,
        parameter: DomainParam,
        domain: Domain,
    ) -> Result<(), SessionError> {
        let capability = self
            .capabilities
            .iter_mut()
            .find(|c| c.algorithm == algorithm)
            .ok_or_else(|| SessionError::NoCapability {
                algorithm: algorithm.to_string(),
            })?;
        capability.domains.push((parameter, domain));
        Ok(())
    }

    fn vector_set_count(&mut self) -> Option<usize> {
        if let Some(manual) = &self.manual_registration {
            return manual
                .get("algorithms")
                .and_then(Value::as_array)
                .map(Vec::len);
        }
        if self.capabilities.is_empty() {
            None
        } else {
            Some(self.capabilities.len())
        }
    }

    fn current_registration(&mut self) -> Result<String, SessionError> {
        serde_json::to_string_pretty(&self.registration_document())
            .map_err(|err| SessionError::validation(format!("registration encoding: {err}")))
    }

    fn load_kat_file(&mut self, path: &Path) -> Result<(), SessionError> {
        let text = read_file(path, "known-answer test file")?;
        let entries: Vec<crate::vectors::KatEntry> = serde_json::from_str(&text)
            .map_err(|err| SessionError::validation(format!("malformed KAT file: {err}")))?;
        let (passed, failed) = crate::vectors::run_kat_entries(&entries, &self.handlers)?;
        if failed > 0 {
            return Err(SessionError::validation(format!(
                "{failed} of {} known-answer tests failed",
                passed + failed
            )));
        }
        self.log(
            LogLevel::Status,
            &format!("all {passed} known-answer tests passed"),
        );
        Ok(())
    }

    fn run_vectors_from_files(
        &mut self,
        request: &Path,
        response: &Path,
    ) -> Result<(), SessionError> {
        let text = read_file(request, "vector request file")?;
        let sets: Vec<crate::vectors::VectorSet> = serde_json::from_str(&text).map_err(|err| {
            SessionError::validation(format!("malformed vector request file: {err}"))
        })?;
        let responses = crate::vectors::process_vector_sets(&sets, &self.handlers)?;
        let body = serde_json::to_string_pretty(&responses)
            .map_err(|err| SessionError::validation(format!("response encoding: {err}")))?;
        fs::write(response, body).map_err(|err| {
            SessionError::io(
                format!("vector response write to {}", response.display()),
                err,
            )
        })?;
        self.log(
            LogLevel::Status,
            &format!("processed {} vector sets offline", sets.len()),
        );
        Ok(())
    }

    fn upload_vectors_from_file(
        &mut self,
        path: &Path,
        fips_validation: bool,
    ) -> Result<(), SessionError> {
        let body = read_file(path, "vector response file")?;
        let url = format!(
            "{}/testSessions/results?fipsValidation={fips_validation}",
            self.base_url()
        );
        self.send("vector upload", move |client| {
            client
                .post(&url)
                .header("content-type", "application/json")
                .body(body)
        })?;
        self.log(LogLevel::Status, "vector responses uploaded");
        Ok(())
    }

    fn ingest_oe_metadata(&mut self, path: &Path) -> Result<(), SessionError> {
        let text = read_file(path, "operating-environment metadata")?;
        let metadata = serde_json::from_str(&text).map_err(|err| {
            SessionError::validation(format!("malformed operating-environment metadata: {err}"))
        })?;
        self.oe_metadata = Some(metadata);
        Ok(())
    }

    fn set_fips_validation_metadata(
        &mut self,
        module_id: u32,
        oe_id: u32,
    ) -> Result<(), SessionError> {
        if self.oe_metadata.is_none() {
            return Err(SessionError::validation(
                "operating-environment metadata must be ingested first",
            ));
        }
        self.module_id = Some(module_id);
        self.oe_id = Some(oe_id);
        Ok(())
    }

    fn put_data_from_file(&mut self, path: &Path) -> Result<(), SessionError> {
        let body = read_file(path, "PUT payload")?;
        let url = format!("{}/testSessions", self.base_url());
        self.send("PUT data submission", move |client| {
            client
                .put(&url)
                .header("content-type", "application/json")
                .body(body)
        })?;
        self.log(LogLevel::Status, "PUT payload submitted for validation");
        Ok(())
    }

    fn run(&mut self, fips_validation: bool) -> Result<(), SessionError> {
        if let Some(url) = self.get_only.clone() {
            let target = self.absolute(&url);
            let body = self.send("get-only request", move |client| client.get(&target))?;
            self.save_or_log("get response", &body, self.get_save_file.clone().as_deref());
            return Ok(());
        }
        if let Some(file) = self.post_only.clone() {
            let body = read_file(&file, "post payload")?;
            let url = format!("{}/testSessions", self.base_url());
            self.send("post-only request", move |client| {
                client
                    .post(&url)
                    .header("content-type", "application/json")
                    .body(body)
            })?;
            return Ok(());
        }
        if let Some(url) = self.delete_only.clone() {
            let target = self.absolute(&url);
            self.send("delete-only request", move |client| client.delete(&target))?;
            return Ok(());
        }
        if let Some(file) = self.request_only.clone() {
            let payload = json!({
                "registration": self.registration_document(),
                "vectorsOnly": true,
            });
            let url = format!("{}/testSessions", self.base_url());
            let body = self.send("vector request", move |client| {
                client.post(&url).json(&payload)
            })?;
            fs::write(&file, body).map_err(|err| {
                SessionError::io(format!("vector request write to {}", file.display()), err)
            })?;
            self.log(LogLevel::Status, "vector sets saved for offline processing");
            return Ok(());
        }

        let session = self.create_session(fips_validation)?;

        // Non-enforced side payloads ride along with the run; their status
        // was already recorded when they were marked.
        if let Some(file) = self.post_resources.clone() {
            let body = read_file(&file, "resources payload")?;
            let url = format!("{}/resources", self.base_url());
            if let Err(err) = self.send("resource post", move |client| {
                client
                    .post(&url)
                    .header("content-type", "application/json")
                    .body(body)
            }) {
                warn!("resource post failed: {err}; continuing");
            }
        }
        if let Some(file) = self.cert_request.clone() {
            let body = read_file(&file, "certification request payload")?;
            let url = format!("{}/certRequests", self.base_url());
            if let Err(err) = self.send("certification request", move |client| {
                client
                    .post(&url)
                    .header("content-type", "application/json")
                    .body(body)
            }) {
                warn!("certification request failed: {err}; continuing");
            }
        }

        if let Some(file) = self.put_after_test.clone() {
            let body = read_file(&file, "deferred PUT payload")?;
            let target = self.absolute(&session.url);
            self.send("deferred PUT submission", move |client| {
                client
                    .put(&target)
                    .header("content-type", "application/json")
                    .body(body)
            })?;
        }

        self.log(LogLevel::Status, "test session run complete");
        Ok(())
    }

    fn resume(&mut self, session_file: &Path, fips_validation: bool) -> Result<(), SessionError> {
        let session = Self::load_session_ref(session_file)?;
        self.access_token.clone_from(&session.access_token);
        let target = format!(
            "{}?fipsValidation={fips_validation}",
            self.absolute(&session.url)
        );
        self.send("session resume", move |client| client.get(&target))?;
        self.log(LogLevel::Status, "test session resumed");
        Ok(())
    }

    fn cancel(
        &mut self,
        session_file: &Path,
        save_to: Option<&Path>,
    ) -> Result<(), SessionError> {
        let session = Self::load_session_ref(session_file)?;
        self.access_token.clone_from(&session.access_token);
        let target = self.absolute(&session.url);
        let body = self.send("session cancellation", move |client| client.delete(&target))?;
        self.save_or_log("cancellation confirmation", &body, save_to);
        Ok(())
    }

    fn expected_results(
        &mut self,
        session_file: &Path,
        save_to: Option<&Path>,
    ) -> Result<(), SessionError> {
        let session = Self::load_session_ref(session_file)?;
        self.access_token.clone_from(&session.access_token);
        let target = format!("{}/expected", self.absolute(&session.url));
        let body = self.send("expected results fetch", move |client| client.get(&target))?;
        self.save_or_log("expected results", &body, save_to);
        Ok(())
    }

    fn results(&mut self, session_file: &Path) -> Result<(), SessionError> {
        let session = Self::load_session_ref(session_file)?;
        self.access_token.clone_from(&session.access_token);
        let target = format!("{}/results", self.absolute(&session.url));
        let body = self.send("results fetch", move |client| client.get(&target))?;
        self.log(LogLevel::Status, &body);
        Ok(())
    }

    fn mark_as_post_resources(&mut self, path: &Path) -> Result<(), SessionError> {
        if !path.exists() {
            return Err(SessionError::io(
                "resources payload",
                format!("{} does not exist", path.display()),
            ));
        }
        self.post_resources = Some(path.to_owned());
        Ok(())
    }

    fn mark_as_cert_request(&mut self, path: &Path) -> Result<(), SessionError> {
        if !path.exists() {
            return Err(SessionError::io(
                "certification request payload",
                format!("{} does not exist", path.display()),
            ));
        }
        self.cert_request = Some(path.to_owned());
        Ok(())
    }

    fn destroy(&mut self) {
        self.access_token = None;
        self.client = None;
        self.log(LogLevel::Debug, "session destroyed");
    }
}
