//! AVP Core - control layer for a remote cryptographic-algorithm
//! validation client.
//!
//! The hard part here is the session-action dispatcher: a priority-ordered,
//! mutually-exclusive decision process that selects exactly one terminal
//! session action (plus a small ordered run of side actions) from the
//! configuration, and fails safely when flag combinations conflict.
//!
//! The validation-protocol client library itself is a collaborator behind
//! the [`SessionProvider`] trait; this crate registers capabilities,
//! dispatches actions, and reports outcomes, but never touches the wire.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod provider;
pub mod registrar;
pub mod report;
pub mod session;

pub use capability::{Domain, DomainParam, HashAlgorithm, HashHandler, HashTestCase, HashTestKind};
pub use config::{Config, ServerConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_URI_PREFIX};
pub use dispatch::{Action, Outcome, OutcomeCode, Payload, SideFailure, Step};
pub use error::{ConfigError, DispatchError, SessionError};
pub use provider::{LogLevel, ProgressCallback, SessionProvider};
pub use session::SessionContext;

use tracing::error;

/// Run one validation session: wire the session parameters, register
/// capabilities (unless a manual registration document is bound), dispatch
/// the selected actions, and tear the session down.
///
/// This is the single entry point exposed to the surrounding CLI layer.
/// The provider handle is destroyed exactly once on every path out of this
/// function, including early error returns.
pub fn run_session(
    config: &Config,
    provider: Box<dyn SessionProvider>,
    hash_handler: HashHandler,
) -> Outcome {
    // The context guard exists before anything can fail, so teardown runs
    // exactly once on every path out of here, conflicts included.
    let mut session = SessionContext::new(provider);

    // Local conflict detection happens before the session touches anything.
    let actions = match dispatch::plan(config) {
        Ok(actions) => actions,
        Err(err) => {
            error!("{err}");
            return Outcome::failure(err.into(), Vec::new());
        }
    };

    if let Err(err) = setup_session(&mut session, config) {
        error!("{err}");
        return Outcome::failure(err, Vec::new());
    }

    // Manual registration and the capability registrar are mutually
    // exclusive; the dispatch plan binds the document instead.
    if config.manual_registration_file.is_none() {
        if let Err(err) =
            registrar::register_capabilities(session.provider_mut(), &config.hashes, hash_handler)
        {
            error!("{err}");
            return Outcome::failure(err, Vec::new());
        }
    }

    dispatch::execute(&actions, &mut session, config)
}

/// Apply server parameters, credentials, and session marks to a fresh
/// session, in the order the collaborator library expects them.
fn setup_session(session: &mut SessionContext, cfg: &Config) -> Result<(), DispatchError> {
    fn during(
        operation: &'static str,
    ) -> impl FnOnce(SessionError) -> DispatchError {
        move |source| DispatchError::Operation { operation, source }
    }

    let provider = session.provider_mut();
    let server = &cfg.server;

    provider
        .set_server(&server.host, server.port)
        .map_err(during("server endpoint setup"))?;
    provider
        .set_api_context(&server.api_context)
        .map_err(during("API context setup"))?;
    provider
        .set_path_segment(&server.uri_prefix)
        .map_err(during("URI prefix setup"))?;

    if let Some(ca_file) = &server.ca_file {
        provider
            .set_ca_bundle(ca_file)
            .map_err(during("CA bundle setup"))?;
    }
    if let (Some(cert), Some(key)) = (&server.cert_file, &server.key_file) {
        provider
            .set_client_identity(cert, key)
            .map_err(during("TLS client identity setup"))?;
    }
    if let Some(seed) = &server.totp_seed {
        provider
            .set_totp_seed(seed)
            .map_err(during("two-factor auth setup"))?;
    }

    if cfg.sample {
        provider
            .mark_as_sample()
            .map_err(during("sample mark"))?;
    }
    if let Some(url) = &cfg.get_url {
        provider
            .mark_as_get_only(url)
            .map_err(during("get-only mark"))?;
        if let Some(save) = &cfg.save_file {
            // A failed save-file bind only costs the persisted copy.
            if let Err(err) = provider.set_get_save_file(save) {
                tracing::warn!("failed to set the save file for the get request: {err}; continuing");
            }
        }
    }
    if let Some(file) = &cfg.post_file {
        provider
            .mark_as_post_only(file)
            .map_err(during("post-only mark"))?;
    }
    if let Some(url) = &cfg.delete_url {
        provider
            .mark_as_delete_only(url)
            .map_err(during("delete-only mark"))?;
    }
    if let Some(file) = &cfg.request_only_file {
        provider
            .mark_as_request_only(file)
            .map_err(during("request-only mark"))?;
    }

    Ok(())
}
