//! `avp` - command-line client for remote cryptographic-algorithm
//! validation sessions.
//!
//! Flags select exactly one session action (the dispatcher picks the
//! highest-precedence match); server parameters and credentials come from
//! `AVP_*` environment variables. Exit status is 0 only when the chosen
//! action succeeded.

#![forbid(unsafe_code)]

mod env;
mod sha;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use avp_core::{run_session, Config, HashAlgorithm, LogLevel, Outcome, ProgressCallback};
use avp_transport::HttpSession;

/// AVP validation session client.
#[derive(Parser)]
#[command(name = "avp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Progress verbosity for provider messages.
    #[arg(long, value_enum, default_value_t = Verbosity::Status)]
    verbosity: Verbosity,

    /// Mark the session as a sample run (server returns expected results).
    #[arg(long)]
    sample: bool,

    /// Perform a single GET against the given server URL and exit.
    #[arg(long, value_name = "URL")]
    get: Option<String>,

    /// POST the given JSON file to the server and exit.
    #[arg(long, value_name = "FILE")]
    post: Option<PathBuf>,

    /// DELETE the given server URL and exit.
    #[arg(long, value_name = "URL")]
    delete: Option<String>,

    /// Fetch vector sets into the given file for later offline processing.
    #[arg(long, value_name = "FILE")]
    request: Option<PathBuf>,

    /// Bind a user-supplied registration document instead of the built-in
    /// capability registration.
    #[arg(long, value_name = "FILE")]
    manual_registration: Option<PathBuf>,

    /// Print the expected vector-set count for the registration and exit.
    #[arg(long)]
    get_cost: bool,

    /// Print (or save) the registration document and exit.
    #[arg(long)]
    get_registration: bool,

    /// Run local known-answer tests from the given file and exit.
    #[arg(long, value_name = "FILE")]
    kat: Option<PathBuf>,

    /// Process vector sets offline from this request file. Requires
    /// --vector-rsp.
    #[arg(long, value_name = "FILE")]
    vector_req: Option<PathBuf>,

    /// Write offline vector responses to this file. Requires --vector-req.
    #[arg(long, value_name = "FILE")]
    vector_rsp: Option<PathBuf>,

    /// Upload previously computed vector responses from the given file.
    #[arg(long, value_name = "FILE")]
    vector_upload: Option<PathBuf>,

    /// Submit the given file with PUT for validation.
    #[arg(long, value_name = "FILE")]
    put: Option<PathBuf>,

    /// Fetch results for the session in --session-file.
    #[arg(long)]
    get_results: bool,

    /// Resume the session in --session-file.
    #[arg(long)]
    resume: bool,

    /// Cancel the session in --session-file.
    #[arg(long)]
    cancel: bool,

    /// Fetch expected results for the sample session in --session-file.
    #[arg(long)]
    get_expected: bool,

    /// POST the given resources file alongside the test run.
    #[arg(long, value_name = "FILE")]
    post_resources: Option<PathBuf>,

    /// Submit a certification request alongside the test run.
    #[arg(long, value_name = "FILE")]
    cert_request: Option<PathBuf>,

    /// Session state file naming a previously created session.
    #[arg(long, value_name = "FILE")]
    session_file: Option<PathBuf>,

    /// Save fetched documents here instead of printing them.
    #[arg(long, value_name = "FILE")]
    save_to: Option<PathBuf>,

    /// Operating-environment metadata file for FIPS validation.
    #[arg(long, value_name = "FILE")]
    metadata: Option<PathBuf>,

    /// Request FIPS validation for the session. Requires --metadata.
    #[arg(long)]
    fips: bool,

    /// Skip the startup self-test and run without validation assurance.
    #[arg(long)]
    no_fips: bool,

    /// Register only the named hash algorithm; repeatable. Defaults to the
    /// full SHA-2 family.
    #[arg(long = "hash", value_name = "ALG", value_parser = parse_hash)]
    hashes: Vec<HashAlgorithm>,

    /// Register no algorithms at all (an empty registration).
    #[arg(long, conflicts_with = "hashes")]
    no_algorithms: bool,
}

fn parse_hash(name: &str) -> Result<HashAlgorithm, String> {
    HashAlgorithm::from_name(name).ok_or_else(|| format!("unknown hash algorithm: {name}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Verbosity {
    None,
    Error,
    Warning,
    Status,
    Info,
    Verbose,
    Debug,
}

impl From<Verbosity> for LogLevel {
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::None => Self::None,
            Verbosity::Error => Self::Error,
            Verbosity::Warning => Self::Warning,
            Verbosity::Status => Self::Status,
            Verbosity::Info => Self::Info,
            Verbosity::Verbose => Self::Verbose,
            Verbosity::Debug => Self::Debug,
        }
    }
}

impl Cli {
    fn into_config(self, server: avp_core::ServerConfig) -> Config {
        let (hashes, empty_algorithms) = if self.no_algorithms {
            (Vec::new(), true)
        } else if self.hashes.is_empty() {
            (HashAlgorithm::ALL.to_vec(), false)
        } else {
            (self.hashes, false)
        };
        Config {
            server,
            level: self.verbosity.into(),
            sample: self.sample,
            get_url: self.get,
            post_file: self.post,
            delete_url: self.delete,
            request_only_file: self.request,
            manual_registration_file: self.manual_registration,
            get_cost: self.get_cost,
            get_registration: self.get_registration,
            kat_file: self.kat,
            vector_request_file: self.vector_req,
            vector_response_file: self.vector_rsp,
            vector_upload_file: self.vector_upload,
            put_file: self.put,
            get_results: self.get_results,
            resume_session: self.resume,
            cancel_session: self.cancel,
            get_expected: self.get_expected,
            post_resources_file: self.post_resources,
            cert_request_file: self.cert_request,
            session_file: self.session_file,
            save_file: self.save_to,
            metadata_file: self.metadata,
            fips_validation: self.fips,
            empty_algorithms,
            hashes,
        }
    }
}

/// Forward provider progress into the tracing pipeline on stderr, keeping
/// stdout clean for fetched documents.
fn progress_sink() -> ProgressCallback {
    Box::new(|level, message| match level {
        LogLevel::None => {}
        LogLevel::Error => error!("{message}"),
        LogLevel::Warning => warn!("{message}"),
        LogLevel::Status | LogLevel::Info => info!("{message}"),
        LogLevel::Verbose => tracing::debug!("{message}"),
        LogLevel::Debug => tracing::trace!("{message}"),
    })
}

fn run(cli: Cli) -> anyhow::Result<Outcome> {
    if cli.no_fips {
        warn!("startup self-test skipped; results are not suitable for validation submissions");
    } else {
        sha::self_test().context("SHA2-256 startup self-test failed")?;
        info!("SHA2-256 startup self-test passed");
    }

    let server = env::server_config()?;
    let level = cli.verbosity.into();
    let config = cli.into_config(server);

    let provider = Box::new(HttpSession::new(progress_sink(), level));
    Ok(run_session(&config, provider, sha::evaluate))
}

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays clean for fetched documents.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(outcome) => u8::try_from(outcome.exit_code())
            .map_or(ExitCode::FAILURE, ExitCode::from),
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(args: &[&str]) -> Config {
        let cli = Cli::try_parse_from(args).unwrap();
        cli.into_config(avp_core::ServerConfig::default())
    }

    #[test]
    fn defaults_register_the_full_family() {
        let config = config_for(&["avp"]);
        assert_eq!(config.hashes, HashAlgorithm::ALL.to_vec());
        assert!(!config.empty_algorithms);
        assert_eq!(config.level, LogLevel::Status);
    }

    #[test]
    fn hash_flags_restrict_the_registration() {
        let config = config_for(&["avp", "--hash", "SHA2-256", "--hash", "SHA2-512/224"]);
        assert_eq!(
            config.hashes,
            vec![HashAlgorithm::Sha2_256, HashAlgorithm::Sha2_512_224]
        );
    }

    #[test]
    fn unknown_hash_name_is_a_parse_error() {
        assert!(Cli::try_parse_from(["avp", "--hash", "SHA3-256"]).is_err());
    }

    #[test]
    fn no_algorithms_yields_an_empty_registration() {
        let config = config_for(&["avp", "--no-algorithms", "--put", "meta.json"]);
        assert!(config.hashes.is_empty());
        assert!(config.empty_algorithms);
        assert_eq!(config.put_file.as_deref(), Some("meta.json".as_ref()));
    }

    #[test]
    fn no_algorithms_conflicts_with_hash_selection() {
        assert!(Cli::try_parse_from(["avp", "--no-algorithms", "--hash", "SHA2-256"]).is_err());
    }

    #[test]
    fn mode_flags_map_onto_the_config() {
        let config = config_for(&[
            "avp",
            "--sample",
            "--get-cost",
            "--fips",
            "--metadata",
            "oe.json",
            "--session-file",
            "session.json",
        ]);
        assert!(config.sample);
        assert!(config.get_cost);
        assert!(config.fips_validation);
        assert_eq!(config.metadata_file.as_deref(), Some("oe.json".as_ref()));
        assert!(config.validate().is_ok());
    }
}
