//! The session-action dispatcher.
//!
//! A priority-ordered, mutually-exclusive decision list: evaluated
//! top-to-bottom, first applicable terminal step wins, and the side effects
//! of earlier non-terminal steps persist. The ordering encodes precedence
//! among administrative single-shot operations (inspect, cancel, resume)
//! and bulk operations (run, upload); a single-shot operation is never
//! silently combined with a full run.
//!
//! [`plan`] derives the ordered action sequence purely from the
//! configuration, so the precedence rules are auditable and testable
//! without a provider. [`execute`] runs a plan against a live session.

use std::path::PathBuf;

use tracing::{error, warn};

use crate::config::Config;
use crate::error::{ConfigError, DispatchError, SessionError};
use crate::report;
use crate::session::SessionContext;

/// Module identifier bound during FIPS validation.
pub const DEFAULT_MODULE_ID: u32 = 1;
/// Operating-environment identifier bound during FIPS validation.
pub const DEFAULT_OE_ID: u32 = 1;

/// Identity of one step in the dispatch decision list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    BindManualRegistration,
    CostEstimate,
    FetchRegistration,
    LoadKat,
    OfflineVectors,
    FipsMetadata,
    UploadVectors,
    PutDirect,
    PutDeferred,
    FetchResults,
    ResumeSession,
    CancelSession,
    ExpectedResults,
    PostResources,
    CertRequest,
    Run,
}

impl Step {
    /// Evaluation order of the decision list.
    pub const ORDER: [Self; 16] = [
        Self::BindManualRegistration,
        Self::CostEstimate,
        Self::FetchRegistration,
        Self::LoadKat,
        Self::OfflineVectors,
        Self::FipsMetadata,
        Self::UploadVectors,
        Self::PutDirect,
        Self::PutDeferred,
        Self::FetchResults,
        Self::ResumeSession,
        Self::CancelSession,
        Self::ExpectedResults,
        Self::PostResources,
        Self::CertRequest,
        Self::Run,
    ];

    /// Terminal steps end the dispatch; non-terminal steps fall through.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(
            self,
            Self::BindManualRegistration
                | Self::FipsMetadata
                | Self::PutDeferred
                | Self::PostResources
                | Self::CertRequest
        )
    }

    /// Whether a failure of this step aborts the dispatch. Terminal steps
    /// always do; of the non-terminal steps, only registration binding and
    /// FIPS metadata ingestion are load-bearing for what follows.
    #[must_use]
    pub const fn fatal_on_error(self) -> bool {
        self.is_terminal() || matches!(self, Self::BindManualRegistration | Self::FipsMetadata)
    }

    /// Whether this step reaches the live server.
    #[must_use]
    pub const fn contacts_server(self) -> bool {
        matches!(
            self,
            Self::UploadVectors
                | Self::PutDirect
                | Self::FetchResults
                | Self::ResumeSession
                | Self::CancelSession
                | Self::ExpectedResults
                | Self::Run
        )
    }

    /// Human-readable operation name used in failure reports.
    #[must_use]
    pub const fn operation(self) -> &'static str {
        match self {
            Self::BindManualRegistration => "manual registration binding",
            Self::CostEstimate => "vector-set cost estimate",
            Self::FetchRegistration => "fetch of the current registration",
            Self::LoadKat => "known-answer test processing",
            Self::OfflineVectors => "offline vector processing",
            Self::FipsMetadata => "FIPS validation metadata ingestion",
            Self::UploadVectors => "vector response upload",
            Self::PutDirect => "PUT data submission",
            Self::PutDeferred => "PUT deferral mark",
            Self::FetchResults => "fetch of session results",
            Self::ResumeSession => "session resume",
            Self::CancelSession => "session cancellation",
            Self::ExpectedResults => "fetch of expected results",
            Self::PostResources => "post-resources mark",
            Self::CertRequest => "certification request mark",
            Self::Run => "test session run",
        }
    }
}

/// One planned action: a step plus the configuration it operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    BindManualRegistration {
        file: PathBuf,
    },
    CostEstimate,
    FetchRegistration {
        save_to: Option<PathBuf>,
    },
    LoadKat {
        file: PathBuf,
    },
    OfflineVectors {
        request: PathBuf,
        response: PathBuf,
    },
    FipsMetadata {
        file: PathBuf,
    },
    UploadVectors {
        file: PathBuf,
        fips_validation: bool,
    },
    PutDirect {
        file: PathBuf,
    },
    PutDeferred {
        file: PathBuf,
    },
    FetchResults {
        session_file: PathBuf,
    },
    ResumeSession {
        session_file: PathBuf,
        fips_validation: bool,
    },
    CancelSession {
        session_file: PathBuf,
        save_to: Option<PathBuf>,
    },
    ExpectedResults {
        session_file: PathBuf,
        save_to: Option<PathBuf>,
    },
    PostResources {
        file: PathBuf,
    },
    CertRequest {
        file: PathBuf,
    },
    Run {
        fips_validation: bool,
    },
}

impl Action {
    /// Instantiate the action for `step` when its predicate holds.
    fn for_step(step: Step, cfg: &Config) -> Option<Self> {
        match step {
            Step::BindManualRegistration => {
                cfg.manual_registration_file
                    .clone()
                    .map(|file| Self::BindManualRegistration { file })
            }
            Step::CostEstimate => cfg.get_cost.then_some(Self::CostEstimate),
            Step::FetchRegistration => cfg.get_registration.then(|| Self::FetchRegistration {
                save_to: cfg.save_file.clone(),
            }),
            Step::LoadKat => cfg.kat_file.clone().map(|file| Self::LoadKat { file }),
            Step::OfflineVectors => match (&cfg.vector_request_file, &cfg.vector_response_file) {
                (Some(request), Some(response)) => Some(Self::OfflineVectors {
                    request: request.clone(),
                    response: response.clone(),
                }),
                _ => None,
            },
            Step::FipsMetadata => match (cfg.fips_validation, &cfg.metadata_file) {
                (true, Some(file)) => Some(Self::FipsMetadata { file: file.clone() }),
                _ => None,
            },
            Step::UploadVectors => {
                cfg.vector_upload_file
                    .clone()
                    .map(|file| Self::UploadVectors {
                        file,
                        fips_validation: cfg.fips_validation,
                    })
            }
            Step::PutDirect => match (&cfg.put_file, cfg.empty_algorithms) {
                (Some(file), true) => Some(Self::PutDirect { file: file.clone() }),
                _ => None,
            },
            Step::PutDeferred => match (&cfg.put_file, cfg.empty_algorithms) {
                (Some(file), false) => Some(Self::PutDeferred { file: file.clone() }),
                _ => None,
            },
            Step::FetchResults => match (cfg.get_results, &cfg.session_file) {
                (true, Some(session_file)) => Some(Self::FetchResults {
                    session_file: session_file.clone(),
                }),
                _ => None,
            },
            Step::ResumeSession => match (cfg.resume_session, &cfg.session_file) {
                (true, Some(session_file)) => Some(Self::ResumeSession {
                    session_file: session_file.clone(),
                    fips_validation: cfg.fips_validation,
                }),
                _ => None,
            },
            Step::CancelSession => match (cfg.cancel_session, &cfg.session_file) {
                (true, Some(session_file)) => Some(Self::CancelSession {
                    session_file: session_file.clone(),
                    save_to: cfg.save_file.clone(),
                }),
                _ => None,
            },
            Step::ExpectedResults => match (cfg.get_expected, &cfg.session_file) {
                (true, Some(session_file)) => Some(Self::ExpectedResults {
                    session_file: session_file.clone(),
                    save_to: cfg.save_file.clone(),
                }),
                _ => None,
            },
            Step::PostResources => {
                cfg.post_resources_file
                    .clone()
                    .map(|file| Self::PostResources { file })
            }
            Step::CertRequest => cfg
                .cert_request_file
                .clone()
                .map(|file| Self::CertRequest { file }),
            Step::Run => Some(Self::Run {
                fips_validation: cfg.fips_validation,
            }),
        }
    }

    /// The decision-list step this action belongs to.
    #[must_use]
    pub const fn step(&self) -> Step {
        match self {
            Self::BindManualRegistration { .. } => Step::BindManualRegistration,
            Self::CostEstimate => Step::CostEstimate,
            Self::FetchRegistration { .. } => Step::FetchRegistration,
            Self::LoadKat { .. } => Step::LoadKat,
            Self::OfflineVectors { .. } => Step::OfflineVectors,
            Self::FipsMetadata { .. } => Step::FipsMetadata,
            Self::UploadVectors { .. } => Step::UploadVectors,
            Self::PutDirect { .. } => Step::PutDirect,
            Self::PutDeferred { .. } => Step::PutDeferred,
            Self::FetchResults { .. } => Step::FetchResults,
            Self::ResumeSession { .. } => Step::ResumeSession,
            Self::CancelSession { .. } => Step::CancelSession,
            Self::ExpectedResults { .. } => Step::ExpectedResults,
            Self::PostResources { .. } => Step::PostResources,
            Self::CertRequest { .. } => Step::CertRequest,
            Self::Run { .. } => Step::Run,
        }
    }
}

/// Result code for one dispatch, drawn from a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeCode {
    Success,
    ConfigConflict,
    TransportFailure,
    ValidationFailure,
    FileIoFailure,
}

impl OutcomeCode {
    fn from_session(error: &SessionError) -> Self {
        match error {
            SessionError::Transport { .. } => Self::TransportFailure,
            SessionError::Validation { .. } | SessionError::NoCapability { .. } => {
                Self::ValidationFailure
            }
            SessionError::Io { .. } => Self::FileIoFailure,
        }
    }
}

impl From<&DispatchError> for OutcomeCode {
    fn from(error: &DispatchError) -> Self {
        match error {
            DispatchError::Config(_) => Self::ConfigConflict,
            DispatchError::Registration { source, .. }
            | DispatchError::Operation { source, .. } => Self::from_session(source),
        }
    }
}

/// Payload produced by the terminal step, when it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Registration(String),
    VectorSetCount(usize),
}

/// A non-terminal side action whose status was recorded but not enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideFailure {
    pub step: Step,
    pub error: SessionError,
}

/// Unified status of one dispatch.
#[derive(Debug)]
pub struct Outcome {
    pub code: OutcomeCode,
    pub payload: Option<Payload>,
    pub side_failures: Vec<SideFailure>,
    pub error: Option<DispatchError>,
}

impl Outcome {
    pub(crate) fn success(payload: Option<Payload>, side_failures: Vec<SideFailure>) -> Self {
        Self {
            code: OutcomeCode::Success,
            payload,
            side_failures,
            error: None,
        }
    }

    pub(crate) fn failure(error: DispatchError, side_failures: Vec<SideFailure>) -> Self {
        Self {
            code: OutcomeCode::from(&error),
            payload: None,
            side_failures,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == OutcomeCode::Success
    }

    /// Process exit status: 0 only when the chosen terminal path succeeded.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }
}

/// Derive the ordered action sequence for one configuration.
///
/// Pure: nothing here touches a provider. Configuration conflicts are
/// rejected here, before any network action. The returned sequence is a
/// run of non-terminal side actions closed by exactly one terminal action
/// ([`Action::Run`] when nothing earlier matched).
pub fn plan(cfg: &Config) -> Result<Vec<Action>, ConfigError> {
    cfg.validate()?;
    let mut actions = Vec::new();
    for step in Step::ORDER {
        let Some(action) = Action::for_step(step, cfg) else {
            continue;
        };
        let terminal = action.step().is_terminal();
        actions.push(action);
        if terminal {
            break;
        }
    }
    Ok(actions)
}

/// Execute a plan in order against the session.
///
/// A failed fatal step reports the operation and ends the dispatch; a
/// failed non-enforced side action is recorded and the flow continues to
/// the final run.
pub fn execute(actions: &[Action], session: &mut SessionContext, cfg: &Config) -> Outcome {
    let mut side_failures = Vec::new();
    let mut payload = None;

    if cfg.server.is_default_host() && actions.iter().any(|a| a.step().contacts_server()) {
        warn!(
            "no server configured, using the default {}; set AVP_SERVER in your environment",
            cfg.server.host
        );
    }

    for action in actions {
        let step = action.step();
        match run_action(action, session, &mut payload) {
            Ok(()) => {}
            Err(source) if step.fatal_on_error() => {
                let err = DispatchError::Operation {
                    operation: step.operation(),
                    source,
                };
                error!("{err}");
                return Outcome::failure(err, side_failures);
            }
            Err(error) => {
                warn!("{} failed: {error}; continuing", step.operation());
                side_failures.push(SideFailure { step, error });
            }
        }
    }

    Outcome::success(payload, side_failures)
}

fn run_action(
    action: &Action,
    session: &mut SessionContext,
    payload: &mut Option<Payload>,
) -> Result<(), SessionError> {
    let provider = session.provider_mut();
    match action {
        Action::BindManualRegistration { file } => provider.set_registration_file(file),
        Action::CostEstimate => {
            match provider.vector_set_count() {
                Some(count) => {
                    println!(
                        "The current registration is expected to generate {count} vector sets."
                    );
                    *payload = Some(Payload::VectorSetCount(count));
                }
                None => println!(
                    "Unable to estimate the vector set count for the current registration."
                ),
            }
            Ok(())
        }
        Action::FetchRegistration { save_to } => {
            let registration = provider.current_registration()?;
            report::deliver("registration", &registration, save_to.as_deref());
            *payload = Some(Payload::Registration(registration));
            Ok(())
        }
        Action::LoadKat { file } => provider.load_kat_file(file),
        Action::OfflineVectors { request, response } => {
            provider.run_vectors_from_files(request, response)
        }
        Action::FipsMetadata { file } => {
            provider.ingest_oe_metadata(file)?;
            provider.set_fips_validation_metadata(DEFAULT_MODULE_ID, DEFAULT_OE_ID)
        }
        Action::UploadVectors {
            file,
            fips_validation,
        } => provider.upload_vectors_from_file(file, *fips_validation),
        Action::PutDirect { file } => provider.put_data_from_file(file),
        Action::PutDeferred { file } => provider.mark_as_put_after_test(file),
        Action::FetchResults { session_file } => provider.results(session_file),
        Action::ResumeSession {
            session_file,
            fips_validation,
        } => provider.resume(session_file, *fips_validation),
        Action::CancelSession {
            session_file,
            save_to,
        } => provider.cancel(session_file, save_to.as_deref()),
        Action::ExpectedResults {
            session_file,
            save_to,
        } => provider.expected_results(session_file, save_to.as_deref()),
        Action::PostResources { file } => provider.mark_as_post_resources(file),
        Action::CertRequest { file } => provider.mark_as_cert_request(file),
        Action::Run { fips_validation } => provider.run(*fips_validation),
    }
}
