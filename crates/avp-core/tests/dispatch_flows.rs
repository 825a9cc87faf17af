//! End-to-end dispatch flows against the mock session provider.
//!
//! These exercise the dispatcher's precedence and termination semantics
//! through the public entry point, asserting on the provider calls each
//! configuration produces and on teardown behavior.

use avp_core::dispatch::Payload;
use avp_core::error::SessionError;
use avp_core::{run_session, Config, OutcomeCode};
use avp_testkit::{fixtures, MockSession};

fn dispatch(config: &Config, session: MockSession) -> (avp_core::Outcome, avp_testkit::Ledger) {
    let ledger = session.ledger();
    let outcome = run_session(config, Box::new(session), fixtures::noop_hash_handler);
    (outcome, ledger)
}

#[test]
fn default_run_reaches_the_live_server() {
    let (outcome, ledger) = dispatch(&fixtures::config(), MockSession::new());
    assert!(outcome.is_success());
    assert_eq!(ledger.count("run"), 1);
    assert_eq!(ledger.destroy_count(), 1);
}

#[test]
fn single_shot_modes_invoke_exactly_one_action_and_terminate() {
    let cases: [(Config, &str); 5] = [
        (
            Config {
                get_cost: true,
                ..fixtures::config()
            },
            "vector_set_count",
        ),
        (
            Config {
                kat_file: Some("kat.json".into()),
                ..fixtures::config()
            },
            "load_kat_file",
        ),
        (
            Config {
                get_results: true,
                ..fixtures::session_config()
            },
            "results",
        ),
        (
            Config {
                resume_session: true,
                ..fixtures::session_config()
            },
            "resume",
        ),
        (
            Config {
                get_expected: true,
                ..fixtures::session_config()
            },
            "expected_results",
        ),
    ];

    for (config, operation) in cases {
        let (outcome, ledger) = dispatch(&config, MockSession::new());
        assert!(outcome.is_success(), "{operation} should succeed");
        assert_eq!(ledger.count(operation), 1, "{operation} called once");
        assert_eq!(ledger.count("run"), 0, "{operation} must not reach run");
        assert_eq!(ledger.destroy_count(), 1);
    }
}

#[test]
fn cost_estimate_reports_a_count_and_exits_zero_without_run() {
    let config = Config {
        get_cost: true,
        ..fixtures::config()
    };
    let session = MockSession::new().with_vector_set_count(Some(3));
    let (outcome, ledger) = dispatch(&config, session);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.payload, Some(Payload::VectorSetCount(3)));
    assert_eq!(ledger.count("run"), 0);
}

#[test]
fn unknown_cost_estimate_still_succeeds_without_a_payload() {
    let config = Config {
        get_cost: true,
        ..fixtures::config()
    };
    let (outcome, _) = dispatch(&config, MockSession::new().with_vector_set_count(None));
    assert!(outcome.is_success());
    assert_eq!(outcome.payload, None);
}

#[test]
fn mismatched_vector_files_issue_zero_provider_calls() {
    let config = Config {
        vector_request_file: Some("req.json".into()),
        ..fixtures::config()
    };
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert_eq!(outcome.code, OutcomeCode::ConfigConflict);
    assert_ne!(outcome.exit_code(), 0);
    assert!(ledger.calls().is_empty(), "conflict must precede any call");
    assert_eq!(ledger.destroy_count(), 1);

    let config = Config {
        vector_response_file: Some("rsp.json".into()),
        ..fixtures::config()
    };
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert_eq!(outcome.code, OutcomeCode::ConfigConflict);
    assert!(ledger.calls().is_empty());
}

#[test]
fn offline_pair_runs_from_files_and_never_contacts_the_live_run() {
    let config = Config {
        vector_request_file: Some("req.json".into()),
        vector_response_file: Some("rsp.json".into()),
        ..fixtures::config()
    };
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert!(outcome.is_success());
    assert_eq!(ledger.count("run_vectors_from_files"), 1);
    assert_eq!(ledger.count("run"), 0);
    assert_eq!(ledger.count("upload_vectors_from_file"), 0);
}

#[test]
fn manual_registration_excludes_the_capability_registrar() {
    let config = Config {
        manual_registration_file: Some("registration.json".into()),
        ..fixtures::config()
    };
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert!(outcome.is_success());
    assert_eq!(ledger.count("set_registration_file"), 1);
    assert_eq!(ledger.count("register_capability"), 0);
    assert_eq!(ledger.count("set_capability_domain"), 0);
    assert_eq!(ledger.count("run"), 1);
}

#[test]
fn registrar_runs_when_no_manual_registration_is_bound() {
    let config = Config {
        hashes: vec![
            avp_core::HashAlgorithm::Sha2_256,
            avp_core::HashAlgorithm::Sha2_512,
        ],
        ..fixtures::config()
    };
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert!(outcome.is_success());
    assert_eq!(ledger.count("register_capability"), 2);
    assert_eq!(ledger.count("set_capability_domain"), 2);
}

#[test]
fn registration_failure_short_circuits_and_tears_down() {
    let session = MockSession::new().with_failure(
        "register_capability",
        SessionError::validation("capability rejected"),
    );
    let (outcome, ledger) = dispatch(&fixtures::config(), session);
    assert_eq!(outcome.code, OutcomeCode::ValidationFailure);
    assert_eq!(ledger.count("set_capability_domain"), 0);
    assert_eq!(ledger.count("run"), 0);
    assert_eq!(ledger.destroy_count(), 1);
}

#[test]
fn put_with_empty_algorithm_list_submits_directly() {
    let config = Config {
        put_file: Some("put.json".into()),
        empty_algorithms: true,
        ..fixtures::config()
    };
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert!(outcome.is_success());
    assert_eq!(ledger.count("put_data_from_file"), 1);
    assert_eq!(ledger.count("mark_as_put_after_test"), 0);
    assert_eq!(ledger.count("run"), 0);
}

#[test]
fn put_with_algorithms_defers_and_continues_to_the_run() {
    let config = Config {
        put_file: Some("put.json".into()),
        ..fixtures::config()
    };
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert!(outcome.is_success());
    assert_eq!(ledger.count("mark_as_put_after_test"), 1);
    assert_eq!(ledger.count("put_data_from_file"), 0);
    assert_eq!(ledger.count("run"), 1);
}

#[test]
fn side_actions_execute_and_still_reach_the_run() {
    let config = Config {
        post_resources_file: Some("resources.json".into()),
        cert_request_file: Some("cert.json".into()),
        ..fixtures::config()
    };
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert!(outcome.is_success());
    assert_eq!(ledger.count("mark_as_post_resources"), 1);
    assert_eq!(ledger.count("mark_as_cert_request"), 1);
    assert_eq!(ledger.count("run"), 1);
}

#[test]
fn side_action_failure_is_recorded_but_not_enforced() {
    let config = Config {
        post_resources_file: Some("resources.json".into()),
        ..fixtures::config()
    };
    let session = MockSession::new().with_failure(
        "mark_as_post_resources",
        SessionError::transport("connection reset"),
    );
    let (outcome, ledger) = dispatch(&config, session);
    assert!(outcome.is_success());
    assert_eq!(outcome.side_failures.len(), 1);
    assert_eq!(
        outcome.side_failures[0].step,
        avp_core::Step::PostResources
    );
    assert_eq!(ledger.count("run"), 1, "failure must not stop the run");
}

#[test]
fn fips_metadata_failure_is_terminal() {
    let config = Config {
        fips_validation: true,
        metadata_file: Some("oe.json".into()),
        ..fixtures::config()
    };
    let session = MockSession::new()
        .with_failure("ingest_oe_metadata", SessionError::io("metadata read", "no such file"));
    let (outcome, ledger) = dispatch(&config, session);
    assert_eq!(outcome.code, OutcomeCode::FileIoFailure);
    assert_eq!(ledger.count("set_fips_validation_metadata"), 0);
    assert_eq!(ledger.count("run"), 0);
    assert_eq!(ledger.destroy_count(), 1);
}

#[test]
fn fips_metadata_binds_before_the_validation_run() {
    let config = Config {
        fips_validation: true,
        metadata_file: Some("oe.json".into()),
        ..fixtures::config()
    };
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert!(outcome.is_success());
    let calls = ledger.calls();
    let ingest = calls.iter().position(|c| c == "ingest_oe_metadata").unwrap();
    let bind = calls
        .iter()
        .position(|c| c == "set_fips_validation_metadata")
        .unwrap();
    let run = calls.iter().position(|c| c == "run").unwrap();
    assert!(ingest < bind && bind < run);
}

#[test]
fn transport_failure_on_the_terminal_step_is_reported() {
    let session =
        MockSession::new().with_failure("run", SessionError::transport("connection refused"));
    let (outcome, ledger) = dispatch(&fixtures::config(), session);
    assert_eq!(outcome.code, OutcomeCode::TransportFailure);
    assert_ne!(outcome.exit_code(), 0);
    assert_eq!(ledger.destroy_count(), 1);
}

#[test]
fn fetched_registration_is_returned_as_the_payload() {
    let config = Config {
        get_registration: true,
        ..fixtures::config()
    };
    let session = MockSession::new().with_registration(r#"{"algorithms":["SHA2-256"]}"#);
    let (outcome, ledger) = dispatch(&config, session);
    assert!(outcome.is_success());
    assert_eq!(
        outcome.payload,
        Some(Payload::Registration(
            r#"{"algorithms":["SHA2-256"]}"#.to_owned()
        ))
    );
    assert_eq!(ledger.count("current_registration"), 1);
    assert_eq!(ledger.count("run"), 0);
}

#[test]
fn failed_registration_save_does_not_fail_the_action() {
    let config = Config {
        get_registration: true,
        save_file: Some("/nonexistent-dir/registration.json".into()),
        ..fixtures::config()
    };
    let (outcome, _) = dispatch(&config, MockSession::new());
    assert!(outcome.is_success(), "a failed save is only a warning");
}

#[test]
fn session_marks_apply_before_dispatch() {
    let config = Config {
        sample: true,
        get_url: Some("/validations/17".into()),
        ..fixtures::config()
    };
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert!(outcome.is_success());
    assert_eq!(ledger.count("mark_as_sample"), 1);
    assert_eq!(ledger.count("mark_as_get_only"), 1);
}

#[test]
fn two_factor_seed_is_applied_during_setup() {
    let mut config = fixtures::config();
    config.server.totp_seed = Some("JBSWY3DPEHPK3PXP".into());
    let (outcome, ledger) = dispatch(&config, MockSession::new());
    assert!(outcome.is_success());
    assert_eq!(ledger.count("set_totp_seed"), 1);
}

#[test]
fn setup_failure_is_fatal_and_still_tears_down_once() {
    let session = MockSession::new()
        .with_failure("set_server", SessionError::validation("bad host"));
    let (outcome, ledger) = dispatch(&fixtures::config(), session);
    assert_eq!(outcome.code, OutcomeCode::ValidationFailure);
    assert_eq!(ledger.count("run"), 0);
    assert_eq!(ledger.destroy_count(), 1);
}
