//! End-to-end checks of the `avp` binary over its network-free paths.

use assert_cmd::Command;
use predicates::prelude::*;

const ABC_DIGEST: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

fn avp() -> Command {
    let mut cmd = Command::cargo_bin("avp").expect("binary builds");
    // Isolate from any ambient server configuration.
    for var in [
        "AVP_SERVER",
        "AVP_PORT",
        "AVP_URI_PREFIX",
        "AVP_API_CONTEXT",
        "AVP_CA_FILE",
        "AVP_CERT_FILE",
        "AVP_KEY_FILE",
        "AVP_TOTP_SEED",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn get_registration_prints_the_document() {
    avp()
        .arg("--get-registration")
        .assert()
        .success()
        .stdout(predicate::str::contains("SHA2-256"))
        .stdout(predicate::str::contains("algorithms"));
}

#[test]
fn get_registration_saves_to_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registration.json");

    avp()
        .arg("--get-registration")
        .arg("--save-to")
        .arg(&path)
        .assert()
        .success();

    let saved = std::fs::read_to_string(&path).unwrap();
    assert!(saved.contains("SHA2-512/224"));
}

#[test]
fn get_cost_reports_the_vector_set_count() {
    avp().arg("--get-cost").assert().success();
}

#[test]
fn lone_vector_response_file_is_a_conflict() {
    avp()
        .arg("--vector-rsp")
        .arg("rsp.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("vector request"));
}

#[test]
fn lone_vector_request_file_is_a_conflict() {
    avp()
        .arg("--vector-req")
        .arg("req.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("vector response"));
}

#[test]
fn fips_without_metadata_is_a_conflict() {
    avp()
        .arg("--fips")
        .assert()
        .failure()
        .stderr(predicate::str::contains("metadata"));
}

#[test]
fn session_modes_demand_a_session_file() {
    avp()
        .arg("--get-results")
        .assert()
        .failure()
        .stderr(predicate::str::contains("session state file"));
}

#[test]
fn offline_vectors_are_processed_locally() {
    let dir = tempfile::tempdir().unwrap();
    let request = dir.path().join("req.json");
    let response = dir.path().join("rsp.json");
    std::fs::write(
        &request,
        r#"[{"algorithm":"SHA2-256","tests":[{"tcId":1,"testType":"AFT","msg":"616263"}]}]"#,
    )
    .unwrap();

    avp()
        .arg("--vector-req")
        .arg(&request)
        .arg("--vector-rsp")
        .arg(&response)
        .assert()
        .success();

    let written = std::fs::read_to_string(&response).unwrap();
    assert!(written.contains(ABC_DIGEST));
}

#[test]
fn passing_kat_file_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kat.json");
    std::fs::write(
        &path,
        format!(r#"[{{"algorithm":"SHA2-256","msg":"616263","md":"{ABC_DIGEST}"}}]"#),
    )
    .unwrap();

    avp().arg("--kat").arg(&path).assert().success();
}

#[test]
fn failing_kat_file_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kat.json");
    std::fs::write(
        &path,
        r#"[{"algorithm":"SHA2-256","msg":"616263","md":"00"}]"#,
    )
    .unwrap();

    avp()
        .arg("--kat")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("known-answer"));
}

#[test]
fn missing_kat_file_is_a_file_failure() {
    avp()
        .arg("--kat")
        .arg("/nonexistent/kat.json")
        .assert()
        .failure();
}

#[test]
fn no_fips_prints_the_warning_banner() {
    avp()
        .arg("--no-fips")
        .arg("--get-registration")
        .assert()
        .success()
        .stderr(predicate::str::contains("self-test skipped"));
}

#[test]
fn manual_registration_replaces_the_built_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manual.json");
    std::fs::write(&path, r#"{"algorithms":[{"algorithm":"SHA2-224"}]}"#).unwrap();

    avp()
        .arg("--manual-registration")
        .arg(&path)
        .arg("--get-registration")
        .assert()
        .success()
        .stdout(predicate::str::contains("SHA2-224"))
        .stdout(predicate::str::contains("SHA2-512").not());
}
