//! Vector-set and known-answer-test file formats, and their evaluation
//! through registered capability handlers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use avp_core::capability::{HashAlgorithm, HashHandler, HashTestCase, HashTestKind};
use avp_core::error::SessionError;

/// Test-case kinds as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum TestType {
    Aft,
    Mct,
    Vot,
}

impl From<TestType> for HashTestKind {
    fn from(tt: TestType) -> Self {
        match tt {
            TestType::Aft => Self::Aft,
            TestType::Mct => Self::Mct,
            TestType::Vot => Self::Vot,
        }
    }
}

/// One vector set from a request file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSet {
    pub algorithm: String,
    pub tests: Vec<VectorTest>,
}

/// One test case within a vector set. `msg` carries the hex-encoded
/// message for AFT/VOT cases; `mct_parts` carries the three hex-encoded
/// Monte-Carlo seed parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorTest {
    #[serde(rename = "tcId")]
    pub tc_id: u64,
    #[serde(rename = "testType")]
    test_type: TestType,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(rename = "mctParts", default)]
    pub mct_parts: Option<[String; 3]>,
}

/// One evaluated vector set, ready to serialize into a response file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSet {
    pub algorithm: String,
    pub tests: Vec<ResponseTest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseTest {
    #[serde(rename = "tcId")]
    pub tc_id: u64,
    pub md: String,
}

/// One known-answer test: a message with its expected digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KatEntry {
    pub algorithm: String,
    pub msg: String,
    pub md: String,
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, SessionError> {
    hex::decode(value)
        .map_err(|err| SessionError::validation(format!("invalid hex in {field}: {err}")))
}

fn handler_for(
    handlers: &HashMap<HashAlgorithm, HashHandler>,
    name: &str,
) -> Result<(HashAlgorithm, HashHandler), SessionError> {
    let algorithm = HashAlgorithm::from_name(name).ok_or_else(|| SessionError::NoCapability {
        algorithm: name.to_owned(),
    })?;
    let handler = handlers
        .get(&algorithm)
        .ok_or_else(|| SessionError::NoCapability {
            algorithm: name.to_owned(),
        })?;
    Ok((algorithm, *handler))
}

fn build_case(
    algorithm: HashAlgorithm,
    test: &VectorTest,
) -> Result<HashTestCase, SessionError> {
    let kind = HashTestKind::from(test.test_type);
    if kind == HashTestKind::Mct {
        let parts = test.mct_parts.as_ref().ok_or_else(|| {
            SessionError::validation(format!("MCT case {} is missing its seed parts", test.tc_id))
        })?;
        let decoded = [
            decode_hex("mctParts[0]", &parts[0])?,
            decode_hex("mctParts[1]", &parts[1])?,
            decode_hex("mctParts[2]", &parts[2])?,
        ];
        return Ok(HashTestCase::monte_carlo(algorithm, decoded));
    }

    let msg = test.msg.as_deref().ok_or_else(|| {
        SessionError::validation(format!("case {} is missing its message", test.tc_id))
    })?;
    let mut case = HashTestCase::functional(algorithm, decode_hex("msg", msg)?);
    case.kind = kind;
    Ok(case)
}

/// Evaluate every test in `sets` through the registered handlers.
pub(crate) fn process_vector_sets(
    sets: &[VectorSet],
    handlers: &HashMap<HashAlgorithm, HashHandler>,
) -> Result<Vec<ResponseSet>, SessionError> {
    let mut responses = Vec::with_capacity(sets.len());
    for set in sets {
        let (algorithm, handler) = handler_for(handlers, &set.algorithm)?;
        let mut tests = Vec::with_capacity(set.tests.len());
        for test in &set.tests {
            let mut case = build_case(algorithm, test)?;
            handler(&mut case)?;
            tests.push(ResponseTest {
                tc_id: test.tc_id,
                md: hex::encode(&case.digest),
            });
        }
        responses.push(ResponseSet {
            algorithm: set.algorithm.clone(),
            tests,
        });
    }
    Ok(responses)
}

/// Run known-answer entries through the handlers, comparing each digest to
/// its expected value. Returns `(passed, failed)` counts.
pub(crate) fn run_kat_entries(
    entries: &[KatEntry],
    handlers: &HashMap<HashAlgorithm, HashHandler>,
) -> Result<(usize, usize), SessionError> {
    let mut passed = 0;
    let mut failed = 0;
    for entry in entries {
        let (algorithm, handler) = handler_for(handlers, &entry.algorithm)?;
        let expected = decode_hex("md", &entry.md)?;
        let mut case = HashTestCase::functional(algorithm, decode_hex("msg", &entry.msg)?);
        handler(&mut case)?;
        if case.digest == expected {
            passed += 1;
        } else {
            failed += 1;
        }
    }
    Ok((passed, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use avp_core::error::SessionError;

    // Reverses the message so digests are predictable without real crypto.
    fn reversing_handler(tc: &mut HashTestCase) -> Result<(), SessionError> {
        let input = match (&tc.mct_parts, tc.kind) {
            (Some(parts), HashTestKind::Mct) => parts.concat(),
            _ => tc.message.clone(),
        };
        tc.digest = input.into_iter().rev().collect();
        Ok(())
    }

    fn handlers() -> HashMap<HashAlgorithm, HashHandler> {
        let mut map: HashMap<HashAlgorithm, HashHandler> = HashMap::new();
        map.insert(HashAlgorithm::Sha2_256, reversing_handler);
        map
    }

    #[test]
    fn processes_functional_cases() {
        let sets = vec![VectorSet {
            algorithm: "SHA2-256".to_owned(),
            tests: vec![VectorTest {
                tc_id: 1,
                test_type: TestType::Aft,
                msg: Some("010203".to_owned()),
                mct_parts: None,
            }],
        }];
        let responses = process_vector_sets(&sets, &handlers()).unwrap();
        assert_eq!(responses[0].tests[0].md, "030201");
    }

    #[test]
    fn processes_monte_carlo_cases_over_all_parts() {
        let sets = vec![VectorSet {
            algorithm: "SHA2-256".to_owned(),
            tests: vec![VectorTest {
                tc_id: 7,
                test_type: TestType::Mct,
                msg: None,
                mct_parts: Some(["01".to_owned(), "02".to_owned(), "03".to_owned()]),
            }],
        }];
        let responses = process_vector_sets(&sets, &handlers()).unwrap();
        assert_eq!(responses[0].tests[0].md, "030201");
    }

    #[test]
    fn unknown_algorithm_is_a_missing_capability() {
        let sets = vec![VectorSet {
            algorithm: "SHA3-256".to_owned(),
            tests: Vec::new(),
        }];
        assert!(matches!(
            process_vector_sets(&sets, &handlers()),
            Err(SessionError::NoCapability { .. })
        ));
    }

    #[test]
    fn mct_case_without_parts_is_rejected() {
        let sets = vec![VectorSet {
            algorithm: "SHA2-256".to_owned(),
            tests: vec![VectorTest {
                tc_id: 2,
                test_type: TestType::Mct,
                msg: Some("01".to_owned()),
                mct_parts: None,
            }],
        }];
        assert!(matches!(
            process_vector_sets(&sets, &handlers()),
            Err(SessionError::Validation { .. })
        ));
    }

    #[test]
    fn kat_entries_count_passes_and_failures() {
        let entries = vec![
            KatEntry {
                algorithm: "SHA2-256".to_owned(),
                msg: "0102".to_owned(),
                md: "0201".to_owned(),
            },
            KatEntry {
                algorithm: "SHA2-256".to_owned(),
                msg: "0102".to_owned(),
                md: "ffff".to_owned(),
            },
        ];
        assert_eq!(run_kat_entries(&entries, &handlers()).unwrap(), (1, 1));
    }

    #[test]
    fn wire_test_types_use_uppercase_names() {
        let json = r#"{"tcId":1,"testType":"AFT","msg":"00"}"#;
        let test: VectorTest = serde_json::from_str(json).unwrap();
        assert_eq!(test.test_type, TestType::Aft);
    }
}
