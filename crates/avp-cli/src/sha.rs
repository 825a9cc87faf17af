//! SHA-2 capability handler backed by the `sha2` crate.
//!
//! Monte-Carlo cases digest the concatenation of their three seed
//! messages; functional and verification cases digest the single message.

use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};

use avp_core::{HashAlgorithm, HashTestCase, HashTestKind, SessionError};

/// Evaluate one hash test case, filling in its digest.
pub fn evaluate(case: &mut HashTestCase) -> Result<(), SessionError> {
    case.digest = match case.kind {
        HashTestKind::Aft | HashTestKind::Vot => digest_message(case.algorithm, &case.message),
        HashTestKind::Mct => {
            let parts = case.mct_parts.as_ref().ok_or_else(|| {
                SessionError::validation("Monte Carlo test case is missing its seed messages")
            })?;
            let mut joined = Vec::with_capacity(parts.iter().map(Vec::len).sum());
            for part in parts {
                joined.extend_from_slice(part);
            }
            digest_message(case.algorithm, &joined)
        }
    };
    Ok(())
}

fn digest_message(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha2_224 => Sha224::digest(data).to_vec(),
        HashAlgorithm::Sha2_256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha2_384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha2_512 => Sha512::digest(data).to_vec(),
        HashAlgorithm::Sha2_512_224 => Sha512_224::digest(data).to_vec(),
        HashAlgorithm::Sha2_512_256 => Sha512_256::digest(data).to_vec(),
    }
}

// FIPS 180-4 known answer for the message "abc".
const SELF_TEST_MESSAGE: &[u8] = b"abc";
const SELF_TEST_DIGEST: &str =
    "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

/// Startup known-answer check of the SHA2-256 path.
///
/// Gates every run unless the user explicitly opts out; a failure here
/// means local digests cannot be trusted for submission.
pub fn self_test() -> Result<(), SessionError> {
    let mut case = HashTestCase::functional(HashAlgorithm::Sha2_256, SELF_TEST_MESSAGE.to_vec());
    evaluate(&mut case)?;
    let expected = hex::decode(SELF_TEST_DIGEST)
        .map_err(|err| SessionError::validation(format!("self-test digest constant: {err}")))?;
    if case.digest == expected {
        Ok(())
    } else {
        Err(SessionError::validation(
            "SHA2-256 startup self-test produced the wrong digest",
        ))
    }
}
