//! Capability registrar: declares enabled algorithm capabilities against
//! the session.

use tracing::debug;

use crate::capability::{Domain, DomainParam, HashAlgorithm, HashHandler};
use crate::error::DispatchError;
use crate::provider::SessionProvider;

/// Register every enabled hash algorithm with its message-length domain.
///
/// Domain invariants are checked locally first, so a bad domain surfaces as
/// a configuration error rather than a provider status. The first provider
/// failure short-circuits the remaining registrations; the whole startup
/// aborts and nothing is retried or merged.
pub fn register_capabilities(
    provider: &mut dyn SessionProvider,
    hashes: &[HashAlgorithm],
    handler: HashHandler,
) -> Result<(), DispatchError> {
    for &algorithm in hashes {
        Domain::MESSAGE_LENGTH.validate(algorithm)?;
        provider
            .register_capability(algorithm, handler)
            .map_err(|source| DispatchError::Registration {
                algorithm: algorithm.to_string(),
                source,
            })?;
        provider
            .set_capability_domain(algorithm, DomainParam::MessageLength, Domain::MESSAGE_LENGTH)
            .map_err(|source| DispatchError::Registration {
                algorithm: algorithm.to_string(),
                source,
            })?;
        debug!(algorithm = algorithm.as_str(), "registered hash capability");
    }
    Ok(())
}
