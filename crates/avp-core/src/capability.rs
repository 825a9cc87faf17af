//! Capability identities, parameter domains, and the hash test-case model
//! shared with capability handlers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SessionError};

/// Hash algorithm families a session can be tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Sha2_224,
    Sha2_256,
    Sha2_384,
    Sha2_512,
    Sha2_512_224,
    Sha2_512_256,
}

impl HashAlgorithm {
    /// All registrable algorithms, in registration order.
    pub const ALL: [Self; 6] = [
        Self::Sha2_224,
        Self::Sha2_256,
        Self::Sha2_384,
        Self::Sha2_512,
        Self::Sha2_512_224,
        Self::Sha2_512_256,
    ];

    /// Wire identifier for this algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha2_224 => "SHA2-224",
            Self::Sha2_256 => "SHA2-256",
            Self::Sha2_384 => "SHA2-384",
            Self::Sha2_512 => "SHA2-512",
            Self::Sha2_512_224 => "SHA2-512/224",
            Self::Sha2_512_256 => "SHA2-512/256",
        }
    }

    /// Parse a wire identifier.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.as_str() == name)
    }

    /// Digest length in bytes.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha2_224 | Self::Sha2_512_224 => 28,
            Self::Sha2_256 | Self::Sha2_512_256 => 32,
            Self::Sha2_384 => 48,
            Self::Sha2_512 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability parameter identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainParam {
    MessageLength,
}

impl DomainParam {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MessageLength => "messageLength",
        }
    }
}

/// Inclusive parameter domain with a fixed granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub min: u32,
    pub max: u32,
    pub granularity: u32,
}

impl Domain {
    /// Message-length domain declared for every hash capability.
    pub const MESSAGE_LENGTH: Self = Self {
        min: 0,
        max: 65_536,
        granularity: 8,
    };

    /// Check the domain invariants: min does not exceed max, granularity is
    /// nonzero and evenly divides the range. A violation is a configuration
    /// error, not a runtime one.
    pub fn validate(self, algorithm: HashAlgorithm) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvertedDomain {
                algorithm: algorithm.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        if self.granularity == 0 {
            return Err(ConfigError::ZeroGranularity {
                algorithm: algorithm.to_string(),
            });
        }
        if (self.max - self.min) % self.granularity != 0 {
            return Err(ConfigError::UnalignedDomain {
                algorithm: algorithm.to_string(),
                min: self.min,
                max: self.max,
                granularity: self.granularity,
            });
        }
        Ok(())
    }
}

/// Test-case kinds a hash capability handler must evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashTestKind {
    /// Algorithm functional test: digest one message.
    Aft,
    /// Monte-Carlo test: digest the concatenation of the three seed parts.
    Mct,
    /// Variable-output test; fixed-output families digest normally.
    Vot,
}

/// One hash test case handed to a capability handler.
///
/// The handler writes the computed digest into `digest`.
#[derive(Debug, Clone)]
pub struct HashTestCase {
    pub algorithm: HashAlgorithm,
    pub kind: HashTestKind,
    pub message: Vec<u8>,
    /// Monte-Carlo seed parts; present only for [`HashTestKind::Mct`].
    pub mct_parts: Option<[Vec<u8>; 3]>,
    pub digest: Vec<u8>,
}

impl HashTestCase {
    /// A single-message test case.
    #[must_use]
    pub fn functional(algorithm: HashAlgorithm, message: Vec<u8>) -> Self {
        Self {
            algorithm,
            kind: HashTestKind::Aft,
            message,
            mct_parts: None,
            digest: Vec::new(),
        }
    }

    /// A Monte-Carlo test case over three seed parts.
    #[must_use]
    pub fn monte_carlo(algorithm: HashAlgorithm, parts: [Vec<u8>; 3]) -> Self {
        Self {
            algorithm,
            kind: HashTestKind::Mct,
            message: Vec::new(),
            mct_parts: Some(parts),
            digest: Vec::new(),
        }
    }
}

/// Capability handler invoked for each hash test case.
pub type HashHandler = fn(&mut HashTestCase) -> Result<(), SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names_round_trip() {
        for alg in HashAlgorithm::ALL {
            assert_eq!(HashAlgorithm::from_name(alg.as_str()), Some(alg));
        }
        assert_eq!(HashAlgorithm::from_name("SHA3-256"), None);
    }

    #[test]
    fn message_length_domain_is_valid() {
        assert!(Domain::MESSAGE_LENGTH
            .validate(HashAlgorithm::Sha2_256)
            .is_ok());
    }

    #[test]
    fn inverted_domain_rejected() {
        let domain = Domain {
            min: 16,
            max: 8,
            granularity: 8,
        };
        assert!(matches!(
            domain.validate(HashAlgorithm::Sha2_256),
            Err(ConfigError::InvertedDomain { .. })
        ));
    }

    #[test]
    fn zero_granularity_rejected() {
        let domain = Domain {
            min: 0,
            max: 64,
            granularity: 0,
        };
        assert!(matches!(
            domain.validate(HashAlgorithm::Sha2_256),
            Err(ConfigError::ZeroGranularity { .. })
        ));
    }

    #[test]
    fn unaligned_granularity_rejected() {
        let domain = Domain {
            min: 0,
            max: 100,
            granularity: 8,
        };
        assert!(matches!(
            domain.validate(HashAlgorithm::Sha2_256),
            Err(ConfigError::UnalignedDomain { granularity: 8, .. })
        ));
    }
}
