//! AVP Test Kit - mock session provider and fixtures for testing the
//! control layer without a validation server.
//!
//! [`MockSession`] implements [`SessionProvider`] with a call-recording
//! ledger and scriptable per-operation failures. The [`Ledger`] handle is
//! cloneable and stays valid after the session is destroyed, so tests can
//! assert on teardown behavior.
//!
//! # Example
//!
//! ```
//! use avp_testkit::{fixtures, MockSession};
//!
//! let session = MockSession::new();
//! let ledger = session.ledger();
//!
//! let outcome = avp_core::run_session(
//!     &fixtures::config(),
//!     Box::new(session),
//!     fixtures::noop_hash_handler,
//! );
//!
//! assert!(outcome.is_success());
//! assert_eq!(ledger.count("run"), 1);
//! assert_eq!(ledger.destroy_count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod mock;

pub mod fixtures;

pub use mock::{Ledger, MockSession};
