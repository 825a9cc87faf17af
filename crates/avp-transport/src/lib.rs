//! AVP Transport - HTTP-backed implementation of the control layer's
//! [`SessionProvider`] contract.
//!
//! This crate is the collaborator the core dispatches against: it owns the
//! server connection parameters, the registration document, authentication
//! state, and the blocking HTTP client. Capability registration and vector
//! evaluation against local files happen here, without the core ever
//! seeing the wire.
//!
//! The request/response shapes are a minimal rendition of the validation
//! server's REST surface; they are deliberately not normative for the core,
//! which only observes statuses.
//!
//! [`SessionProvider`]: avp_core::provider::SessionProvider

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod http;
mod vectors;

pub use http::HttpSession;
pub use vectors::{KatEntry, ResponseSet, ResponseTest, VectorSet, VectorTest};
