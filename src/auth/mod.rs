//! OpenID Connect implicit-flow client
//!
//! Drives a user agent through the implicit flow: send it to the
//! authorization server, read the tokens handed back on the redirect,
//! validate them locally against the server's discovery document, persist
//! them, and answer status questions from what was persisted.
//!
//! The signature of the ID token is not verified; the access token is bound
//! to the ID token through the `at_hash` claim instead.
//!
//! # Module Layout
//!
//! - [`storage`]      -- `KeyValueStorage` capability (in-memory and sled)
//! - [`token_store`]  -- Persistence of the token triple under fixed keys
//! - [`redirect`]     -- Authorization request URL construction
//! - [`callback`]     -- Redirect fragment/query parsing
//! - [`claims`]       -- Compact token decoding
//! - [`discovery`]    -- Discovery document model and fetch capability
//! - [`validator`]    -- Issuer, audience, algorithm, expiry and `at_hash`
//!   checks
//! - [`navigator`]    -- User-agent navigation capability
//! - [`orchestrator`] -- The state machine the hosting shell talks to

pub mod callback;
pub mod claims;
pub mod discovery;
pub mod navigator;
pub mod orchestrator;
pub mod redirect;
pub mod storage;
pub mod token_store;
pub mod validator;

pub use orchestrator::{AuthOrchestrator, AuthState, CallbackOutcome, FlowPhase};
