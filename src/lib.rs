//! Authenticated client for the Conduit JSON-over-HTTP RPC API.
//!
//! Version-control tooling talks to its code-review server through
//! "conduit": every RPC is an HTTP POST whose parameters carry a
//! time-signed authentication envelope. This crate owns that exchange —
//! signing, transport, response validation — plus the two pieces of state
//! around it: a single-slot client cache with idle expiry, and a scripted
//! mock that replaces the whole client for deterministic tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  VCS tooling     │  callers issuing conduit RPCs
//! └────────┬─────────┘
//!          │ ClientCache::call / with_client
//! ┌────────▼─────────────────────────────────────┐
//! │           conduit-client (this crate)        │
//! │  ┌─────────────┐       ┌──────────────────┐  │
//! │  │ ClientCache │───────│ Client           │  │
//! │  │ (one slot,  │       │  Http ── signer  │  │
//! │  │  idle 10 s) │       │  Mock ── replay  │  │
//! │  └─────────────┘       └──────────────────┘  │
//! └────────┬─────────────────────────────────────┘
//!          │ POST params=<signed JSON>&output=json
//! ┌────────▼─────────┐
//! │ Conduit endpoint │  e.g. https://secure.phabricator.com/api/
//! └──────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use conduit_client::{ClientCache, Settings};
//! use serde_json::{Map, Value};
//!
//! # async fn example() -> conduit_client::Result<()> {
//! // Settings come from the environment (CONDUIT_URL, CONDUIT_MOCK, …),
//! // credentials from ~/.arcrc.
//! let cache = ClientCache::from_settings(Settings::from_env()?);
//!
//! let mut args = Map::new();
//! args.insert("ids".to_owned(), Value::from(vec![123]));
//! let revisions = cache.call("differential.query", &args).await?;
//! println!("{revisions}");
//! # Ok(())
//! # }
//! ```
//!
//! Calls made in quick succession reuse one client; after 10 idle seconds
//! (or any failure) the next call re-reads credentials and builds a fresh
//! one. Setting `CONDUIT_MOCK=/path/to/script.json` swaps in the
//! [`MockClient`] replay harness behind the same interface.
//!
//! # Module Organization
//!
//! - [`auth`]: call signing (token digest, authentication envelope)
//! - [`cache`]: single-slot client cache with idle expiry
//! - [`client`]: the [`Conduit`] capability, HTTP client, and selection
//! - [`config`]: settings and defaults
//! - [`credentials`]: `.arcrc`-style credential lookup
//! - [`error`]: the four-kind error taxonomy
//! - [`mock`]: scripted replay for deterministic tests
//!
//! # Error Handling
//!
//! Every operation returns [`Result<T>`](error::Result). Failures are never
//! swallowed or retried internally, and a failure always leaves the client
//! cache empty — the next call re-authenticates from scratch. Retry policy
//! belongs to the caller.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mock;

pub use cache::ClientCache;
pub use client::{Client, Conduit, ConduitClient, EndpointConfig};
pub use config::Settings;
pub use credentials::{CredentialStore, HostCredentials};
pub use error::{ConduitError, Result};
pub use mock::{MockClient, MockExchange};
