//! Library part of the `fetcher` utility.
//!
//! `fetcher` fetches one URL and writes the response body into a file (or stdout).  There is
//! no command-line surface, the target, output and credentials are built-in (see `config`).
//!
//! The `Fetcher` goes through a fixed sequence:
//!
//! - acquire a `ClientContext`
//! - build the `Request` (URL, `Auth`, timeout)
//! - execute it
//! - open the `Sink` and stream the body into it
//! - close everything and return an exit code
//!
//! Failures are either runtime (network) ones, logic (configuration) ones or sink ones, see
//! `FetchError`.
//!

use clap::{crate_name, crate_version};

pub use auth::*;
pub use client::*;
pub use config::*;
pub use error::*;
pub use fetch::*;
pub use logging::*;
pub use request::*;
pub use resources::{ledger, Ledger};
pub use sink::*;

mod auth;
mod client;
mod config;
mod digest;
mod error;
mod fetch;
mod logging;
mod request;
mod resources;
mod sink;

const NAME: &str = crate_name!();
const VERSION: &str = crate_version!();

/// Return our version number, also used as user-agent
///
#[inline]
pub fn version() -> String {
    format!("{}/{}", NAME, VERSION)
}
