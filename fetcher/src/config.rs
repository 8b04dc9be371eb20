//! Configuration.
//!
//! The program has no command-line surface: everything comes from the constants below, which
//! form `Config::default()`.  An HCL file named by `$FETCHER_CONFIG` can override any of them,
//! which is mostly useful to point the binary at something other than the built-in URL.
//!
//! ```hcl
//! version = 1
//! url     = "http://example.com"
//! output  = "out_request"
//! timeout = 30
//! auth {
//!   method   = "basic"
//!   username = "user"
//!   password = "pass"
//! }
//! ```
//!

use std::env;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{eyre, Result};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::auth::Selector;
use crate::error::Status;
use crate::{Auth, AuthMethod, FetchError, Request, Sink};

/// Environment variable naming an override file
pub const CONFIG_VAR: &str = "FETCHER_CONFIG";
/// Current version
pub const CVERSION: usize = 1;

/// Built-in target
pub const URL: &str = "http://example.com";
/// Built-in output file, `-` would be stdout
pub const OUTPUT: &str = "out_request";
/// Built-in timeout in seconds
pub const TIMEOUT: u64 = 30;

/// Authentication block, credentials are checked against the method in `Auth::build()`.
///
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthText {
    pub method: Selector,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

/// Hide the password & token
///
impl Debug for AuthText {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let hide = |s: &Option<String>| s.as_ref().map(|_| "HIDDEN");
        f.debug_struct("AuthText")
            .field("method", &self.method)
            .field("username", &self.username)
            .field("password", &hide(&self.password))
            .field("token", &hide(&self.token))
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File format version
    pub version: usize,
    /// Where to fetch from
    pub url: String,
    /// Where to write to
    pub output: PathBuf,
    /// Seconds, 0 disables it
    pub timeout: u64,
    pub auth: AuthText,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: CVERSION,
            url: URL.to_string(),
            output: PathBuf::from(OUTPUT),
            timeout: TIMEOUT,
            auth: AuthText::default(),
        }
    }
}

impl Config {
    /// Load the file named by `$FETCHER_CONFIG` or return the built-in defaults.
    ///
    #[tracing::instrument]
    pub fn from_env() -> Result<Config> {
        match env::var_os(CONFIG_VAR) {
            Some(fname) => Config::load(Path::new(&fname)),
            None => {
                trace!("no {CONFIG_VAR}, using defaults");
                Ok(Config::default())
            }
        }
    }

    /// Load and check an HCL file.
    ///
    #[tracing::instrument]
    pub fn load(fname: &Path) -> Result<Config> {
        if !fname.exists() {
            return Err(Status::MissingConfig(fname.display().to_string()).into());
        }
        trace!("Loading config file {fname:?}");

        let data = fs::read_to_string(fname)?;
        trace!("{} bytes read", data.len());

        let cfg: Config =
            hcl::from_str(&data).map_err(|e| eyre!("{}: {e}", fname.display()))?;
        debug!("struct data = {cfg:?}");

        if cfg.version != CVERSION {
            return Err(Status::BadFileVersion(cfg.version).into());
        }
        Ok(cfg)
    }

    /// Build the request descriptor.  This is where a bad URL or auth selector shows up.
    ///
    #[tracing::instrument(skip(self))]
    pub fn request(&self) -> Result<Request, FetchError> {
        let method = AuthMethod::try_from(&self.auth.method)?;
        let auth = Auth::build(
            method,
            self.auth.username.clone(),
            self.auth.password.clone(),
            self.auth.token.clone(),
        )?;

        let mut req = Request::new(&self.url)?;
        req.auth(auth).timeout(self.timeout());
        Ok(req)
    }

    pub fn sink(&self) -> Sink {
        Sink::from(self.output.as_path())
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout {
            0 => None,
            t => Some(Duration::from_secs(t)),
        }
    }
}
