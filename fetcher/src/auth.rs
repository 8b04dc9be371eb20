//! Authentication schemes.
//!
//! `AuthMethod` is the bare selector (what libcurl calls `CURLOPT_HTTPAUTH`), `Auth` is the
//! selector together with its credentials.  Only a closed set of schemes is recognised, any
//! other selector value is a logic failure.
//!

use std::fmt::{Debug, Display, Formatter};

use serde::Deserialize;
use strum::{EnumString, VariantNames};
use tracing::trace;

use crate::{FetchError, Status};

/// Numeric selector codes, compatible with libcurl's `CURLAUTH_*` bits.
///
const CODE_NONE: u64 = 0;
const CODE_BASIC: u64 = 1;
const CODE_DIGEST: u64 = 2;
const CODE_BEARER: u64 = 64;

/// Which authentication scheme to use for the request.
///
#[derive(Clone, Copy, Debug, Default, EnumString, Eq, PartialEq, VariantNames, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AuthMethod {
    #[default]
    None,
    Basic,
    Digest,
    Bearer,
}

impl AuthMethod {
    pub fn code(&self) -> u64 {
        match self {
            AuthMethod::None => CODE_NONE,
            AuthMethod::Basic => CODE_BASIC,
            AuthMethod::Digest => CODE_DIGEST,
            AuthMethod::Bearer => CODE_BEARER,
        }
    }
}

impl TryFrom<u64> for AuthMethod {
    type Error = FetchError;

    fn try_from(code: u64) -> Result<Self, Self::Error> {
        match code {
            CODE_NONE => Ok(AuthMethod::None),
            CODE_BASIC => Ok(AuthMethod::Basic),
            CODE_DIGEST => Ok(AuthMethod::Digest),
            CODE_BEARER => Ok(AuthMethod::Bearer),
            _ => Err(Status::UnknownAuthMethod(code.to_string()).into()),
        }
    }
}

/// A selector as written in a configuration file, either by name or by numeric code.
///
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum Selector {
    Code(u64),
    Name(String),
}

impl Default for Selector {
    fn default() -> Self {
        Selector::Name(AuthMethod::None.to_string())
    }
}

impl TryFrom<&Selector> for AuthMethod {
    type Error = FetchError;

    fn try_from(sel: &Selector) -> Result<Self, Self::Error> {
        match sel {
            Selector::Code(code) => AuthMethod::try_from(*code),
            Selector::Name(name) => name.parse::<AuthMethod>().map_err(|_| {
                FetchError::from(Status::UnknownAuthMethod(format!(
                    "{name} (expected one of {})",
                    AuthMethod::VARIANTS.join(", ")
                )))
            }),
        }
    }
}

/// Describe the possible ways to authenticate oneself
///
#[derive(Clone, Default, Eq, PartialEq)]
pub enum Auth {
    /// Nothing special, no auth
    #[default]
    Anon,
    /// Plain login/password sent with every request
    Basic { username: String, password: String },
    /// Login/password answered to the server's challenge
    Digest { username: String, password: String },
    /// Pre-obtained token
    Bearer { token: String },
}

impl Auth {
    /// Combine a selector with whatever credentials were supplied, checking that the
    /// scheme has what it needs.
    ///
    #[tracing::instrument(skip(password, token))]
    pub fn build(
        method: AuthMethod,
        username: Option<String>,
        password: Option<String>,
        token: Option<String>,
    ) -> Result<Self, FetchError> {
        trace!("auth::build");

        let need = |what: &str| {
            FetchError::from(Status::MissingConfigParameter(format!(
                "{what} is required for {method} authentication"
            )))
        };

        let auth = match method {
            AuthMethod::None => Auth::Anon,
            AuthMethod::Basic => Auth::Basic {
                username: username.ok_or_else(|| need("username"))?,
                password: password.unwrap_or_default(),
            },
            AuthMethod::Digest => Auth::Digest {
                username: username.ok_or_else(|| need("username"))?,
                password: password.unwrap_or_default(),
            },
            AuthMethod::Bearer => Auth::Bearer {
                token: token.ok_or_else(|| need("token"))?,
            },
        };
        Ok(auth)
    }

    pub fn method(&self) -> AuthMethod {
        match self {
            Auth::Anon => AuthMethod::None,
            Auth::Basic { .. } => AuthMethod::Basic,
            Auth::Digest { .. } => AuthMethod::Digest,
            Auth::Bearer { .. } => AuthMethod::Bearer,
        }
    }
}

/// Same as `Display`, so that credentials never end up in a span or a `{:?}`.
///
impl Debug for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Auth {
    /// Obfuscate the passwords & tokens
    ///
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Anon => write!(f, "anon"),
            Auth::Basic { username, .. } => write!(f, "basic({username}:HIDDEN)"),
            Auth::Digest { username, .. } => write!(f, "digest({username}:HIDDEN)"),
            Auth::Bearer { .. } => write!(f, "bearer(HIDDEN)"),
        }
    }
}
