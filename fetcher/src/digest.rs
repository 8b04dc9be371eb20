//! HTTP Digest authentication (RFC 2617, MD5 and MD5-sess).
//!
//! The server answers the first, unauthenticated, exchange with a `401` and a
//! `WWW-Authenticate: Digest ...` challenge.  We parse it and compute the `Authorization`
//! header for the second exchange.
//!

use std::collections::BTreeMap;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, trace};

use crate::FetchError;

/// Only one exchange is ever answered, so the nonce count is fixed.
const NC: &str = "00000001";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Algorithm {
    Md5,
    Md5Sess,
}

/// What the server sent us.
///
#[derive(Clone, Debug)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: Algorithm,
    /// `true` if the server offered `qop=auth`
    pub qop_auth: bool,
}

/// Split `a=b, c="d, e"` into pairs, honouring quoted strings.
///
fn parse_params(s: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    let mut rest = s.trim();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            break;
        };
        let key = rest[..eq].trim().trim_start_matches(',').trim().to_lowercase();
        // Start of the next scheme's challenge
        if key.contains(char::is_whitespace) {
            break;
        }
        rest = rest[eq + 1..].trim_start();

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let mut value = String::new();
            let mut chars = quoted.char_indices();
            let mut end = quoted.len();
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => {
                        if let Some((_, n)) = chars.next() {
                            value.push(n);
                        }
                    }
                    '"' => {
                        end = i + 1;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            rest = &quoted[end..];
            value
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            let value = rest[..end].trim().to_string();
            rest = &rest[end..];
            value
        };
        params.insert(key, value);
        rest = rest.trim_start().trim_start_matches(',').trim_start();
    }
    params
}

/// Find the Digest challenge in a `WWW-Authenticate` value, which may carry several
/// comma-separated challenges (`Basic realm="x", Digest realm="y", ...`).  Returns the value
/// from the `Digest` scheme token onwards.
///
pub fn select(header: &str) -> Option<&str> {
    let bytes = header.as_bytes();
    let mut quoted = false;
    let mut boundary = true;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if quoted {
            match c {
                b'\\' => i += 1,
                b'"' => quoted = false,
                _ => (),
            }
        } else if c == b'"' {
            quoted = true;
            boundary = false;
        } else if c == b',' {
            boundary = true;
        } else if c.is_ascii_whitespace() {
            // separator
        } else if boundary && c.is_ascii() {
            let end = header[i..]
                .find(|c: char| c.is_ascii_whitespace() || c == ',' || c == '=')
                .map_or(header.len(), |n| i + n);
            let scheme = &header[i..end];
            if scheme.eq_ignore_ascii_case("digest")
                && bytes.get(end).map_or(true, |b| b.is_ascii_whitespace())
            {
                return Some(&header[i..]);
            }
            boundary = false;
            i = end;
            continue;
        } else {
            boundary = false;
        }
        i += 1;
    }
    None
}

impl Challenge {
    /// Parse the value of a `WWW-Authenticate` header.
    ///
    #[tracing::instrument]
    pub fn parse(header: &str) -> Result<Self, FetchError> {
        trace!("digest::parse");

        let header = header.trim();
        let params = match header.split_once(char::is_whitespace) {
            Some((scheme, params)) if scheme.eq_ignore_ascii_case("digest") => params,
            _ => {
                return Err(FetchError::runtime(format!(
                    "server did not offer Digest authentication: {header}"
                )))
            }
        };
        let params = parse_params(params);
        debug!("challenge = {params:?}");

        let nonce = params
            .get("nonce")
            .cloned()
            .ok_or_else(|| FetchError::runtime("Digest challenge without nonce"))?;

        let algorithm = match params.get("algorithm").map(|a| a.to_uppercase()) {
            None => Algorithm::Md5,
            Some(a) if a == "MD5" => Algorithm::Md5,
            Some(a) if a == "MD5-SESS" => Algorithm::Md5Sess,
            Some(a) => {
                return Err(FetchError::runtime(format!(
                    "unsupported Digest algorithm {a}"
                )))
            }
        };

        let qop_auth = match params.get("qop") {
            None => false,
            Some(qop) => {
                if qop.split(',').any(|q| q.trim() == "auth") {
                    true
                } else {
                    return Err(FetchError::runtime(format!("unsupported Digest qop {qop}")));
                }
            }
        };

        Ok(Challenge {
            realm: params.get("realm").cloned().unwrap_or_default(),
            nonce,
            opaque: params.get("opaque").cloned(),
            algorithm,
            qop_auth,
        })
    }

    /// Build the `Authorization` header value answering this challenge.
    ///
    pub fn respond(
        &self,
        method: &str,
        uri: &str,
        username: &str,
        password: &str,
        cnonce: &str,
    ) -> String {
        let mut ha1 = hex(format!("{username}:{}:{password}", self.realm));
        if self.algorithm == Algorithm::Md5Sess {
            ha1 = hex(format!("{ha1}:{}:{cnonce}", self.nonce));
        }
        let ha2 = hex(format!("{method}:{uri}"));

        let response = if self.qop_auth {
            hex(format!("{ha1}:{}:{NC}:{cnonce}:auth:{ha2}", self.nonce))
        } else {
            hex(format!("{ha1}:{}:{ha2}", self.nonce))
        };

        let algorithm = match self.algorithm {
            Algorithm::Md5 => "MD5",
            Algorithm::Md5Sess => "MD5-sess",
        };
        let mut header = format!(
            r#"Digest username="{username}", realm="{}", nonce="{}", uri="{uri}", algorithm={algorithm}, response="{response}""#,
            self.realm, self.nonce
        );
        if self.qop_auth {
            header.push_str(&format!(r#", qop=auth, nc={NC}, cnonce="{cnonce}""#));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }
        header
    }
}

/// A client nonce good enough for a single exchange.
///
pub fn cnonce() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    hex(format!("{now}:{}", process::id()))[..16].to_string()
}

#[inline]
fn hex(s: String) -> String {
    format!("{:x}", md5::compute(s.as_bytes()))
}
