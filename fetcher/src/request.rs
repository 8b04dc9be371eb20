//! The request descriptor: everything needed for the single HTTP call.
//!

use std::time::Duration;

use reqwest::Url;
use tracing::{debug, trace};

use crate::{Auth, FetchError};

#[derive(Clone, Debug)]
pub struct Request {
    /// Target, already parsed
    url: Url,
    /// Credentials, if any
    auth: Auth,
    /// Whole-exchange timeout, `None` means wait forever
    timeout: Option<Duration>,
}

impl Request {
    /// Parse and check the URL.  Only `http` and `https` are fetchable.
    ///
    #[tracing::instrument]
    pub fn new(url: &str) -> Result<Self, FetchError> {
        trace!("request::new");

        let url = Url::parse(url).map_err(|e| FetchError::logic(format!("bad URL {url}: {e}")))?;
        match url.scheme() {
            "http" | "https" => (),
            s => return Err(FetchError::logic(format!("unsupported URL scheme {s}"))),
        }
        if url.host_str().is_none() {
            return Err(FetchError::logic(format!("no host in URL {url}")));
        }
        Ok(Request {
            url,
            auth: Auth::Anon,
            timeout: None,
        })
    }

    pub fn auth(&mut self, auth: Auth) -> &mut Self {
        debug!("Add auth {auth}");
        self.auth = auth;
        self
    }

    pub fn timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        debug!("Add timeout {timeout:?}");
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn credentials(&self) -> &Auth {
        &self.auth
    }

    pub fn duration(&self) -> Option<Duration> {
        self.timeout
    }

    /// The request-target as sent on the wire, i.e. path and query.
    ///
    pub fn target(&self) -> String {
        match self.url.query() {
            Some(q) => format!("{}?{q}", self.url.path()),
            None => self.url.path().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_request_new() {
        let r = Request::new("http://example.com").unwrap();
        assert_eq!("example.com", r.url().host_str().unwrap());
        assert_eq!(Auth::Anon, *r.credentials());
        assert!(r.duration().is_none());
        assert_eq!("/", r.target());
    }

    #[rstest]
    #[case("")]
    #[case("example.com")]
    #[case("ftp://example.com/file")]
    #[case("file:///etc/passwd")]
    #[case("http://")]
    fn test_request_bad_url(#[case] url: &str) {
        let e = Request::new(url).unwrap_err();
        assert_eq!(2, e.code());
    }

    #[test]
    fn test_request_chain() {
        let mut r = Request::new("https://example.com/a/b?c=d").unwrap();
        r.auth(Auth::Bearer {
            token: "t".into(),
        })
        .timeout(Some(Duration::from_secs(5)));

        assert_eq!("/a/b?c=d", r.target());
        assert_eq!(Some(Duration::from_secs(5)), r.duration());
        assert_eq!(crate::AuthMethod::Bearer, r.credentials().method());
    }
}
