//! The client context.
//!
//! Owns the HTTP client (connection pool, TLS setup) for the duration of the run.  It is
//! acquired first and released last, on every path, by dropping it.
//!

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use tracing::{debug, trace};

use crate::digest::{self, Challenge};
use crate::resources::{self, Resource};
use crate::{version, Auth, FetchError, Request};

#[derive(Debug)]
pub struct ClientContext {
    client: Client,
    /// Client nonce generator for Digest answers
    cnonce: fn() -> String,
}

impl ClientContext {
    /// Acquire the context.
    ///
    #[tracing::instrument]
    pub fn init() -> Result<Self, FetchError> {
        trace!("client::init");

        // Timeouts are per-request, see `Request::timeout()`.  The body is saved as sent.
        let client = Client::builder()
            .user_agent(version())
            .timeout(None::<Duration>)
            .no_gzip()
            .no_deflate()
            .build()
            .map_err(|e| FetchError::runtime(format!("can not initialise HTTP client: {e}")))?;

        resources::acquire(Resource::Context);
        Ok(ClientContext {
            client,
            cnonce: digest::cnonce,
        })
    }

    #[cfg(test)]
    fn with_cnonce(mut self, cnonce: fn() -> String) -> Self {
        self.cnonce = cnonce;
        self
    }

    fn get(&self, req: &Request) -> RequestBuilder {
        let rb = self.client.get(req.url().clone());
        match req.duration() {
            Some(d) => rb.timeout(d),
            None => rb,
        }
    }

    /// Perform the exchange and return the response, body not yet read.
    ///
    #[tracing::instrument(skip(self, req), fields(url = %req.url(), auth = %req.credentials()))]
    pub fn execute(&self, req: &Request) -> Result<Response, FetchError> {
        trace!("Fetching data from {}…", req.url());

        let resp = match req.credentials() {
            Auth::Anon => self.get(req).send()?,
            Auth::Basic { username, password } => {
                self.get(req).basic_auth(username, Some(password)).send()?
            }
            Auth::Bearer { token } => self.get(req).bearer_auth(token).send()?,
            Auth::Digest { username, password } => {
                let first = self.get(req).send()?;
                if first.status() != StatusCode::UNAUTHORIZED {
                    debug!("no challenge, status {}", first.status());
                    return Ok(first);
                }

                let challenge = first
                    .headers()
                    .get_all(WWW_AUTHENTICATE)
                    .iter()
                    .filter_map(|h| h.to_str().ok())
                    .find_map(digest::select)
                    .map(str::to_string)
                    .ok_or_else(|| FetchError::runtime("401 without a Digest challenge"))?;

                let challenge = Challenge::parse(&challenge)?;
                let header = challenge.respond(
                    "GET",
                    &req.target(),
                    username,
                    password,
                    &(self.cnonce)(),
                );

                self.get(req).header(AUTHORIZATION, header).send()?
            }
        };
        debug!("status = {}", resp.status());
        Ok(resp)
    }
}

impl Drop for ClientContext {
    fn drop(&mut self) {
        trace!("client::release");
        resources::release(Resource::Context);
    }
}
