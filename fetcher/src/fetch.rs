//! The `Fetcher` itself.
//!
//! A run is strictly linear: acquire the client context, build the request, execute it,
//! stream the body into the sink, close everything.  Any failure short-circuits to an exit
//! code, the guards taking care of releasing what was acquired.
//!

use std::io::Read;
use std::process::ExitCode;

use reqwest::blocking::Response;
use tracing::{info, trace, warn};

use crate::{ClientContext, Config, FetchError, Output};

/// Read buffer size.
const BUFSIZ: usize = 64 * 1024;

#[derive(Clone, Debug, Default)]
pub struct Fetcher {
    config: Config,
}

impl Fetcher {
    pub fn new(config: Config) -> Self {
        Fetcher { config }
    }

    /// Run and turn the outcome into an exit code, printing the error message on stdout.
    ///
    pub fn run(&self) -> ExitCode {
        match self.fetch() {
            Ok(n) => {
                info!("{n} bytes retrieved");
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("{e}");
                e.exit_code()
            }
        }
    }

    /// The heart of the matter: fetch and save data, returning the number of bytes written.
    ///
    #[tracing::instrument(skip(self))]
    pub fn fetch(&self) -> Result<u64, FetchError> {
        trace!("fetcher::fetch");

        let ctx = ClientContext::init()?;

        let req = self.config.request()?;
        info!("Fetching {} as {}", req.url(), req.credentials());

        let mut resp = ctx.execute(&req)?;
        if !resp.status().is_success() {
            warn!("server answered {}, saving the body anyway", resp.status());
        }

        // Only opened now so that a failed exchange never truncates a previous result.
        let sink = self.config.sink();
        info!("Writing to {sink}");
        let mut out = sink.open()?;

        match stream(&mut resp, &mut out) {
            Ok(()) => out.finish(),
            Err(e) => {
                out.discard();
                Err(e)
            }
        }
    }
}

/// Copy the body, keeping read (runtime) and write (sink) failures apart.
///
fn stream(resp: &mut Response, out: &mut Output) -> Result<(), FetchError> {
    let mut buf = vec![0u8; BUFSIZ];
    loop {
        let n = resp
            .read(&mut buf)
            .map_err(|e| FetchError::runtime(format!("error reading body: {e}")))?;
        if n == 0 {
            break;
        }
        out.put(&buf[..n])?;
    }
    trace!("{} bytes streamed", out.written());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use httpmock::prelude::*;
    use tempfile::tempdir;

    use super::*;

    fn config(url: String, output: std::path::PathBuf) -> Config {
        Config {
            url,
            output,
            ..Config::default()
        }
    }

    #[test]
    fn test_fetch_ok() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out_request");
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("<html>example</html>");
        });

        let n = Fetcher::new(config(server.base_url(), out.clone()))
            .fetch()
            .unwrap();

        m.assert();
        assert_eq!(20, n);
        assert_eq!("<html>example</html>", fs::read_to_string(&out).unwrap());
    }

    #[test]
    fn test_fetch_overwrites() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out_request");
        fs::write(&out, "previous run, longer than the new body").unwrap();

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("second");
        });

        Fetcher::new(config(server.base_url(), out.clone()))
            .fetch()
            .unwrap();
        assert_eq!("second", fs::read_to_string(&out).unwrap());
    }

    #[test]
    fn test_fetch_error_status_saved() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out_request");
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not found");
        });

        Fetcher::new(config(server.url("/missing"), out.clone()))
            .fetch()
            .unwrap();
        assert_eq!("not found", fs::read_to_string(&out).unwrap());
    }

    #[test]
    fn test_fetch_refused_leaves_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out_request");

        let e = Fetcher::new(config("http://127.0.0.1:1/".to_string(), out.clone()))
            .fetch()
            .unwrap_err();

        assert_eq!(1, e.code());
        assert!(!e.to_string().is_empty());
        assert!(!out.exists());
    }

    #[test]
    fn test_fetch_bad_auth() {
        let dir = tempdir().unwrap();
        let mut cfg = config(URL_UNUSED.to_string(), dir.path().join("out_request"));
        cfg.auth.method = crate::Selector::Code(123556456);

        let e = Fetcher::new(cfg).fetch().unwrap_err();
        assert_eq!(2, e.code());
        assert!(!dir.path().join("out_request").exists());
    }

    #[test]
    fn test_fetch_bad_output() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nonexistent").join("out_request");
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200).body("data");
        });

        let e = Fetcher::new(config(server.base_url(), out))
            .fetch()
            .unwrap_err();
        assert_eq!(3, e.code());
    }

    /// "hello", gzipped.
    const GZ_HELLO: [u8; 25] = [
        0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0xcb, 0x48, 0xcd, 0xc9, 0xc9,
        0x07, 0x00, 0x86, 0xa6, 0x10, 0x36, 0x05, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn test_fetch_keeps_encoded_body() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out_request");
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .header("content-encoding", "gzip")
                .body(GZ_HELLO);
        });

        let n = Fetcher::new(config(server.base_url(), out.clone()))
            .fetch()
            .unwrap();
        assert_eq!(GZ_HELLO.len() as u64, n);
        assert_eq!(GZ_HELLO.to_vec(), fs::read(&out).unwrap());
    }

    #[test]
    fn test_fetch_timeout_leaves_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out_request");
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .body("too late")
                .delay(Duration::from_secs(3));
        });

        let mut cfg = config(server.url("/slow"), out.clone());
        cfg.timeout = 1;

        let e = Fetcher::new(cfg).fetch().unwrap_err();
        assert_eq!(1, e.code());
        assert!(!out.exists());
    }

    #[test]
    fn test_fetch_truncated_body_leaves_nothing() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out_request");

        // Announce 100 bytes, send 7 then hang up.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut req = Vec::new();
            let mut buf = [0u8; 1024];
            while !req.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = std::io::Read::read(&mut sock, &mut buf).unwrap();
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
            }
            sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
                .unwrap();
        });

        let e = Fetcher::new(config(format!("http://{addr}/"), out.clone()))
            .fetch()
            .unwrap_err();
        server.join().unwrap();

        assert_eq!(1, e.code());
        assert!(!out.exists());
    }

    /// Never contacted, the request is rejected before.
    const URL_UNUSED: &str = "http://127.0.0.1:1/";
}
