//! Where the response body goes.
//!
//! A `Sink` is the configured destination, either a file (truncated on open) or standard
//! output.  Opening it gives an `Output`, a guard which is released exactly once whatever
//! happens to the run.
//!

use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::{self, stdout, BufWriter, Stdout, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::resources::{self, Resource};
use crate::FetchError;

/// Name used for standard output, as everywhere else.
pub const STDOUT: &str = "-";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Sink {
    File(PathBuf),
    Stdout,
}

impl Sink {
    /// Return the path or `-`
    ///
    pub fn path(&self) -> PathBuf {
        match self {
            Sink::File(p) => p.clone(),
            Sink::Stdout => PathBuf::from(STDOUT),
        }
    }

    /// Open the sink, truncating the file if it already exists.
    ///
    #[tracing::instrument]
    pub fn open(&self) -> Result<Output, FetchError> {
        let inner = match self {
            Sink::File(p) => {
                trace!("... into {}", p.display());

                let fh = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(p)
                    .map_err(|e| FetchError::sink(p, e))?;
                Inner::File(BufWriter::new(fh))
            }
            Sink::Stdout => {
                trace!("...into stdout");
                Inner::Stdout(stdout())
            }
        };
        resources::acquire(Resource::Sink);
        Ok(Output {
            sink: self.clone(),
            inner: Some(inner),
            written: 0,
        })
    }
}

impl From<&str> for Sink {
    fn from(s: &str) -> Self {
        match s {
            STDOUT => Sink::Stdout,
            _ => Sink::File(PathBuf::from(s)),
        }
    }
}

impl From<&Path> for Sink {
    fn from(p: &Path) -> Self {
        if p == Path::new(STDOUT) {
            Sink::Stdout
        } else {
            Sink::File(p.to_path_buf())
        }
    }
}

impl Display for Sink {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Sink::File(p) => write!(f, "{}", p.display()),
            Sink::Stdout => write!(f, "{STDOUT}"),
        }
    }
}

#[derive(Debug)]
enum Inner {
    File(BufWriter<File>),
    Stdout(Stdout),
}

/// An opened sink.
///
#[derive(Debug)]
pub struct Output {
    sink: Sink,
    inner: Option<Inner>,
    written: u64,
}

impl Output {
    /// Bytes written so far
    ///
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Write a chunk, mapping failures to the sink error kind.
    ///
    pub fn put(&mut self, buf: &[u8]) -> Result<(), FetchError> {
        self.write_all(buf)
            .map_err(|e| FetchError::sink(self.sink.path(), e))
    }

    /// Flush and close.  A file which can not be flushed is removed like in `discard()`.
    ///
    #[tracing::instrument(skip(self))]
    pub fn finish(mut self) -> Result<u64, FetchError> {
        trace!("output::finish");

        let r = match self.inner.as_mut() {
            Some(Inner::File(w)) => w.flush().and_then(|_| w.get_ref().sync_all()),
            Some(Inner::Stdout(s)) => s.flush(),
            None => Ok(()),
        };
        if let Err(e) = r {
            let path = self.sink.path();
            self.discard();
            return Err(FetchError::sink(path, e));
        }
        drop(self.inner.take());
        debug!("{} bytes written to {}", self.written, self.sink);
        Ok(self.written)
    }

    /// Close and remove whatever was written, used when the run fails half-way.
    ///
    #[tracing::instrument(skip(self))]
    pub fn discard(mut self) {
        trace!("output::discard");

        // Close the handle before removing the file.
        drop(self.inner.take());
        if let Sink::File(p) = &self.sink {
            if let Err(e) = fs::remove_file(p) {
                warn!("can not remove partial {}: {e}", p.display());
            }
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match self.inner.as_mut() {
            Some(Inner::File(w)) => w.write(buf)?,
            Some(Inner::Stdout(s)) => s.write(buf)?,
            None => return Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed")),
        };
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            Some(Inner::File(w)) => w.flush(),
            Some(Inner::Stdout(s)) => s.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        // BufWriter flushes on drop, errors are lost there which is why `finish()` exists.
        drop(self.inner.take());
        resources::release(Resource::Sink);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;

    #[rstest]
    #[case("-", Sink::Stdout)]
    #[case("out_request", Sink::File(PathBuf::from("out_request")))]
    #[case("/tmp/x", Sink::File(PathBuf::from("/tmp/x")))]
    fn test_sink_from_str(#[case] s: &str, #[case] sink: Sink) {
        assert_eq!(sink, Sink::from(s));
        assert_eq!(s, sink.to_string());
    }

    #[test]
    fn test_open_truncates() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("out");
        fs::write(&p, "a much longer previous content").unwrap();

        let mut out = Sink::File(p.clone()).open().unwrap();
        out.put(b"new").unwrap();
        assert_eq!(3, out.finish().unwrap());
        assert_eq!("new", fs::read_to_string(&p).unwrap());
    }

    #[test]
    fn test_open_bad_dir() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("nonexistent").join("out");

        let e = Sink::File(p).open().unwrap_err();
        assert_eq!(3, e.code());
    }

    #[test]
    fn test_discard_removes_file() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("out");

        let mut out = Sink::File(p.clone()).open().unwrap();
        out.put(b"partial").unwrap();
        out.discard();
        assert!(!p.exists());
    }

    #[test]
    fn test_stdout_finish() {
        let out = Sink::Stdout.open().unwrap();
        assert_eq!(0, out.finish().unwrap());
    }
}
