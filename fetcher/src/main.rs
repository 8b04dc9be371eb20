//! Fetch one URL and save what comes back.
//!
//! Command-line arguments are not looked at.  Exit codes:
//!
//! - 0 success
//! - 1 network failure
//! - 2 configuration failure
//! - 3 output file failure
//!

use std::process::ExitCode;

use tracing::{debug, info};

use fetcher::{init_logging, version, Config, FetchError, Fetcher};

fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("can not initialise logging: {e}");
    }

    info!("{}", version());

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            let e = FetchError::from(e);
            println!("{e}");
            return e.exit_code();
        }
    };
    debug!("config = {cfg:?}");

    Fetcher::new(cfg).run()
}
