//! Logging initializer
//!
//! Filters come from `RUST_LOG`, output goes to stderr as stdout is reserved for the error
//! message (or the body itself).

use std::io;

use eyre::Result;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter::EnvFilter, fmt};

pub fn init_logging() -> Result<()> {
    let fmt = fmt::layer()
        .with_writer(io::stderr)
        .with_thread_names(true)
        .with_target(false)
        .compact();

    // Load filters from environment
    //
    let filter = EnvFilter::from_default_env();

    // Combine filter & specific format
    //
    tracing_subscriber::registry().with(filter).with(fmt).try_init()?;
    Ok(())
}
