// Copyright (c) 2021 DDN. All rights reserved.
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file.

use std::{fs::File, io, path::Path, sync::Mutex};
pub use tracing;
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Initialize logging by reading the `RUST_LOG` environment variable.
/// Output goes to stderr so the module's stdout stays a single JSON
/// document.
pub fn init() {
    Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init()
        .expect("Could not init builder");
}

/// Append timestamped info-level lines to the given logfile.
pub fn init_logfile(path: &Path) -> io::Result<()> {
    let file = File::options().create(true).append(true).open(path)?;

    Subscriber::builder()
        .with_env_filter(EnvFilter::new("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .expect("Could not init builder");

    Ok(())
}
