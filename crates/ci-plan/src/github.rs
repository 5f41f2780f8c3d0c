//! GitHub Actions step outputs.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Pick a block delimiter that no line of `value` equals.
///
/// Derived from the value's SHA-256, rehashed until it is absent, so the
/// same value always gets the same delimiter.
fn block_delimiter(value: &str) -> String {
    let mut seed = Sha256::digest(value.as_bytes());
    loop {
        let delimiter = format!("ghadelimiter_{}", hex::encode(&seed[..16]));
        if !value.lines().any(|line| line == delimiter) {
            return delimiter;
        }
        seed = Sha256::digest(seed);
    }
}

/// Append a step output to the file named by `GITHUB_OUTPUT`.
///
/// Single-line values are written as `key=value`; values spanning several
/// lines use the `key<<DELIMITER` block form with a delimiter that does not
/// occur as a line of the value.
pub fn write_github_output(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    if value.contains('\n') {
        let delimiter = block_delimiter(value);
        writeln!(file, "{key}<<{delimiter}")?;
        writeln!(file, "{value}")?;
        writeln!(file, "{delimiter}")?;
    } else {
        writeln!(file, "{key}={value}")?;
    }

    debug!(key, path = %path.display(), "Wrote step output");
    Ok(())
}
