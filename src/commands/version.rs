use anyhow::Result;
use std::io::Write;

/// Writes the version banner.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn execute(out: &mut dyn Write) -> Result<()> {
    writeln!(
        out,
        "yabrc - yet another bit rot checker, version {}",
        crate::VERSION
    )?;
    writeln!(out, "Licensed under the Apache License, Version 2.0")?;
    Ok(())
}
