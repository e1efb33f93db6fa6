// ============================================================
// Layer 6 — JSON Output Writer
// ============================================================
// All result files (predictions, eval results, export manifest)
// are written as JSON indented with four spaces.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::{fs, path::Path};

const INDENT: &[u8] = b"    ";

/// Serialize `value` to a four-space indented JSON string.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut ser)?;
    Ok(String::from_utf8(buf)?)
}

/// Write `value` to `path`, creating parent directories.
pub fn write_pretty_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = to_pretty_json(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::info!("Wrote '{}'", path.display());
    Ok(())
}
