use super::RunArtifacts;
use anyhow::Context;
use std::path::Path;

pub fn write_json(artifacts: &RunArtifacts, out: &Path) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(artifacts)?;
    std::fs::write(out, body).with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}
