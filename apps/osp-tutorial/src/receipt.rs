use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::pipeline::TutorialSummary;

#[derive(Serialize)]
pub struct ArgsSummary {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub renderer: String,
    pub format: String,
    pub scene: Option<PathBuf>,
    pub device: String,
    pub library_flags: Vec<String>,
}

#[derive(Serialize)]
pub struct HostInfo {
    pub os: String,
    pub arch: String,
}

impl HostInfo {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct RunReceipt {
    pub version: String,
    pub started_at_utc: String,
    pub finished_at_utc: String,
    pub args: ArgsSummary,
    pub summary: TutorialSummary,
    pub host: HostInfo,
}

/// Writes `value` as pretty JSON next to `path`, then renames it into place.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut staged = path.as_os_str().to_owned();
    staged.push(format!(".{}.tmp", std::process::id()));
    let staged = PathBuf::from(staged);

    let written = fs::File::create(&staged)
        .map(BufWriter::new)
        .map_err(anyhow::Error::from)
        .and_then(|mut out| {
            serde_json::to_writer_pretty(&mut out, value)?;
            out.flush()?;
            Ok(())
        })
        .and_then(|()| Ok(fs::rename(&staged, path)?));
    if written.is_err() {
        let _ = fs::remove_file(&staged);
    }
    written.with_context(|| format!("writing receipt {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_json_replaces_the_target_without_leftovers() {
        let dir = std::env::temp_dir().join(format!("osp-tutorial-receipt-{}", std::process::id()));
        let path = dir.join("run.json");
        write_json(&path, &HostInfo::current()).unwrap();
        write_json(&path, &HostInfo::current()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["os"], std::env::consts::OS);

        let entries = fs::read_dir(&dir).unwrap().count();
        let _ = fs::remove_dir_all(&dir);
        assert_eq!(entries, 1);
    }
}
