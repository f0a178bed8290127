//! Session summary persistence.

use crate::model::SessionSummary;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default auto-save location under the local data directory.
pub fn sessions_dir() -> Result<PathBuf> {
    let base = dirs::data_local_dir().context("no local data directory on this platform")?;
    Ok(base.join("exam-proctor-cli").join("sessions"))
}

/// Save a finished session into `dir` and return the file written.
pub fn save_session_in(dir: &Path, summary: &SessionSummary) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(file_name_for(summary));
    export_json(&path, summary)?;
    Ok(path)
}

fn file_name_for(summary: &SessionSummary) -> String {
    // RFC3339 timestamps contain ':' which some filesystems reject.
    let stamp: String = summary
        .started_utc
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("session-{stamp}.json")
}

pub fn export_json(path: &Path, summary: &SessionSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let out = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, out).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExamStatus, StopReason};
    use std::time::Duration;

    fn summary() -> SessionSummary {
        SessionSummary {
            base_url: "http://127.0.0.1:5000".into(),
            started_utc: "2026-03-04T10:00:00Z".into(),
            ended_utc: "2026-03-04T10:05:00Z".into(),
            reason: StopReason::Terminated,
            poll_interval: Duration::from_secs(1),
            polls_ok: 300,
            polls_failed: 0,
            peak_noise_level: Some(42.0),
            windows_seen: vec!["Exam".into(), "Other".into()],
            last_status: Some(ExamStatus {
                exam_in_progress: true,
                exam_terminated: true,
                current_window: "Other".into(),
                noise_level: 3.0,
            }),
        }
    }

    #[test]
    fn export_json_writes_readable_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        export_json(&path, &summary()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let back: SessionSummary = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.reason, StopReason::Terminated);
        assert_eq!(back.windows_seen, vec!["Exam", "Other"]);
        assert_eq!(back.poll_interval, Duration::from_secs(1));
        assert!(raw.contains("\"poll_interval\": \"1s\""));
    }

    #[test]
    fn saved_file_name_is_filesystem_safe() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_session_in(dir.path(), &summary()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, "session-2026-03-04T10-00-00Z.json");
        assert!(path.exists());
    }
}
