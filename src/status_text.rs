//! Text rendering for exam status and session summaries.
//!
//! Shared by the TUI and the headless output modes so every surface shows the same wording.

use crate::model::{ExamStatus, SessionSummary};

/// Shown when the server reports termination. The server does not say which check fired.
pub const TERMINATION_ALERT: &str = "Exam has been terminated. This could be due to no face detected, multiple face detected, tab switch, or excessive noise.";

/// The four status fields, one per line, values verbatim.
pub fn status_lines(status: &ExamStatus) -> Vec<String> {
    vec![
        format!("Exam in progress: {}", status.exam_in_progress),
        format!("Exam terminated: {}", status.exam_terminated),
        format!("Current window: {}", status.current_window),
        format!("Noise level: {}", status.noise_level),
    ]
}

pub fn render_status(status: &ExamStatus) -> String {
    status_lines(status).join("\n")
}

/// Human-readable session summary for text mode.
pub(crate) fn summary_lines(summary: &SessionSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Session {}", summary.reason.as_str()),
        format!("Server: {}", summary.base_url),
        format!("Started: {}", summary.started_utc),
        format!("Ended:   {}", summary.ended_utc),
        format!(
            "Polls: {} ok, {} failed (every {})",
            summary.polls_ok,
            summary.polls_failed,
            humantime::format_duration(summary.poll_interval)
        ),
    ];
    if let Some(peak) = summary.peak_noise_level {
        lines.push(format!("Peak noise level: {peak}"));
    }
    if !summary.windows_seen.is_empty() {
        lines.push(format!("Windows seen: {}", summary.windows_seen.join(", ")));
    }
    lines
}
