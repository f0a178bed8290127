use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub user_agent: String,
}

/// Server endpoints the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    StartExam,
    EndExam,
    CheckStatus,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::StartExam => "/start_exam",
            Endpoint::EndExam => "/end_exam",
            Endpoint::CheckStatus => "/check_status",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Snapshot returned by `/check_status`. Each poll replaces the previous view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamStatus {
    pub exam_in_progress: bool,
    pub exam_terminated: bool,
    #[serde(default)]
    pub current_window: String,
    #[serde(serialize_with = "serialize_noise")]
    pub noise_level: f64,
}

// Integral levels are written back as integers, the way the server sends them.
fn serialize_noise<S: serde::Serializer>(level: &f64, s: S) -> Result<S::Ok, S::Error> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if level.fract() == 0.0 && level.abs() < MAX_EXACT {
        s.serialize_i64(*level as i64)
    } else {
        s.serialize_f64(*level)
    }
}

fn serialize_peak_noise<S: serde::Serializer>(
    level: &Option<f64>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match level {
        Some(level) => serialize_noise(level, s),
        None => s.serialize_none(),
    }
}

/// Reply of `/start_exam` and `/end_exam`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndRequested,
    Terminated,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::EndRequested => "ended by user",
            StopReason::Terminated => "terminated by server",
        }
    }
}

/// Events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// Message the user has to see (server reply or termination notice).
    Alert { message: String },
    StatusUpdated { status: ExamStatus },
    PollingStarted,
    PollingStopped { reason: StopReason },
    RequestFailed { endpoint: Endpoint, error: String },
    SessionEnded {
        // Box to keep ControllerEvent small; the summary carries a status snapshot and a window list.
        summary: Box<SessionSummary>,
    },
    Info { message: String },
}

/// Record of one Idle -> Polling -> Idle cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub base_url: String,
    #[serde(default)]
    pub started_utc: String,
    #[serde(default)]
    pub ended_utc: String,
    pub reason: StopReason,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    pub polls_ok: u64,
    pub polls_failed: u64,
    #[serde(default, serialize_with = "serialize_peak_noise")]
    pub peak_noise_level: Option<f64>,
    #[serde(default)]
    pub windows_seen: Vec<String>,
    #[serde(default)]
    pub last_status: Option<ExamStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_status_accepts_integer_noise_level() {
        let raw = r#"{"current_window":"Exam - Browser","exam_in_progress":true,"exam_terminated":false,"noise_level":12}"#;
        let status: ExamStatus = serde_json::from_str(raw).unwrap();
        assert!(status.exam_in_progress);
        assert!(!status.exam_terminated);
        assert_eq!(status.current_window, "Exam - Browser");
        assert_eq!(status.noise_level, 12.0);
    }

    #[test]
    fn integral_noise_level_is_echoed_as_integer() {
        let raw = r#"{"current_window":"Exam","exam_in_progress":true,"exam_terminated":false,"noise_level":12}"#;
        let status: ExamStatus = serde_json::from_str(raw).unwrap();
        let out = serde_json::to_string(&status).unwrap();
        assert!(out.contains(r#""noise_level":12}"#), "{out}");

        let status = ExamStatus {
            noise_level: 12.5,
            ..status
        };
        let out = serde_json::to_string(&status).unwrap();
        assert!(out.contains(r#""noise_level":12.5"#), "{out}");
    }

    #[test]
    fn exam_status_defaults_missing_window() {
        let raw = r#"{"exam_in_progress":false,"exam_terminated":false,"noise_level":0}"#;
        let status: ExamStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(status.current_window, "");
    }

    #[test]
    fn controller_event_serializes_with_tag() {
        let ev = ControllerEvent::PollingStopped {
            reason: StopReason::Terminated,
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["event"], "polling_stopped");
        assert_eq!(v["reason"], "terminated");

        let ev = ControllerEvent::RequestFailed {
            endpoint: Endpoint::CheckStatus,
            error: "boom".into(),
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["endpoint"], "check_status");
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(Endpoint::StartExam.path(), "/start_exam");
        assert_eq!(Endpoint::EndExam.path(), "/end_exam");
        assert_eq!(Endpoint::CheckStatus.to_string(), "/check_status");
    }
}
