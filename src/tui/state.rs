use crate::model::{ControllerEvent, ExamStatus, SessionSummary, StopReason};
use crate::orchestrator::UiCommand;
use crossterm::event::{KeyCode, KeyModifiers};
use std::time::Instant;

pub const TAB_STATUS: usize = 0;
pub const TAB_HELP: usize = 1;
pub const TAB_COUNT: usize = 2;

pub struct UiState {
    pub tab: usize,
    pub base_url: String,
    pub polling: bool,
    pub status: Option<ExamStatus>,
    pub last_update: Option<Instant>,
    pub info: String,
    // Modal message; blocks other keys until dismissed, like a browser alert.
    pub alert: Option<String>,
    pub request_failures: u64,
    pub last_summary: Option<SessionSummary>,
    pub auto_save: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: TAB_STATUS,
            base_url: String::new(),
            polling: false,
            status: None,
            last_update: None,
            info: "Press 's' to start the exam".into(),
            alert: None,
            request_failures: 0,
            last_summary: None,
            auto_save: true,
        }
    }
}

/// What the UI loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    None,
    Send(UiCommand),
    Quit,
}

/// Fold a controller event into UI state. Saving a finished session is left to the caller.
pub fn apply_event(state: &mut UiState, ev: ControllerEvent) {
    match ev {
        ControllerEvent::Alert { message } => {
            // A newer alert replaces one the user has not acknowledged yet.
            state.alert = Some(message);
        }
        ControllerEvent::StatusUpdated { status } => {
            state.status = Some(status);
            state.last_update = Some(Instant::now());
        }
        ControllerEvent::PollingStarted => {
            state.polling = true;
            state.info = "Monitoring exam".into();
        }
        ControllerEvent::PollingStopped { reason } => {
            state.polling = false;
            state.info = match reason {
                StopReason::EndRequested => "Exam ended".into(),
                StopReason::Terminated => "Exam terminated by server".into(),
            };
        }
        ControllerEvent::RequestFailed { error, .. } => {
            state.request_failures += 1;
            state.info = format!("Request failed: {error}");
        }
        ControllerEvent::SessionEnded { summary } => {
            state.last_summary = Some(*summary);
        }
        ControllerEvent::Info { message } => {
            state.info = message;
        }
    }
}

/// Show every post-session message on the info line so a failure is not hidden by a
/// later success.
pub(crate) fn apply_session_messages(state: &mut UiState, messages: &[String]) {
    if !messages.is_empty() {
        state.info = messages.join(" | ");
    }
}

pub(crate) fn handle_key(
    state: &mut UiState,
    modifiers: KeyModifiers,
    code: KeyCode,
) -> KeyAction {
    if let (KeyModifiers::CONTROL, KeyCode::Char('c')) = (modifiers, code) {
        return KeyAction::Quit;
    }

    if state.alert.is_some() {
        match code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => state.alert = None,
            KeyCode::Char('q') => return KeyAction::Quit,
            _ => {}
        }
        return KeyAction::None;
    }

    match code {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Char('s') => {
            state.info = "Starting exam…".into();
            KeyAction::Send(UiCommand::StartExam)
        }
        KeyCode::Char('e') => {
            state.info = "Ending exam…".into();
            KeyAction::Send(UiCommand::EndExam)
        }
        KeyCode::Char('a') => {
            state.auto_save = !state.auto_save;
            state.info = if state.auto_save {
                "Auto-save enabled".into()
            } else {
                "Auto-save disabled".into()
            };
            KeyAction::None
        }
        KeyCode::Tab => {
            state.tab = (state.tab + 1) % TAB_COUNT;
            KeyAction::None
        }
        KeyCode::Char('?') => {
            state.tab = TAB_HELP;
            KeyAction::None
        }
        KeyCode::Esc => {
            state.tab = TAB_STATUS;
            KeyAction::None
        }
        _ => KeyAction::None,
    }
}
