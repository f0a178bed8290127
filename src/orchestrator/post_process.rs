//! Post-session processing utilities.
//!
//! Handles auto-save and exports after a polling session ends.

use crate::model::SessionSummary;
use crate::storage;
use std::path::Path;
use tracing::warn;

/// Result of post-session processing, ready for presentation layers.
pub(crate) struct ProcessedSession {
    pub messages: Vec<String>,
}

/// Process a finished session: auto-save and export. Failures become messages.
pub(crate) fn process_session_end(
    export_json: Option<&Path>,
    auto_save: bool,
    summary: &SessionSummary,
) -> ProcessedSession {
    if !auto_save {
        return save_and_export(None, export_json, summary);
    }
    match storage::sessions_dir() {
        Ok(dir) => save_and_export(Some(&dir), export_json, summary),
        Err(e) => {
            warn!("auto-save failed: {e:#}");
            let mut processed = save_and_export(None, export_json, summary);
            processed
                .messages
                .insert(0, format!("Auto-save failed: {e:#}"));
            processed
        }
    }
}

fn save_and_export(
    save_dir: Option<&Path>,
    export_json: Option<&Path>,
    summary: &SessionSummary,
) -> ProcessedSession {
    let mut messages = Vec::new();

    if let Some(dir) = save_dir {
        match storage::save_session_in(dir, summary) {
            Ok(p) => messages.push(format!("Saved: {}", p.display())),
            Err(e) => {
                warn!("auto-save failed: {e:#}");
                messages.push(format!("Auto-save failed: {e:#}"));
            }
        }
    }

    if let Some(export_path) = export_json {
        match storage::export_json(export_path, summary) {
            Ok(_) => messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => {
                warn!("export failed: {e:#}");
                messages.push(format!("Export JSON failed: {e:#}"));
            }
        }
    }

    ProcessedSession { messages }
}
