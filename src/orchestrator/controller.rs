//! Exam session controller.
//!
//! Owns the start/end/poll lifecycle and emits events for presentation layers.

use crate::backend::ExamClient;
use crate::error::RequestError;
use crate::model::{ControllerEvent, ExamStatus, StatusReply, StopReason};
use crate::orchestrator::poller::{Poller, SessionTracker, StartOutcome};
use crate::status_text::TERMINATION_ALERT;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Commands emitted by UI layers to drive the exam session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UiCommand {
    StartExam,
    EndExam,
    Quit,
}

/// A finished server call, tagged with what it was for.
enum Completion {
    Started(Result<StatusReply, RequestError>),
    Ended(Result<StatusReply, RequestError>),
    Polled {
        generation: u64,
        result: Result<ExamStatus, RequestError>,
    },
}

struct Controller {
    client: ExamClient,
    poll_interval: Duration,
    poller: Poller,
    session: Option<SessionTracker>,
    event_tx: UnboundedSender<ControllerEvent>,
}

impl Controller {
    fn emit(&self, ev: ControllerEvent) {
        let _ = self.event_tx.send(ev);
    }

    fn request(&self, cmd: UiCommand) -> Option<BoxFuture<'static, Completion>> {
        let client = self.client.clone();
        match cmd {
            UiCommand::StartExam => {
                info!("requesting exam start");
                Some(async move { Completion::Started(client.start_exam().await) }.boxed())
            }
            UiCommand::EndExam => {
                info!("requesting exam end");
                Some(async move { Completion::Ended(client.end_exam().await) }.boxed())
            }
            UiCommand::Quit => None,
        }
    }

    fn poll(&mut self, generation: u64) -> Option<BoxFuture<'static, Completion>> {
        if !self.poller.begin_poll(generation) {
            debug!(generation, "previous status check still in flight; skipping tick");
            return None;
        }
        let client = self.client.clone();
        Some(
            async move {
                Completion::Polled {
                    generation,
                    result: client.check_status().await,
                }
            }
            .boxed(),
        )
    }

    fn apply(&mut self, done: Completion) {
        match done {
            Completion::Started(Ok(reply)) => {
                self.emit(ControllerEvent::Alert {
                    message: reply.status,
                });
                self.start_polling();
            }
            Completion::Ended(Ok(reply)) => {
                self.emit(ControllerEvent::Alert {
                    message: reply.status,
                });
                self.stop_polling(StopReason::EndRequested);
            }
            Completion::Started(Err(e)) | Completion::Ended(Err(e)) => self.report_failure(e),
            Completion::Polled { generation, result } => {
                if !self.poller.finish_poll(generation) {
                    debug!(generation, "discarding status from a stopped poll timer");
                    return;
                }
                match result {
                    Ok(status) => self.apply_status(status),
                    Err(e) => {
                        if let Some(session) = self.session.as_mut() {
                            session.record_failure();
                        }
                        self.report_failure(e);
                    }
                }
            }
        }
    }

    fn apply_status(&mut self, status: ExamStatus) {
        if let Some(session) = self.session.as_mut() {
            session.record_status(&status);
        }
        let terminated = status.exam_terminated;
        self.emit(ControllerEvent::StatusUpdated { status });
        if terminated {
            warn!("server reports exam terminated");
            self.stop_polling(StopReason::Terminated);
            self.emit(ControllerEvent::Alert {
                message: TERMINATION_ALERT.to_string(),
            });
        }
    }

    fn start_polling(&mut self) {
        match self.poller.start() {
            StartOutcome::Started => {
                info!(interval = ?self.poll_interval, "status polling started");
                self.session = Some(SessionTracker::begin(
                    self.client.base_url(),
                    self.poll_interval,
                ));
            }
            StartOutcome::Replaced => {
                info!("status polling restarted");
                self.emit(ControllerEvent::Info {
                    message: "Status polling restarted".into(),
                });
            }
        }
        self.emit(ControllerEvent::PollingStarted);
    }

    fn stop_polling(&mut self, reason: StopReason) {
        if !self.poller.stop() {
            debug!("stop requested while idle");
            return;
        }
        info!(reason = reason.as_str(), "status polling stopped");
        self.emit(ControllerEvent::PollingStopped { reason });
        if let Some(session) = self.session.take() {
            self.emit(ControllerEvent::SessionEnded {
                summary: Box::new(session.finish(reason)),
            });
        }
    }

    fn report_failure(&self, e: RequestError) {
        warn!(error = %e, "request failed");
        self.emit(ControllerEvent::RequestFailed {
            endpoint: e.endpoint(),
            error: e.to_string(),
        });
    }
}

/// Drive the exam session from UI commands and emit events back to presentation layers.
///
/// Returns when `Quit` arrives or the command channel closes. Quitting does not end the exam
/// on the server.
pub(crate) async fn run_controller(
    client: ExamClient,
    poll_interval: Duration,
    event_tx: UnboundedSender<ControllerEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut ctl = Controller {
        client,
        poll_interval,
        poller: Poller::new(poll_interval),
        session: None,
        event_tx,
    };
    // Requests run alongside the loop so commands stay responsive while the server is slow.
    let mut in_flight: FuturesUnordered<BoxFuture<'static, Completion>> = FuturesUnordered::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Quit) | None => break,
                    Some(cmd) => {
                        if let Some(fut) = ctl.request(cmd) {
                            in_flight.push(fut);
                        }
                    }
                }
            }
            generation = ctl.poller.tick() => {
                if let Some(fut) = ctl.poll(generation) {
                    in_flight.push(fut);
                }
            }
            Some(done) = in_flight.next(), if !in_flight.is_empty() => {
                ctl.apply(done);
            }
        }
    }

    if ctl.poller.is_polling() {
        debug!("controller exiting while polling; exam left running on the server");
    }
    Ok(())
}
