use crate::backend::ExamClient;
use crate::logging::{self, LogTarget};
use crate::model::{ClientConfig, ControllerEvent, Endpoint};
use crate::orchestrator::{self, UiCommand};
use crate::status_text;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "exam-proctor-cli",
    version,
    about = "Exam proctoring client with optional TUI"
)]
pub struct Cli {
    /// Base URL of the proctoring server
    #[arg(long, env = "EXAM_PROCTOR_URL", default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Status poll interval while an exam is running
    #[arg(long, default_value = "1s")]
    pub poll_interval: humantime::Duration,

    /// Per-request timeout
    #[arg(long, default_value = "10s")]
    pub request_timeout: humantime::Duration,

    /// Run headless and print events as JSON lines (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Run headless and print status as text (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Check status once and exit; does not start or end an exam
    #[arg(long)]
    pub once: bool,

    /// Export the session summary as JSON when the session ends
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Use --auto-save true or --auto-save false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_save: bool,

    /// Write logs to this file (TUI mode discards logs otherwise)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    fn is_headless(&self) -> bool {
        self.json || self.text || self.once
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.text {
        return Err(anyhow::anyhow!(
            "--json and --text are mutually exclusive. Pick one output format."
        ));
    }
    if Duration::from(args.poll_interval).is_zero() {
        return Err(anyhow::anyhow!("--poll-interval must be greater than zero"));
    }

    let log_target = match args.log_file.as_deref() {
        Some(p) => LogTarget::File(p),
        None if args.is_headless() || cfg!(not(feature = "tui")) => LogTarget::Stderr,
        None => LogTarget::Discard,
    };
    logging::init(log_target)?;

    let cfg = build_config(&args);
    info!(base_url = %cfg.base_url, "using proctoring server");

    if args.once {
        return run_once(&cfg, args.output_format()).await;
    }

    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args, cfg).await;
        }
    }

    run_headless(args, cfg).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        poll_interval: Duration::from(args.poll_interval),
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("exam-proctor-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

async fn run_once(cfg: &ClientConfig, format: OutputFormat) -> Result<()> {
    let client = ExamClient::new(cfg)?;
    let status = client
        .check_status()
        .await
        .context("status check failed")?;
    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&status)?,
        OutputFormat::Text => status_text::render_status(&status),
    };
    println!("{out}");
    Ok(())
}

/// Start an exam, follow its status until the session ends, then print a summary.
/// Ctrl-C ends the exam; a second Ctrl-C quits without waiting for the server.
async fn run_headless(args: Cli, cfg: ClientConfig) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let (int_tx, int_rx) = mpsc::unbounded_channel::<()>();
    let signals = tokio::spawn(forward_ctrl_c(int_tx));

    let res = follow_session(args, cfg, out_tx, int_rx).await;

    signals.abort();
    let _ = out_handle.await;
    res
}

/// Forward Ctrl-C presses for the whole run, so one that lands while the session
/// loop is busy is queued instead of dropped.
async fn forward_ctrl_c(tx: mpsc::UnboundedSender<()>) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if tx.send(()).is_err() {
            break;
        }
    }
}

async fn follow_session(
    args: Cli,
    cfg: ClientConfig,
    out_tx: mpsc::UnboundedSender<OutputLine>,
    mut interrupts: mpsc::UnboundedReceiver<()>,
) -> Result<()> {
    let format = args.output_format();
    let client = ExamClient::new(&cfg)?;
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<ControllerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let handle = tokio::spawn(orchestrator::run_controller(
        client,
        cfg.poll_interval,
        evt_tx,
        cmd_rx,
    ));
    let _ = cmd_tx.send(UiCommand::StartExam);

    let mut polling = false;
    let mut end_requested = false;
    let mut outcome: Result<()> = Ok(());

    loop {
        tokio::select! {
            ev = evt_rx.recv() => {
                let Some(ev) = ev else { break };
                if format == OutputFormat::Json {
                    if let Ok(line) = serde_json::to_string(&ev) {
                        let _ = out_tx.send(OutputLine::Stdout(line));
                    }
                }
                match ev {
                    ControllerEvent::Alert { message } => {
                        if format == OutputFormat::Text {
                            let _ = out_tx.send(OutputLine::Stderr(format!("!! {message}")));
                        }
                    }
                    ControllerEvent::StatusUpdated { status } => {
                        if format == OutputFormat::Text {
                            let line = status_text::status_lines(&status).join(" | ");
                            let _ = out_tx.send(OutputLine::Stdout(line));
                        }
                    }
                    ControllerEvent::PollingStarted => polling = true,
                    ControllerEvent::PollingStopped { .. } => polling = false,
                    ControllerEvent::RequestFailed { endpoint, error } => {
                        if format == OutputFormat::Text {
                            let _ = out_tx.send(OutputLine::Stderr(format!("Request failed: {error}")));
                        }
                        if endpoint == Endpoint::StartExam && !polling {
                            outcome = Err(anyhow::anyhow!("could not start exam: {error}"));
                            let _ = cmd_tx.send(UiCommand::Quit);
                        }
                    }
                    ControllerEvent::SessionEnded { summary } => {
                        if format == OutputFormat::Text {
                            for line in status_text::summary_lines(&summary) {
                                let _ = out_tx.send(OutputLine::Stdout(line));
                            }
                        }
                        let processed = orchestrator::process_session_end(
                            args.export_json.as_deref(),
                            args.auto_save,
                            &summary,
                        );
                        for msg in processed.messages {
                            let _ = out_tx.send(OutputLine::Stderr(msg));
                        }
                        let _ = cmd_tx.send(UiCommand::Quit);
                    }
                    ControllerEvent::Info { message } => {
                        if format == OutputFormat::Text {
                            let _ = out_tx.send(OutputLine::Stderr(message));
                        }
                    }
                }
            }
            Some(()) = interrupts.recv() => {
                if polling && !end_requested {
                    end_requested = true;
                    let _ = out_tx.send(OutputLine::Stderr(
                        "Ending exam… (Ctrl-C again to quit immediately)".into(),
                    ));
                    let _ = cmd_tx.send(UiCommand::EndExam);
                } else {
                    let _ = cmd_tx.send(UiCommand::Quit);
                }
            }
        }
    }

    handle
        .await
        .context("controller task failed")?
        .context("controller failed")?;

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_text::TERMINATION_ALERT;

    const IN_PROGRESS: &str = r#"{"current_window":"Exam","exam_in_progress":true,"exam_terminated":false,"noise_level":3}"#;
    const TERMINATED: &str = r#"{"current_window":"Other","exam_in_progress":true,"exam_terminated":true,"noise_level":12}"#;

    fn headless_args(url: &str, mode: &str) -> Cli {
        Cli::try_parse_from([
            "exam-proctor-cli",
            mode,
            "--base-url",
            url,
            "--poll-interval",
            "50ms",
            "--request-timeout",
            "2s",
            "--auto-save",
            "false",
        ])
        .unwrap()
    }

    fn json_mock(server: &mut mockito::Server, path: &str, body: &str) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    /// Split captured output into (stdout, stderr) lines.
    fn drain(rx: &mut mpsc::UnboundedReceiver<OutputLine>) -> (Vec<String>, Vec<String>) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        while let Ok(line) = rx.try_recv() {
            match line {
                OutputLine::Stdout(l) => out.push(l),
                OutputLine::Stderr(l) => err.push(l),
            }
        }
        (out, err)
    }

    async fn run_session(args: Cli) -> (Result<()>, Vec<String>, Vec<String>) {
        let cfg = build_config(&args);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_int_tx, int_rx) = mpsc::unbounded_channel();
        let res = tokio::time::timeout(
            Duration::from_secs(10),
            follow_session(args, cfg, out_tx, int_rx),
        )
        .await
        .expect("session did not finish");
        let (out, err) = drain(&mut out_rx);
        (res, out, err)
    }

    #[tokio::test]
    async fn failed_start_exits_with_error() {
        let mut server = mockito::Server::new_async().await;
        let start = server
            .mock("GET", "/start_exam")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let status = server
            .mock("GET", "/check_status")
            .expect(0)
            .create_async()
            .await;

        let (res, _, err) = run_session(headless_args(&server.url(), "--text")).await;

        let e = res.unwrap_err();
        assert!(format!("{e:#}").contains("could not start exam"), "{e:#}");
        assert!(err.iter().any(|l| l.starts_with("Request failed:")));
        start.assert_async().await;
        status.assert_async().await;
    }

    #[tokio::test]
    async fn terminated_session_prints_summary_and_exits() {
        let mut server = mockito::Server::new_async().await;
        let _start = json_mock(&mut server, "/start_exam", r#"{"status":"Exam started"}"#)
            .create_async()
            .await;
        let _status = json_mock(&mut server, "/check_status", TERMINATED)
            .create_async()
            .await;

        let (res, out, err) = run_session(headless_args(&server.url(), "--text")).await;

        res.unwrap();
        assert!(out.iter().any(|l| l.contains("Exam terminated: true")));
        assert!(out.iter().any(|l| l == "Session terminated by server"));
        assert!(out.iter().any(|l| l == "Peak noise level: 12"));
        assert!(err.iter().any(|l| l == "!! Exam started"));
        assert!(err.iter().any(|l| l == &format!("!! {TERMINATION_ALERT}")));
    }

    #[tokio::test]
    async fn json_mode_writes_one_event_per_line() {
        let mut server = mockito::Server::new_async().await;
        let _start = json_mock(&mut server, "/start_exam", r#"{"status":"Exam started"}"#)
            .create_async()
            .await;
        let _status = json_mock(&mut server, "/check_status", TERMINATED)
            .create_async()
            .await;

        let (res, out, err) = run_session(headless_args(&server.url(), "--json")).await;

        res.unwrap();
        assert!(err.is_empty(), "{err:?}");
        let events: Vec<ControllerEvent> = out
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert!(matches!(events.first(), Some(ControllerEvent::Alert { message }) if message == "Exam started"));
        assert!(events
            .iter()
            .any(|e| matches!(e, ControllerEvent::PollingStarted)));
        assert!(events
            .iter()
            .any(|e| matches!(e, ControllerEvent::SessionEnded { .. })));
        assert!(matches!(events.last(), Some(ControllerEvent::Alert { message }) if message == TERMINATION_ALERT));
        // Integer noise levels are echoed unchanged.
        assert!(out.iter().any(|l| l.contains(r#""noise_level":12}"#)));
    }

    #[tokio::test]
    async fn interrupt_ends_exam_then_exits() {
        let mut server = mockito::Server::new_async().await;
        let _start = json_mock(&mut server, "/start_exam", r#"{"status":"Exam started"}"#)
            .create_async()
            .await;
        let _status = json_mock(&mut server, "/check_status", IN_PROGRESS)
            .create_async()
            .await;
        let end = json_mock(&mut server, "/end_exam", r#"{"status":"Exam ended"}"#)
            .expect(1)
            .create_async()
            .await;

        let args = headless_args(&server.url(), "--text");
        let cfg = build_config(&args);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (int_tx, int_rx) = mpsc::unbounded_channel();
        let session = tokio::spawn(follow_session(args, cfg, out_tx, int_rx));

        // A status line means polling is live.
        tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(line) = out_rx.recv().await {
                if matches!(&line, OutputLine::Stdout(l) if l.contains("Exam in progress")) {
                    break;
                }
            }
        })
        .await
        .unwrap();
        int_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(10), session)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let (out, err) = drain(&mut out_rx);
        assert!(err.iter().any(|l| l.starts_with("Ending exam")));
        assert!(err.iter().any(|l| l == "!! Exam ended"));
        assert!(out.iter().any(|l| l == "Session ended by user"));
        end.assert_async().await;
    }

    #[tokio::test]
    async fn once_propagates_request_error() {
        let mut server = mockito::Server::new_async().await;
        let _status = server
            .mock("GET", "/check_status")
            .with_status(503)
            .create_async()
            .await;
        let args = headless_args(&server.url(), "--once");

        let e = run_once(&build_config(&args), OutputFormat::Text)
            .await
            .unwrap_err();
        let msg = format!("{e:#}");
        assert!(msg.contains("status check failed"), "{msg}");
        assert!(msg.contains("503"), "{msg}");
    }

    #[tokio::test]
    async fn once_succeeds_against_live_status() {
        let mut server = mockito::Server::new_async().await;
        let status = json_mock(&mut server, "/check_status", IN_PROGRESS)
            .expect(1)
            .create_async()
            .await;
        let args = headless_args(&server.url(), "--once");

        run_once(&build_config(&args), OutputFormat::Json)
            .await
            .unwrap();
        status.assert_async().await;
    }

    #[test]
    fn defaults_match_server_conventions() {
        let args = Cli::try_parse_from(["exam-proctor-cli"]).unwrap();
        let cfg = build_config(&args);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert!(cfg.user_agent.starts_with("exam-proctor-cli/"));
        assert!(args.auto_save);
        assert!(!args.is_headless());
    }

    #[test]
    fn durations_and_overrides_parse() {
        let args = Cli::try_parse_from([
            "exam-proctor-cli",
            "--base-url",
            "http://proctor.local:8080/",
            "--poll-interval",
            "500ms",
            "--auto-save",
            "false",
            "--text",
        ])
        .unwrap();
        let cfg = build_config(&args);
        assert_eq!(cfg.base_url, "http://proctor.local:8080/");
        assert_eq!(cfg.poll_interval, Duration::from_millis(500));
        assert!(!args.auto_save);
        assert!(args.is_headless());
        assert_eq!(args.output_format(), OutputFormat::Text);
    }

    #[test]
    fn json_flag_selects_json_output() {
        let args = Cli::try_parse_from(["exam-proctor-cli", "--json", "--once"]).unwrap();
        assert_eq!(args.output_format(), OutputFormat::Json);
        assert!(args.is_headless());
    }
}
