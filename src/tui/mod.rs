mod help;
mod state;

use crate::backend::ExamClient;
use crate::cli::Cli;
use crate::model::{ClientConfig, ControllerEvent};
use crate::orchestrator::{self, UiCommand};
use crate::status_text;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{
    apply_event, apply_session_messages, handle_key, KeyAction, UiState, TAB_HELP, TAB_STATUS,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, cfg: ClientConfig) -> Result<()> {
    let client = ExamClient::new(&cfg)?;
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ControllerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(client, cfg.poll_interval, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub(crate) fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<ControllerEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        base_url: args.base_url.clone(),
        auto_save: args.auto_save,
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            if let ControllerEvent::SessionEnded { summary } = &ev {
                let processed = orchestrator::process_session_end(
                    args.export_json.as_deref(),
                    state.auto_save,
                    summary,
                );
                apply_session_messages(&mut state, &processed.messages);
            }
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut state, k.modifiers, k.code) {
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyAction::Send(cmd) => {
                        let _ = cmd_tx.send(cmd);
                    }
                    KeyAction::None => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Status"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("exam-proctor-cli"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_STATUS => draw_status(chunks[1], f, state),
        TAB_HELP => help::draw_help(chunks[1], f),
        _ => {}
    }

    if let Some(message) = state.alert.as_deref() {
        draw_alert(area, f, message);
    }
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    // Exam box: the four status fields as the server reported them.
    let exam_lines: Vec<Line> = match state.status.as_ref() {
        Some(status) => {
            let color = if status.exam_terminated {
                Color::Red
            } else {
                Color::Green
            };
            status_text::status_lines(status)
                .into_iter()
                .map(|l| Line::from(Span::styled(l, Style::default().fg(color))))
                .collect()
        }
        None => vec![Line::from(Span::styled(
            "No status yet",
            Style::default().fg(Color::Gray),
        ))],
    };
    let exam_title = if state.polling {
        Span::styled(
            "Exam (monitoring)",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::raw("Exam (idle)")
    };
    f.render_widget(
        Paragraph::new(exam_lines).block(Block::default().borders(Borders::ALL).title(exam_title)),
        rows[0],
    );

    // Session box: connection details and the last finished session.
    let mut session_lines = vec![
        kv_line("Server", &state.base_url),
        kv_line(
            "Last update",
            &state
                .last_update
                .map(|t| format!("{:.1}s ago", t.elapsed().as_secs_f64()))
                .unwrap_or_else(|| "-".into()),
        ),
        kv_line("Failed requests", &state.request_failures.to_string()),
        kv_line("Auto-save", if state.auto_save { "on" } else { "off" }),
    ];
    if let Some(summary) = state.last_summary.as_ref() {
        session_lines.push(Line::from(""));
        session_lines.push(Line::from(Span::styled(
            "Last session",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for l in status_text::summary_lines(summary) {
            session_lines.push(Line::from(format!("  {l}")));
        }
    }
    f.render_widget(
        Paragraph::new(session_lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Session")),
        rows[1],
    );

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(state.info.clone(), Style::default().fg(Color::Cyan)),
            Span::raw("   "),
            Span::styled(
                "s start  e end  a auto-save  q quit  ? help",
                Style::default().fg(Color::Gray),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL)),
        rows[2],
    );
}

fn kv_line(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}:"), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::raw(value.to_string()),
    ])
}

fn draw_alert(area: Rect, f: &mut ratatui::Frame, message: &str) {
    let popup = centered_rect(60, 30, area);
    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(vec![
            Line::from(message.to_string()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to dismiss",
                Style::default().fg(Color::Gray),
            )),
        ])
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Alert")
                .border_style(Style::default().fg(Color::Yellow)),
        ),
        popup,
    );
}

/// Rect of `percent_x` by `percent_y` of `area`, centered.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
