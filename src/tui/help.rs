use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn keybind(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit (the exam keeps running on the server)"),
        ]),
        keybind("s", 11, "Start exam"),
        keybind("e", 11, "End exam"),
        keybind("a", 11, "Toggle auto-save of session summaries"),
        keybind("tab", 9, "Switch tabs"),
        keybind("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Alerts:"),
        keybind("Enter/Esc", 3, "Dismiss"),
        Line::from(""),
        Line::from("Termination:"),
        Line::from("  The server ends the exam when no face or several faces are seen,"),
        Line::from("  the exam window loses focus, or the noise level is too high."),
        Line::from("  The client cannot tell which check fired."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
