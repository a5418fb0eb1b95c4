//! UI rendering for the debugger.

use super::app::DebuggerApp;
use crate::EngineState;
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(frame.area());

    // Left side: code, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory, output and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(8),
            Constraint::Length(5),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_output(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw disassembly around the PC.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:05}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else if instr.starts_with("DATA") {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(list, area);
}

/// Draw registers and engine state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let engine = &app.engine;
    let queued = engine.input().peek_all();

    let content = vec![
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:>8}", engine.pc()), Style::default().fg(Color::Yellow)),
            Span::raw("   RB: "),
            Span::styled(format!("{:>8}", engine.relative_base()), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", engine.cycles()), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            Span::styled(format!("{:?}", engine.state()), state_style(engine.state())),
        ]),
        Line::from(vec![
            Span::raw("Input queue: "),
            Span::styled(format!("{:?}", queued), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("Last: "),
            Span::styled(
                engine
                    .last_instruction()
                    .map(|i| i.opcode.mnemonic().to_string())
                    .unwrap_or_else(|| "-".into()),
                Style::default().fg(Color::Gray),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(paragraph, area);
}

/// Draw memory view.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll;
    let pc = app.engine.pc();

    let items: Vec<ListItem> = app
        .engine
        .memory()
        .dump(start, visible_rows)
        .into_iter()
        .map(|(addr, value)| {
            let text = format!("{:05}: {}", addr, value);

            let style = if addr == pc {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if value != 0 {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    frame.render_widget(list, area);
}

/// Draw the output log, as text when it is all ASCII.
fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let text = app.output_text().unwrap_or_else(|| {
        app.outputs
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    });

    let output = Paragraph::new(text).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(format!(" Output ({}) ", app.outputs.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );

    frame.render_widget(output, area);
}

/// Draw status bar, or the input prompt when it is open.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let (title, text) = match &app.input_buffer {
        Some(buffer) => (" Input ", format!("> {}_", buffer)),
        None => (" Status ", app.status.clone()),
    };

    let status = Paragraph::new(text)
        .style(Style::default().fg(Color::White))
        .block(Block::default().title(title).borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
        Line::from("i: Input  x: Reset  q: Quit"),
        Line::from("↑↓ PgUp PgDn: Scroll memory"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().title(" Help ").borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Get color style for an engine state.
fn state_style(state: &EngineState) -> Style {
    match state {
        EngineState::Ready | EngineState::Running => Style::default().fg(Color::Green),
        EngineState::AwaitingInput => Style::default().fg(Color::Yellow),
        EngineState::Halted => Style::default().fg(Color::Gray),
        EngineState::Failed(_) => Style::default().fg(Color::Red),
    }
}
