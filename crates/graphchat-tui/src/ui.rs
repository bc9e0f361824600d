//! Rendering routines for the graphchat TUI.

use crate::app::App;
use graphchat_core::BUSY_NOTICE;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
};

const PRIMARY: Color = Color::Rgb(236, 91, 43);
const SECONDARY: Color = Color::Rgb(238, 121, 72);
const TEXT: Color = Color::Rgb(238, 238, 238);
const TEXT_MUTED: Color = Color::Rgb(128, 128, 128);
const BORDER: Color = Color::Rgb(60, 60, 60);
const BORDER_ACTIVE: Color = Color::Rgb(238, 121, 72);
const YELLOW: Color = Color::Rgb(229, 192, 123);
const PALETTE_BG: Color = Color::Rgb(20, 20, 20);

const HEADER_HEIGHT: u16 = 6; // 4 inner lines + 2 border lines
const SLASH_PALETTE_HEIGHT: u16 = 9;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Draw the entire TUI frame.
pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT), // header bar
            Constraint::Min(0),                // chat
            Constraint::Length(3),             // input
            Constraint::Length(1),             // status bar
        ])
        .split(frame.area());

    draw_header(frame, app, root[0]);
    draw_chat(frame, app, root[1]);
    if app.show_suggestions {
        draw_suggestions(frame, app, root[1]);
    } else if app.show_slash_commands {
        draw_slash_palette(frame, root[1]);
    }
    draw_input(frame, app, root[2]);
    draw_status_bar(frame, app, root[3]);
}

fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let label_style = Style::default().fg(TEXT_MUTED);
    let value_style = Style::default().fg(TEXT);
    let lines = vec![
        Line::from(vec![
            Span::styled(
                "  graphchat",
                Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  v{VERSION}"), label_style),
        ]),
        Line::from(Span::styled(
            format!("  Welcome, {}!", app.user_name),
            value_style,
        )),
        Line::from(vec![
            Span::styled("  backend ", label_style),
            Span::styled(app.backend.as_str(), value_style),
            Span::styled("  transport ", label_style),
            Span::styled(app.transport.as_str(), value_style),
        ]),
    ];

    let pad_top = inner.height.saturating_sub(lines.len() as u16) / 2;
    let centered = Rect {
        y: inner.y + pad_top,
        height: inner.height.saturating_sub(pad_top),
        ..inner
    };
    frame.render_widget(Paragraph::new(lines), centered);
}

/// Draw the chat transcript with border and scrollbar.
fn draw_chat(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let lines = app.render_lines();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Chat ", Style::default().fg(TEXT_MUTED)));

    let inner = block.inner(area);
    let content_width = inner.width.saturating_sub(1); // -1 for scrollbar
    let content_height = inner.height as usize;

    let total_lines = Paragraph::new(lines.clone())
        .wrap(Wrap { trim: false })
        .line_count(content_width)
        .max(1);

    let max_scroll = total_lines.saturating_sub(content_height) as u16;
    app.update_scroll_bounds(max_scroll);
    let scroll = app.scroll;

    let chat_inner = Rect {
        width: content_width,
        ..inner
    };
    let chat = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(block, area);
    frame.render_widget(chat, chat_inner);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::default()
            .content_length(total_lines)
            .position(scroll as usize)
            .viewport_content_length(content_height);
        let scrollbar_area = Rect {
            x: inner.x + inner.width.saturating_sub(1),
            width: 1,
            ..inner
        };
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .style(Style::default().fg(BORDER))
                .thumb_style(Style::default().fg(TEXT_MUTED)),
            scrollbar_area,
            &mut scrollbar_state,
        );
    }
}

fn draw_input(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let thinking = app.is_thinking();
    let (border_color, title) = if thinking {
        (BORDER, " Waiting for answer ")
    } else {
        (BORDER_ACTIVE, " Ask a question ")
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(title, Style::default().fg(SECONDARY)));
    let inner = block.inner(area);

    let prompt_style = Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD);
    let input_text = if app.input.is_empty() {
        Line::from(vec![
            Span::styled(" ", prompt_style),
            Span::styled(
                "Type a question, or / for commands...",
                Style::default().fg(TEXT_MUTED),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled(" ", prompt_style),
            Span::styled(app.input.as_str(), Style::default().fg(TEXT)),
        ])
    };

    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(input_text), inner);
    let cursor = inner.x + 1 + app.input.chars().count() as u16;
    frame.set_cursor_position((cursor.min(inner.x + inner.width), inner.y));
}

/// Draw the status bar at the bottom.
fn draw_status_bar(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let status_color = match app.status.as_str() {
        "thinking" | BUSY_NOTICE => PRIMARY,
        "idle" => TEXT_MUTED,
        _ => YELLOW,
    };

    let shortcuts = vec![
        Span::styled(" Ctrl+C", Style::default().fg(TEXT_MUTED)),
        Span::styled(" quit", Style::default().fg(BORDER)),
        Span::styled("  Ctrl+S", Style::default().fg(TEXT_MUTED)),
        Span::styled(" suggestions", Style::default().fg(BORDER)),
        Span::styled("  Ctrl+T", Style::default().fg(TEXT_MUTED)),
        Span::styled(" steps", Style::default().fg(BORDER)),
        Span::styled("  /", Style::default().fg(TEXT_MUTED)),
        Span::styled(" commands", Style::default().fg(BORDER)),
        Span::styled("  PgUp/PgDn", Style::default().fg(TEXT_MUTED)),
        Span::styled(" scroll", Style::default().fg(BORDER)),
    ];

    let right_text = format!(" {} ", app.status);
    let right_len = right_text.chars().count() as u16;
    let left_area = Rect {
        width: area.width.saturating_sub(right_len),
        ..area
    };
    let right_area = Rect {
        x: area.x + area.width.saturating_sub(right_len),
        width: right_len.min(area.width),
        ..area
    };

    frame.render_widget(Paragraph::new(Line::from(shortcuts)), left_area);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            right_text,
            Style::default().fg(status_color),
        ))),
        right_area,
    );
}

fn draw_slash_palette(frame: &mut Frame<'_>, area: Rect) {
    let cmd_style = Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(TEXT_MUTED);
    let hint_style = Style::default()
        .fg(TEXT_MUTED)
        .add_modifier(Modifier::ITALIC);

    let lines = vec![
        Line::from(vec![]),
        Line::from(vec![
            Span::styled("  /new", cmd_style),
            Span::styled("        Start a new conversation", desc_style),
        ]),
        Line::from(vec![
            Span::styled("  /suggest", cmd_style),
            Span::styled("    Show example questions", desc_style),
        ]),
        Line::from(vec![
            Span::styled("  /steps", cmd_style),
            Span::styled("      Toggle steps of the last answer", desc_style),
        ]),
        Line::from(vec![
            Span::styled("  /quit", cmd_style),
            Span::styled("       Exit graphchat", desc_style),
        ]),
        Line::from(vec![]),
        Line::from(Span::styled("  Esc to close", hint_style)),
    ];
    let height = SLASH_PALETTE_HEIGHT
        .min(area.height)
        .min(lines.len() as u16 + 2); // +2 for border
    render_palette(frame, area, " Commands ", lines, height, 50);
}

fn draw_suggestions(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let mut lines = vec![Line::from(vec![])];
    for (idx, suggestion) in app.suggestions.iter().enumerate() {
        let selected = idx == app.selected_suggestion;
        let style = if selected {
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT)
        };
        let marker = if selected { ">" } else { " " };
        lines.push(Line::from(vec![
            Span::styled(format!(" {marker} "), style),
            Span::styled(suggestion.clone(), style),
        ]));
    }
    lines.push(Line::from(vec![]));
    lines.push(Line::from(Span::styled(
        "  Up/Down to choose  Enter to ask  Esc to close",
        Style::default()
            .fg(TEXT_MUTED)
            .add_modifier(Modifier::ITALIC),
    )));
    let height = (lines.len() as u16 + 2).min(area.height);
    render_palette(frame, area, " Suggestions ", lines, height, 76);
}

fn render_palette(
    frame: &mut Frame<'_>,
    area: Rect,
    title: &'static str,
    lines: Vec<Line<'_>>,
    height: u16,
    max_width: u16,
) {
    let palette_area = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(height),
        width: area.width.saturating_sub(2).min(max_width),
        height,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(PRIMARY))
        .title(Span::styled(
            title,
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(PALETTE_BG));
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(block),
        palette_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphchat_core::ChatSession;
    use graphchat_test_utils::ScriptedTransport;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app() -> App {
        let session = ChatSession::new(Arc::new(ScriptedTransport::default()), None);
        let mut app = App::new(
            session,
            vec!["How old is LeBron James?".to_string()],
        );
        app.user_name = "ada".to_string();
        app.backend = "http://localhost:5000".to_string();
        app.transport = "http".to_string();
        app
    }

    #[test]
    fn draws_header_welcome_and_status() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).expect("terminal");
        terminal.draw(|frame| draw(frame, &mut app)).expect("draw");
        let text = buffer_text(&terminal);
        assert!(text.contains("graphchat"));
        assert!(text.contains("Welcome, ada!"));
        assert!(text.contains("http://localhost:5000"));
        assert!(text.contains("Ask a question about the knowledge graph"));
        assert!(text.contains("idle"));
    }

    #[test]
    fn draws_suggestions_palette() {
        let mut app = app();
        app.open_suggestions();
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).expect("terminal");
        terminal.draw(|frame| draw(frame, &mut app)).expect("draw");
        let text = buffer_text(&terminal);
        assert!(text.contains("Suggestions"));
        assert!(text.contains("> How old is LeBron James?"));
    }
}
