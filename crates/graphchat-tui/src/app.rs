//! Application state for the graphchat TUI.

use crate::markdown;
use graphchat_core::{
    BUSY_NOTICE, ChatEvent, ChatSession, Message, MessageId, ObservationView, RequestState, Role,
    Stage, to_stages,
};
use log::{debug, info};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use std::cmp::min;
use std::collections::HashSet;

const TEXT: Color = Color::Rgb(238, 238, 238);
const TEXT_MUTED: Color = Color::Rgb(128, 128, 128);
const STAGE_TITLE: Color = Color::Rgb(120, 190, 255);
const STAGE_BODY: Color = Color::Rgb(170, 170, 170);
const QUERY: Color = Color::Rgb(229, 192, 123);

const WELCOME: [&str; 3] = [
    " Ask a question about the knowledge graph to get started.",
    " Press Ctrl+S (or type /suggest) for example questions.",
    " Answers that used tools can be expanded with Ctrl+T.",
];

/// Top-level application state for the TUI.
pub struct App {
    /// Session whose log is rendered.
    pub session: ChatSession,
    /// Display name for the current user.
    pub user_name: String,
    /// Backend address shown in the header.
    pub backend: String,
    /// Transport name shown in the header.
    pub transport: String,
    /// Current input buffer.
    pub input: String,
    /// Status line text.
    pub status: String,
    /// Whether to show the slash command palette.
    pub show_slash_commands: bool,
    /// Whether to show the suggestions palette.
    pub show_suggestions: bool,
    /// Template questions offered in the suggestions palette.
    pub suggestions: Vec<String>,
    /// Index of the highlighted suggestion.
    pub selected_suggestion: usize,
    /// Current scroll offset.
    pub scroll: u16,
    /// Whether to auto-scroll to the bottom.
    pub auto_scroll: bool,
    /// Maximum scroll offset for the chat view.
    pub chat_max_scroll: u16,
    expanded: HashSet<MessageId>,
    tick: usize,
}

impl App {
    /// Create application state for a session.
    pub fn new(session: ChatSession, suggestions: Vec<String>) -> Self {
        Self {
            session,
            user_name: "user".to_string(),
            backend: String::new(),
            transport: String::new(),
            input: String::new(),
            status: "idle".to_string(),
            show_slash_commands: false,
            show_suggestions: false,
            suggestions,
            selected_suggestion: 0,
            scroll: 0,
            auto_scroll: true,
            chat_max_scroll: 0,
            expanded: HashSet::new(),
            tick: 0,
        }
    }

    /// Switch to a fresh session and reset view state.
    pub fn replace_session(&mut self, session: ChatSession) {
        info!("active session set (session_id={})", session.id());
        self.session = session;
        self.expanded.clear();
        self.scroll = 0;
        self.auto_scroll = true;
        self.chat_max_scroll = 0;
        self.status = "idle".to_string();
    }

    /// Set the status line.
    pub fn push_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Show the busy notice.
    pub fn push_busy_notice(&mut self) {
        self.status = BUSY_NOTICE.to_string();
    }

    /// Whether the session has a request in flight.
    pub fn is_thinking(&self) -> bool {
        self.session.is_busy()
    }

    /// Apply a session event to the view state.
    pub fn apply_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::MessageAppended { message } => {
                debug!(
                    "message appended (message_id={}, role={})",
                    message.id,
                    message.role.as_str()
                );
                if message.role == Role::User {
                    self.enable_auto_scroll();
                } else {
                    self.maybe_enable_auto_scroll();
                }
            }
            ChatEvent::StateChanged { state } => match state {
                RequestState::InFlight(_) => self.status = "thinking".to_string(),
                RequestState::Succeeded => self.status = "idle".to_string(),
                RequestState::Failed(kind) => self.status = format!("request failed ({kind})"),
                // Keeps a failure visible until the next question.
                RequestState::Idle => {
                    if self.status == "thinking" || self.status == BUSY_NOTICE {
                        self.status = "idle".to_string();
                    }
                }
            },
        }
    }

    /// Advance the thinking animation.
    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    /// Id of the most recent assistant message that carries a trace.
    pub fn latest_traced_id(&self) -> Option<MessageId> {
        self.session
            .messages()
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant && message.has_trace())
            .map(|message| message.id)
    }

    /// Expand or collapse the steps of the latest traced answer.
    ///
    /// Returns false when no answer in the log has a trace.
    pub fn toggle_latest_trace(&mut self) -> bool {
        let Some(id) = self.latest_traced_id() else {
            return false;
        };
        if !self.expanded.remove(&id) {
            self.expanded.insert(id);
        }
        debug!(
            "toggled trace (message_id={}, expanded={})",
            id,
            self.expanded.contains(&id)
        );
        true
    }

    /// Whether the steps of a message are shown.
    pub fn is_expanded(&self, id: MessageId) -> bool {
        self.expanded.contains(&id)
    }

    /// Open the suggestions palette.
    pub fn open_suggestions(&mut self) {
        self.show_slash_commands = false;
        self.show_suggestions = true;
        self.selected_suggestion = 0;
    }

    /// Close the suggestions palette.
    pub fn close_suggestions(&mut self) {
        self.show_suggestions = false;
    }

    pub fn select_previous_suggestion(&mut self) {
        self.selected_suggestion = self.selected_suggestion.saturating_sub(1);
    }

    pub fn select_next_suggestion(&mut self) {
        if self.selected_suggestion + 1 < self.suggestions.len() {
            self.selected_suggestion += 1;
        }
    }

    /// Highlighted suggestion text.
    pub fn selected_suggestion(&self) -> Option<&str> {
        self.suggestions
            .get(self.selected_suggestion)
            .map(String::as_str)
    }

    /// Scroll the chat view upward by a number of lines.
    pub fn scroll_up(&mut self, lines: u16) {
        self.auto_scroll = false;
        self.scroll = self.scroll.saturating_sub(lines);
    }

    /// Scroll the chat view downward by a number of lines.
    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = min(self.scroll.saturating_add(lines), self.chat_max_scroll);
        if self.scroll >= self.chat_max_scroll {
            self.auto_scroll = true;
        }
    }

    /// Scroll to the top of the chat view.
    pub fn scroll_to_top(&mut self) {
        self.auto_scroll = false;
        self.scroll = 0;
    }

    /// Enable auto-scrolling to the bottom.
    pub fn enable_auto_scroll(&mut self) {
        self.auto_scroll = true;
        self.scroll = self.chat_max_scroll;
    }

    /// Update scroll bounds after layout changes.
    ///
    /// Snaps to the new bottom only when auto-scroll is on or the view was
    /// already pinned to the bottom.
    pub fn update_scroll_bounds(&mut self, max_scroll: u16) {
        let was_at_bottom = self.scroll >= self.chat_max_scroll;
        self.chat_max_scroll = max_scroll;
        if self.auto_scroll || was_at_bottom {
            self.scroll = max_scroll;
            self.auto_scroll = true;
        } else {
            self.scroll = self.scroll.min(max_scroll);
        }
    }

    fn maybe_enable_auto_scroll(&mut self) {
        if self.auto_scroll {
            self.scroll = self.chat_max_scroll;
        }
    }

    /// Render the conversation log into styled lines for the UI.
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        let messages = self.session.messages();
        let thinking = self.is_thinking();
        let mut lines = Vec::new();

        if messages.is_empty() && !thinking {
            for text in WELCOME {
                lines.push(Line::from(Span::styled(text, Style::default().fg(TEXT_MUTED))));
            }
            return lines;
        }

        for (idx, message) in messages.iter().enumerate() {
            lines.push(badge(message.role));
            match message.role {
                Role::User => {
                    for line in message.content.lines() {
                        lines.push(Line::from(Span::styled(
                            format!(" {line}"),
                            Style::default().fg(TEXT),
                        )));
                    }
                }
                Role::Assistant => {
                    lines.extend(markdown::render(&message.content, Style::default().fg(TEXT)));
                    if message.has_trace() {
                        lines.extend(self.trace_lines(message));
                    }
                }
            }
            if idx + 1 < messages.len() {
                lines.push(Line::from(Span::raw("")));
            }
        }

        if thinking {
            lines.push(Line::from(Span::raw("")));
            lines.push(badge(Role::Assistant));
            let dots = ".".repeat(self.tick % 4);
            lines.push(Line::from(Span::styled(
                format!(" thinking{dots}"),
                Style::default()
                    .fg(TEXT_MUTED)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        // Trailing padding keeps the last message fully scrollable into view.
        lines.push(Line::from(Span::raw("")));
        lines
    }

    fn trace_lines(&self, message: &Message) -> Vec<Line<'static>> {
        let hint_style = Style::default().fg(TEXT_MUTED);
        if !self.is_expanded(message.id) {
            return vec![Line::from(Span::styled(
                format!(" ▸ show {} step(s) (Ctrl+T)", message.steps().len()),
                hint_style,
            ))];
        }
        let mut lines = vec![Line::from(Span::styled(" ▾ hide steps (Ctrl+T)", hint_style))];
        for stage in to_stages(message.steps(), &message.content) {
            lines.extend(stage_lines(&stage));
        }
        lines
    }
}

fn badge(role: Role) -> Line<'static> {
    let (label, bg) = match role {
        Role::User => (" you ", Color::Rgb(107, 161, 230)),
        Role::Assistant => (" assistant ", Color::Rgb(238, 121, 72)),
    };
    Line::from(Span::styled(
        label,
        Style::default()
            .fg(Color::Rgb(10, 10, 10))
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    ))
}

fn stage_lines(stage: &Stage) -> Vec<Line<'static>> {
    let body = Style::default().fg(STAGE_BODY);
    let label = Style::default().fg(TEXT_MUTED);
    let mut lines = vec![Line::from(Span::styled(
        format!("   {}", stage.title),
        Style::default()
            .fg(STAGE_TITLE)
            .add_modifier(Modifier::BOLD),
    ))];
    if !stage.tool_input.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("     input ", label),
            Span::styled(stage.tool_input.clone(), body),
        ]));
    }
    match &stage.observation {
        ObservationView::Text(text) => push_block(&mut lines, text, body),
        ObservationView::Json(json) => push_block(&mut lines, json, body),
        ObservationView::Queries { queries, result } => {
            for query in queries {
                if let Some(cypher) = &query.query {
                    lines.push(Line::from(Span::styled("     query", label)));
                    push_block(&mut lines, cypher, Style::default().fg(QUERY));
                }
                if let Some(context) = &query.context {
                    lines.push(Line::from(Span::styled("     context", label)));
                    push_block(&mut lines, context, body);
                }
            }
            lines.push(Line::from(Span::styled("     result", label)));
            push_block(&mut lines, result, body);
        }
    }
    lines
}

fn push_block(lines: &mut Vec<Line<'static>>, text: &str, style: Style) {
    for line in text.lines() {
        lines.push(Line::from(Span::styled(format!("     {line}"), style)));
    }
}
