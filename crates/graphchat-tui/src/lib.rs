//! Library entry point for the graphchat TUI.
//!
//! Provides a reusable [`run`] function that launches the Ratatui terminal UI
//! against an already-constructed [`Transport`].

mod app;
mod event;
mod event_bus;
mod markdown;
mod ui;

pub use event_bus::EventBus;

use app::App;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CrosstermEvent, KeyCode, KeyEvent,
    KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use event::AppEvent;
use graphchat_config::{GraphChatConfig, TransportKind};
use graphchat_core::{
    ChatEvent, ChatSession, EventSink, GraphChatError, PendingRequest, Transport,
};
use log::{debug, info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

const ENV_USER: &str = "USER";
const ENV_USERNAME: &str = "USERNAME";

/// Supported slash commands in the TUI input box.
#[derive(Debug, PartialEq, Eq)]
enum SlashCommand {
    New,
    Suggest,
    Steps,
    Quit,
}

/// Configuration for the graphchat TUI.
#[derive(Debug, Clone, Default)]
pub struct TuiConfig {
    /// Display name for the current user.
    pub user_name: Option<String>,
    /// Backend address shown in the header.
    pub backend: String,
    /// Transport name shown in the header.
    pub transport: String,
    /// Template questions for the suggestions palette.
    pub suggestions: Vec<String>,
}

impl TuiConfig {
    /// Derive TUI settings from the loaded configuration.
    pub fn from_config(config: &GraphChatConfig) -> Self {
        let backend = match config.backend.transport {
            TransportKind::Http => config.backend.endpoint_url(),
            TransportKind::Websocket => config.backend.websocket_url(),
        };
        Self {
            user_name: config.ui.user_name.clone(),
            backend,
            transport: config.backend.transport.as_str().to_string(),
            suggestions: config.ui.suggestions.clone(),
        }
    }
}

/// Handles the TUI needs to start sessions and track the request task.
struct Runtime {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn EventSink>,
    request: Option<JoinHandle<()>>,
}

impl Runtime {
    fn new_session(&self) -> ChatSession {
        ChatSession::new(self.transport.clone(), Some(self.sink.clone()))
    }

    /// Accept a question, clear the input, and resolve it in the background.
    fn submit(&mut self, app: &mut App, text: String) {
        match app.session.begin(&text) {
            Ok(pending) => {
                info!(
                    "submitted question (session_id={}, message_id={}, question_len={})",
                    app.session.id(),
                    pending.id(),
                    text.len()
                );
                app.input.clear();
                app.show_slash_commands = false;
                app.enable_auto_scroll();
                self.request = Some(spawn_resolve(pending));
            }
            Err(GraphChatError::ReentrancyRejected) => app.push_busy_notice(),
            Err(GraphChatError::EmptyQuestion) => {}
            Err(err) => app.push_status(err.to_string()),
        }
    }

    /// Abort the in-flight request, if any.
    fn shutdown(&mut self) {
        if let Some(handle) = self.request.take()
            && !handle.is_finished()
        {
            debug!("aborting in-flight request");
            handle.abort();
        }
    }
}

/// Launch the graphchat TUI.
///
/// The caller is responsible for:
/// - Building and connecting the transport
/// - Initializing logging (e.g. `env_logger`) before calling `run`
///
/// # Errors
/// Returns an error if terminal setup or drawing fails.
pub async fn run(
    transport: Arc<dyn Transport>,
    events: EventBus,
    config: TuiConfig,
) -> anyhow::Result<()> {
    let mut runtime = Runtime {
        transport,
        sink: Arc::new(events.clone()),
        request: None,
    };
    let mut app = App::new(runtime.new_session(), config.suggestions);
    app.user_name = config.user_name.unwrap_or_else(resolve_user_name);
    app.backend = config.backend;
    app.transport = config.transport;

    let mut terminal = setup_terminal()?;
    let (tx, mut rx) = mpsc::channel(256);
    spawn_input_handler(tx.clone());
    spawn_tick(tx.clone());
    spawn_event_forwarder(events.subscribe(), tx);

    loop {
        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        let Some(event) = rx.recv().await else { break };
        if handle_app_event(event, &mut runtime, &mut app) {
            break;
        }
    }

    runtime.shutdown();
    restore_terminal(&mut terminal)?;
    Ok(())
}

/// Dispatch a UI event and return true when the app should exit.
fn handle_app_event(event: AppEvent, runtime: &mut Runtime, app: &mut App) -> bool {
    match event {
        AppEvent::Input(key) => return handle_input(key, runtime, app),
        AppEvent::Session(event) => app.apply_event(event),
        AppEvent::Scroll(delta) => {
            if delta < 0 {
                app.scroll_up(delta.unsigned_abs());
            } else if delta > 0 {
                app.scroll_down(delta as u16);
            }
        }
        AppEvent::Tick => app.on_tick(),
    }
    false
}

/// Handle keyboard input and dispatch actions.
fn handle_input(key: KeyEvent, runtime: &mut Runtime, app: &mut App) -> bool {
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    if control && key.code == KeyCode::Char('c') {
        return true;
    }
    if key.code == KeyCode::Esc {
        if app.show_suggestions {
            app.close_suggestions();
            return false;
        }
        if app.show_slash_commands {
            app.show_slash_commands = false;
            app.input.clear();
            return false;
        }
        return true;
    }

    if app.show_suggestions {
        match key.code {
            KeyCode::Up => app.select_previous_suggestion(),
            KeyCode::Down => app.select_next_suggestion(),
            KeyCode::Enter => {
                if let Some(question) = app.selected_suggestion().map(str::to_string) {
                    app.close_suggestions();
                    runtime.submit(app, question);
                }
            }
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char('s') if control => app.open_suggestions(),
        KeyCode::Char('t') if control => toggle_steps(app),
        KeyCode::PageUp => app.scroll_up(5),
        KeyCode::PageDown => app.scroll_down(5),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Home => app.scroll_to_top(),
        KeyCode::End => app.enable_auto_scroll(),
        KeyCode::Enter => {
            if app.input.trim().is_empty() {
                app.show_slash_commands = false;
                return false;
            }
            if app.input.trim_start().starts_with('/') {
                let command = std::mem::take(&mut app.input);
                app.show_slash_commands = false;
                match handle_slash_command(runtime, app, &command) {
                    Ok(quit) => return quit,
                    Err(err) => app.push_status(err),
                }
            } else {
                let question = app.input.clone();
                runtime.submit(app, question);
            }
        }
        KeyCode::Backspace => {
            app.input.pop();
            app.show_slash_commands = app.input.trim_start().starts_with('/');
        }
        KeyCode::Char(ch) if !control => {
            app.input.push(ch);
            app.show_slash_commands = app.input.trim_start().starts_with('/');
        }
        _ => {}
    }
    false
}

fn toggle_steps(app: &mut App) {
    if !app.toggle_latest_trace() {
        app.push_status("no steps to show");
    }
}

/// Handle a slash command; returns true when the app should exit.
fn handle_slash_command(
    runtime: &mut Runtime,
    app: &mut App,
    input: &str,
) -> Result<bool, String> {
    let Some(command) = parse_slash_command(input)? else {
        return Ok(false);
    };
    debug!("handling slash command (command={:?})", command);
    match command {
        SlashCommand::New => {
            if app.session.is_busy() {
                app.push_busy_notice();
            } else {
                app.replace_session(runtime.new_session());
                app.push_status("new conversation");
            }
        }
        SlashCommand::Suggest => app.open_suggestions(),
        SlashCommand::Steps => toggle_steps(app),
        SlashCommand::Quit => return Ok(true),
    }
    Ok(false)
}

/// Parse a slash command from the input line.
fn parse_slash_command(input: &str) -> Result<Option<SlashCommand>, String> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Ok(None);
    }
    let Some(command) = trimmed.trim_start_matches('/').split_whitespace().next() else {
        return Ok(None);
    };
    match command.to_lowercase().as_str() {
        "new" | "clear" => Ok(Some(SlashCommand::New)),
        "suggest" | "suggestions" => Ok(Some(SlashCommand::Suggest)),
        "steps" => Ok(Some(SlashCommand::Steps)),
        "quit" | "exit" => Ok(Some(SlashCommand::Quit)),
        _ => Err(format!("unknown command: {command}")),
    }
}

/// Spawn a task that resolves an accepted question.
fn spawn_resolve(pending: PendingRequest) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = pending.resolve().await;
        debug!("request settled (message_id={})", outcome.id());
    })
}

/// Spawn a task forwarding session events into the UI loop.
fn spawn_event_forwarder(
    mut receiver: broadcast::Receiver<ChatEvent>,
    sender: mpsc::Sender<AppEvent>,
) {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if sender.send(AppEvent::Session(event)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("session events lagged (skipped={})", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("session event forwarder stopped");
    });
}

/// Spawn a task to poll for input events.
fn spawn_input_handler(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        const MOUSE_SCROLL_LINES: i16 = 3;
        loop {
            if let Ok(true) = crossterm::event::poll(Duration::from_millis(30)) {
                while let Ok(true) = crossterm::event::poll(Duration::from_millis(0)) {
                    let event = match crossterm::event::read() {
                        Ok(event) => event,
                        Err(_) => break,
                    };
                    let message = match event {
                        CrosstermEvent::Key(key) => AppEvent::Input(key),
                        CrosstermEvent::Mouse(mouse) => match mouse.kind {
                            MouseEventKind::ScrollUp => AppEvent::Scroll(-MOUSE_SCROLL_LINES),
                            MouseEventKind::ScrollDown => AppEvent::Scroll(MOUSE_SCROLL_LINES),
                            _ => continue,
                        },
                        _ => continue,
                    };
                    if sender.send(message).await.is_err() {
                        return;
                    }
                }
            }
        }
    });
}

/// Spawn a periodic tick event generator.
fn spawn_tick(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            if sender.send(AppEvent::Tick).await.is_err() {
                break;
            }
        }
    });
}

fn resolve_user_name() -> String {
    std::env::var(ENV_USER)
        .or_else(|_| std::env::var(ENV_USERNAME))
        .unwrap_or_else(|_| "user".to_string())
}

/// Configure terminal in raw mode with alternate screen.
fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    debug!("setting up terminal");
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal state on exit.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    debug!("restoring terminal");
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphchat_core::{BUSY_NOTICE, Role};
    use graphchat_protocol::AnswerResponse;
    use graphchat_test_utils::{GatedTransport, ScriptedTransport};
    use pretty_assertions::assert_eq;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_text(runtime: &mut Runtime, app: &mut App, text: &str) {
        for ch in text.chars() {
            handle_input(key(KeyCode::Char(ch)), runtime, app);
        }
    }

    fn setup(transport: Arc<dyn Transport>, suggestions: Vec<String>) -> (Runtime, App) {
        let runtime = Runtime {
            transport,
            sink: Arc::new(EventBus::new(64)),
            request: None,
        };
        let app = App::new(runtime.new_session(), suggestions);
        (runtime, app)
    }

    #[test]
    fn parses_known_slash_commands() {
        assert_eq!(parse_slash_command("/new"), Ok(Some(SlashCommand::New)));
        assert_eq!(parse_slash_command(" /Suggest "), Ok(Some(SlashCommand::Suggest)));
        assert_eq!(parse_slash_command("/steps"), Ok(Some(SlashCommand::Steps)));
        assert_eq!(parse_slash_command("/quit"), Ok(Some(SlashCommand::Quit)));
        assert_eq!(parse_slash_command("hello"), Ok(None));
        assert_eq!(parse_slash_command("/"), Ok(None));
        assert_eq!(
            parse_slash_command("/join 1234"),
            Err("unknown command: join".to_string())
        );
    }

    #[tokio::test]
    async fn input_clears_on_accept_and_busy_submit_keeps_text() {
        let transport = GatedTransport::new(AnswerResponse::with_answer("Kevin Durant"));
        let (mut runtime, mut app) = setup(transport.clone(), Vec::new());

        type_text(&mut runtime, &mut app, "Who plays for the Nets?");
        handle_input(key(KeyCode::Enter), &mut runtime, &mut app);
        assert_eq!(app.input, "");
        assert_eq!(app.session.messages().len(), 1);
        transport.wait_started().await;

        type_text(&mut runtime, &mut app, "again");
        handle_input(key(KeyCode::Enter), &mut runtime, &mut app);
        assert_eq!(app.input, "again");
        assert_eq!(app.status, BUSY_NOTICE);
        assert_eq!(app.session.messages().len(), 1);

        transport.release();
        runtime.request.take().expect("request task").await.expect("join");
        let roles: Vec<Role> = app.session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn suggestion_enter_submits_selected_question() {
        let transport = Arc::new(ScriptedTransport::answering(AnswerResponse::with_answer("39")));
        let suggestions = vec![
            "How old is LeBron James?".to_string(),
            "List all players on the Brooklyn Nets.".to_string(),
        ];
        let (mut runtime, mut app) = setup(transport.clone(), suggestions);

        handle_input(ctrl('s'), &mut runtime, &mut app);
        assert!(app.show_suggestions);
        handle_input(key(KeyCode::Down), &mut runtime, &mut app);
        handle_input(key(KeyCode::Enter), &mut runtime, &mut app);
        assert!(!app.show_suggestions);

        runtime.request.take().expect("request task").await.expect("join");
        assert_eq!(
            transport.questions(),
            vec!["List all players on the Brooklyn Nets.".to_string()]
        );
    }

    #[tokio::test]
    async fn new_command_starts_a_fresh_session() {
        let transport = Arc::new(ScriptedTransport::answering(AnswerResponse::with_answer("39")));
        let (mut runtime, mut app) = setup(transport, Vec::new());
        type_text(&mut runtime, &mut app, "How old is LeBron James?");
        handle_input(key(KeyCode::Enter), &mut runtime, &mut app);
        runtime.request.take().expect("request task").await.expect("join");
        let previous = app.session.id();

        type_text(&mut runtime, &mut app, "/new");
        assert!(app.show_slash_commands);
        assert!(!handle_input(key(KeyCode::Enter), &mut runtime, &mut app));
        assert_ne!(app.session.id(), previous);
        assert!(app.session.messages().is_empty());
        assert_eq!(app.status, "new conversation");
    }

    #[test]
    fn escape_closes_palettes_before_quitting() {
        let (mut runtime, mut app) = setup(Arc::new(ScriptedTransport::default()), Vec::new());
        handle_input(ctrl('s'), &mut runtime, &mut app);
        assert!(!handle_input(key(KeyCode::Esc), &mut runtime, &mut app));
        assert!(!app.show_suggestions);
        assert!(handle_input(key(KeyCode::Esc), &mut runtime, &mut app));
        assert!(handle_input(ctrl('c'), &mut runtime, &mut app));
    }

    #[test]
    fn steps_toggle_without_trace_reports_status() {
        let (mut runtime, mut app) = setup(Arc::new(ScriptedTransport::default()), Vec::new());
        handle_input(ctrl('t'), &mut runtime, &mut app);
        assert_eq!(app.status, "no steps to show");
    }

    #[test]
    fn tui_config_uses_transport_specific_address() {
        let mut config = GraphChatConfig::default();
        let http = TuiConfig::from_config(&config);
        assert_eq!(http.backend, "http://localhost:5000/api/generate-query");
        assert_eq!(http.transport, "http");
        assert_eq!(http.suggestions.len(), 6);

        config.backend.transport = TransportKind::Websocket;
        let ws = TuiConfig::from_config(&config);
        assert_eq!(ws.backend, "ws://localhost:5000/ws");
    }
}
