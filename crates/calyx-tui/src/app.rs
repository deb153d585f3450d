use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use calyx_core::api::ClientError;
use calyx_core::chat::execute;
use calyx_core::yaml_block::raw_view;
use calyx_core::{
    BackendSupervisor, CalyxClient, ChatMessage, ChatSession, Config, CurrentModel, Locale,
    MessageBody, StartupProgress, StartupWatcher, StatusSnapshot, StatusWatcher, Typewriter,
    TypingEvent,
};
use ratatui::widgets::ListState;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::theme::Palette;

/// Loading dots advance every this many ticks
const DOTS_EVERY_TICKS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Chat,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub config: Config,
    config_path: Option<PathBuf>,
    pub palette: Palette,
    pub locale: Locale,
    pub client: CalyxClient,

    // Conversation
    pub session: ChatSession,
    pub chat_task: Option<JoinHandle<Vec<ChatMessage>>>,
    /// One typewriter per console message, keyed by message index
    pub typewriters: HashMap<usize, Typewriter>,
    pub expanded_thinking: HashSet<usize>,
    /// YAML messages shown as raw text instead of a table
    pub raw_yaml: HashSet<usize>,
    pub selected_message: Option<usize>,

    // Input state
    pub input: String,
    pub cursor: usize,

    // Transcript viewport, filled in by the renderer
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub follow_bottom: bool,

    // Animation
    pub animation_frame: u8,
    tick_count: u32,

    // Backend state
    status_watcher: Option<StatusWatcher>,
    status_rx: Option<watch::Receiver<StatusSnapshot>>,
    pub status: StatusSnapshot,
    startup_watcher: Option<StartupWatcher>,
    startup_rx: Option<watch::Receiver<Option<StartupProgress>>>,
    pub startup: Option<StartupProgress>,
    pub backend_version: Option<String>,
    version_task: Option<JoinHandle<Result<String, ClientError>>>,
    pub supervisor: Option<BackendSupervisor>,
    pub backend_error: Option<String>,

    // Model management
    pub current_model: Option<CurrentModel>,
    model_task: Option<JoinHandle<Result<CurrentModel, ClientError>>>,
    pub switch_task: Option<JoinHandle<(String, Result<(), ClientError>)>>,
    pub show_model_picker: bool,
    pub model_picker_state: ListState,
}

impl App {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        let client = CalyxClient::new(&config.api_url);
        let palette = Palette::for_theme(config.theme);
        let locale = config.locale;

        Self {
            should_quit: false,
            screen: Screen::Chat,
            input_mode: InputMode::Editing,
            config,
            config_path,
            palette,
            locale,
            client,

            session: ChatSession::new(),
            chat_task: None,
            typewriters: HashMap::new(),
            expanded_thinking: HashSet::new(),
            raw_yaml: HashSet::new(),
            selected_message: None,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            follow_bottom: true,

            animation_frame: 0,
            tick_count: 0,

            status_watcher: None,
            status_rx: None,
            status: StatusSnapshot::checking(),
            startup_watcher: None,
            startup_rx: None,
            startup: None,
            backend_version: None,
            version_task: None,
            supervisor: None,
            backend_error: None,

            current_model: None,
            model_task: None,
            switch_task: None,
            show_model_picker: false,
            model_picker_state: ListState::default(),
        }
    }

    /// Start the backend (when configured) and the background pollers.
    pub fn start(&mut self) {
        if self.config.autostart_backend {
            if let Some(launch) = self.config.backend.clone() {
                match BackendSupervisor::spawn(&launch) {
                    Ok(supervisor) => self.supervisor = Some(supervisor),
                    Err(err) => {
                        warn!("{:#}", err);
                        self.backend_error =
                            Some(self.locale.backend_spawn_failed(&format!("{:#}", err)));
                    }
                }
            }
        }

        let status_watcher = StatusWatcher::spawn(self.client.clone(), self.locale);
        self.status_rx = Some(status_watcher.subscribe());
        self.status_watcher = Some(status_watcher);

        let startup_watcher = StartupWatcher::spawn(self.client.clone(), self.locale);
        self.startup_rx = Some(startup_watcher.subscribe());
        self.startup_watcher = Some(startup_watcher);

        self.load_current_model();

        let client = self.client.clone();
        self.version_task = Some(tokio::spawn(async move { client.version().await }));
    }

    pub fn load_current_model(&mut self) {
        let client = self.client.clone();
        self.model_task = Some(tokio::spawn(async move { client.current_model().await }));
    }

    /// Re-poll status, current model and version right away.
    pub fn refresh_status(&mut self) {
        if let Some(watcher) = &self.status_watcher {
            watcher.refresh();
        }
        self.load_current_model();
        let client = self.client.clone();
        self.version_task = Some(tokio::spawn(async move { client.version().await }));
    }

    pub fn is_switching_model(&self) -> bool {
        self.switch_task.is_some()
    }

    pub fn active_animations(&self) -> usize {
        self.typewriters.values().filter(|tw| tw.is_typing()).count()
    }

    /// Input is closed while a request, a model switch or a console animation is running.
    pub fn input_enabled(&self) -> bool {
        !self.session.is_processing() && !self.is_switching_model() && self.active_animations() == 0
    }

    pub fn placeholder(&self) -> &'static str {
        if self.is_switching_model() {
            self.locale.placeholder_switching()
        } else if self.session.is_processing() {
            self.locale.placeholder_processing()
        } else if self.active_animations() > 0 {
            self.locale.placeholder_typing()
        } else {
            self.locale.placeholder_idle()
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.session.messages()
    }

    /// Send the input box contents.
    pub fn submit_input(&mut self) {
        if !self.input_enabled() {
            return;
        }
        let Some(request) = self.session.begin(&self.input) else {
            return;
        };

        self.input.clear();
        self.cursor = 0;
        self.input_mode = InputMode::Normal;
        self.follow_bottom = true;
        self.selected_message = None;

        let client = self.client.clone();
        let timeout = self.config.request_timeout();
        let locale = self.locale;
        self.chat_task = Some(tokio::spawn(async move {
            execute(&client, request, timeout, locale).await
        }));
    }

    /// Append a finished turn and start any console animations it carries.
    pub fn complete_turn(&mut self, replies: Vec<ChatMessage>) {
        let first_new = self.session.messages().len();
        self.session.complete(replies);
        self.start_animations(first_new);
        self.follow_bottom = true;
        if self.active_animations() == 0 {
            self.input_mode = InputMode::Editing;
        }
    }

    fn push_notice(&mut self, text: impl Into<String>) {
        self.session.push(ChatMessage::assistant(text));
        self.follow_bottom = true;
    }

    fn start_animations(&mut self, from: usize) {
        for (index, message) in self.session.messages().iter().enumerate().skip(from) {
            if let MessageBody::Console(block) = &message.body {
                let typewriter = self
                    .typewriters
                    .entry(index)
                    .or_insert_with(|| Typewriter::new(block.content()));
                if typewriter.start() == Some(TypingEvent::Started) {
                    self.input_mode = InputMode::Normal;
                }
            }
        }
    }

    /// Collect finished background work. Called once per loop iteration.
    pub async fn poll_tasks(&mut self) {
        if self.chat_task.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(task) = self.chat_task.take() {
                match task.await {
                    Ok(replies) => self.complete_turn(replies),
                    Err(err) => {
                        warn!("chat task failed: {}", err);
                        self.complete_turn(vec![ChatMessage::assistant(
                            self.locale.unexpected_error(),
                        )]);
                    }
                }
            }
        }

        if self.switch_task.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(task) = self.switch_task.take() {
                match task.await {
                    Ok((key, Ok(()))) => {
                        info!(model = %key, "model switched");
                        let label = self.model_label(&key);
                        if let Some(current) = self.current_model.as_mut() {
                            current.key = key.clone();
                        }
                        self.config.default_model = Some(key);
                        self.save_config();
                        self.push_notice(self.locale.model_switched(&label));
                        if let Some(watcher) = &self.status_watcher {
                            watcher.refresh();
                        }
                    }
                    Ok((_, Err(ClientError::Backend(error)))) => {
                        self.push_notice(self.locale.model_switch_error(&error));
                    }
                    Ok((_, Err(err))) => {
                        warn!("model switch failed: {}", err);
                        self.push_notice(self.locale.model_switch_connection_error());
                    }
                    Err(err) => warn!("model switch task failed: {}", err),
                }
                if self.input_enabled() {
                    self.input_mode = InputMode::Editing;
                }
            }
        }

        if self.model_task.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(task) = self.model_task.take() {
                match task.await {
                    Ok(Ok(current)) => {
                        info!(model = %current.key, "current model loaded");
                        self.current_model = Some(current);
                    }
                    Ok(Err(err)) => warn!("could not load current model: {}", err),
                    Err(err) => warn!("model task failed: {}", err),
                }
            }
        }

        if self.version_task.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(task) = self.version_task.take() {
                if let Ok(Ok(version)) = task.await {
                    self.backend_version = Some(version);
                }
            }
        }
    }

    /// Copy the latest watcher snapshots and check on the backend process.
    pub fn refresh_backend_state(&mut self) {
        if let Some(snapshot) = self.status_rx.as_ref().map(|rx| rx.borrow().clone()) {
            let became_ready = snapshot.is_ready() && !self.status.is_ready();
            if snapshot.state != self.status.state {
                debug!(state = ?snapshot.state, "status snapshot changed");
            }
            self.status = snapshot;
            if became_ready && self.current_model.is_none() && self.model_task.is_none() {
                self.load_current_model();
            }
        }
        if let Some(rx) = &self.startup_rx {
            self.startup = rx.borrow().clone();
        }

        if let Some(supervisor) = self.supervisor.as_mut() {
            if let Some(status) = supervisor.exit_status() {
                self.backend_error = Some(self.locale.backend_exited(&status.to_string()));
                self.supervisor = None;
            }
        }
    }

    /// Advance animations by one tick of `dt`.
    pub fn tick(&mut self, dt: Duration) {
        self.tick_count = self.tick_count.wrapping_add(1);
        if self.tick_count % DOTS_EVERY_TICKS == 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }

        let mut finished = false;
        for typewriter in self.typewriters.values_mut() {
            if typewriter.tick(dt) == Some(TypingEvent::Finished) {
                finished = true;
            }
        }
        if finished && self.input_enabled() {
            // Refocus the input once the last animation is done
            self.input_mode = InputMode::Editing;
        }
    }

    /// Start a new conversation, dropping any request in flight.
    pub fn new_chat(&mut self) {
        if let Some(task) = self.chat_task.take() {
            task.abort();
        }
        self.session.clear();
        self.typewriters.clear();
        self.expanded_thinking.clear();
        self.raw_yaml.clear();
        self.selected_message = None;
        self.chat_scroll = 0;
        self.follow_bottom = true;
        self.input_mode = InputMode::Editing;
    }

    pub fn select_next(&mut self) {
        let len = self.messages().len();
        if len == 0 {
            return;
        }
        self.selected_message = Some(match self.selected_message {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        });
        self.follow_bottom = false;
    }

    pub fn select_prev(&mut self) {
        let len = self.messages().len();
        if len == 0 {
            return;
        }
        self.selected_message = Some(match self.selected_message {
            Some(i) => i.saturating_sub(1),
            None => len - 1,
        });
        self.follow_bottom = false;
    }

    /// Thinking panels start collapsed and only open on request.
    pub fn toggle_thinking(&mut self) {
        let Some(index) = self.selected_message else {
            return;
        };
        let has_thinking = self
            .messages()
            .get(index)
            .is_some_and(|message| message.thinking.is_some());
        if has_thinking && !self.expanded_thinking.remove(&index) {
            self.expanded_thinking.insert(index);
        }
    }

    /// Switch the selected YAML message between its table and the raw text.
    pub fn toggle_raw_view(&mut self) {
        let Some(index) = self.selected_message else {
            return;
        };
        let is_yaml = self
            .messages()
            .get(index)
            .is_some_and(|message| matches!(message.body, MessageBody::Yaml(_)));
        if is_yaml && !self.raw_yaml.remove(&index) {
            self.raw_yaml.insert(index);
        }
    }

    /// Text put on the clipboard; YAML blocks are copied without their id lines.
    pub fn selected_text(&self) -> Option<String> {
        let message = self.messages().get(self.selected_message?)?;
        match &message.body {
            MessageBody::Yaml(text) => Some(raw_view(text)),
            _ => Some(message.prompt_text()),
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    // Model picker

    pub fn model_keys(&self) -> Vec<String> {
        self.current_model
            .as_ref()
            .map(|current| current.available_models.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn model_label(&self, key: &str) -> String {
        self.current_model
            .as_ref()
            .and_then(|current| current.available_models.get(key))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    pub fn open_model_picker(&mut self) {
        let keys = self.model_keys();
        if keys.is_empty() {
            self.load_current_model();
            return;
        }
        let current = self.current_model.as_ref().map(|c| c.key.as_str());
        let index = keys.iter().position(|k| Some(k.as_str()) == current).unwrap_or(0);
        self.model_picker_state.select(Some(index));
        self.show_model_picker = true;
    }

    pub fn model_picker_down(&mut self) {
        let len = self.model_keys().len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Switch to the highlighted model. Choosing the current one, or choosing while a switch
    /// is running, only closes the picker.
    pub fn choose_model(&mut self) {
        self.show_model_picker = false;
        let Some(key) = self
            .model_picker_state
            .selected()
            .and_then(|i| self.model_keys().get(i).cloned())
        else {
            return;
        };
        let is_current = self.current_model.as_ref().is_some_and(|c| c.key == key);
        if is_current || self.is_switching_model() {
            return;
        }

        info!(model = %key, "switching model");
        self.input_mode = InputMode::Normal;
        let client = self.client.clone();
        self.switch_task = Some(tokio::spawn(async move {
            let result = client.switch_model(&key).await;
            (key, result)
        }));
    }

    pub fn toggle_theme(&mut self) {
        self.config.theme = self.config.theme.toggled();
        self.palette = Palette::for_theme(self.config.theme);
        self.save_config();
    }

    fn save_config(&self) {
        let result = match &self.config_path {
            Some(path) => self.config.save_to(path),
            None => self.config.save(),
        };
        if let Err(err) = result {
            warn!("could not save config: {:#}", err);
        }
    }

    /// Stop background work and the backend process.
    pub async fn shutdown(&mut self) {
        if let Some(task) = self.chat_task.take() {
            task.abort();
        }
        if let Some(task) = self.switch_task.take() {
            task.abort();
        }
        if let Some(task) = self.model_task.take() {
            task.abort();
        }
        self.status_watcher = None;
        self.startup_watcher = None;
        if let Some(supervisor) = self.supervisor.take() {
            if let Err(err) = supervisor.shutdown().await {
                warn!("{:#}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calyx_core::ConsoleBlock;
    use std::collections::BTreeMap;

    fn app() -> App {
        let dir = std::env::temp_dir().join("calyx-tui-tests");
        App::new(Config::new(), Some(dir.join("config.json")))
    }

    fn console(input: &str, output: &str) -> ChatMessage {
        ChatMessage::assistant_body(MessageBody::Console(ConsoleBlock::new("Cálculo", input, output)))
    }

    #[test]
    fn test_initial_state() {
        let app = app();
        assert!(app.input_enabled());
        assert_eq!(app.placeholder(), "Escribe tu mensaje...");
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_console_reply_disables_input_until_typed() {
        let mut app = app();
        app.session.begin("calcula 2 + 2");
        assert_eq!(app.placeholder(), "Procesando respuesta...");

        app.complete_turn(vec![ChatMessage::assistant("Listo"), console("2 + 2", "4")]);
        assert_eq!(app.active_animations(), 1);
        assert!(!app.input_enabled());
        assert_eq!(app.placeholder(), "Desglosando cálculos...");
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.typewriters.contains_key(&2));

        // "2 + 2\n4" is 7 chars at 25ms each
        for _ in 0..7 {
            app.tick(Duration::from_millis(25));
        }
        assert_eq!(app.active_animations(), 0);
        assert!(app.input_enabled());
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_animation_not_restarted() {
        let mut app = app();
        app.session.begin("calcula");
        app.complete_turn(vec![console("", "42")]);
        app.tick(Duration::from_millis(25));
        assert_eq!(app.typewriters[&1].visible_text(), "4");

        // A later turn leaves the earlier block alone
        app.session.begin("gracias");
        app.complete_turn(vec![ChatMessage::assistant("de nada")]);
        assert_eq!(app.typewriters[&1].visible_text(), "4");
    }

    #[test]
    fn test_plain_reply_refocuses_input() {
        let mut app = app();
        app.session.begin("hola");
        app.input_mode = InputMode::Normal;
        app.complete_turn(vec![ChatMessage::assistant("hola")]);
        assert_eq!(app.input_mode, InputMode::Editing);
        assert!(app.input_enabled());
    }

    #[test]
    fn test_new_chat_resets_everything() {
        let mut app = app();
        app.session.begin("calcula");
        app.complete_turn(vec![console("1", "1")]);
        app.selected_message = Some(0);
        app.new_chat();
        assert!(app.messages().is_empty());
        assert!(app.typewriters.is_empty());
        assert!(app.selected_message.is_none());
        assert!(app.input_enabled());
    }

    #[test]
    fn test_thinking_toggle_needs_thinking() {
        let mut app = app();
        app.session.begin("hola");
        app.complete_turn(vec![
            ChatMessage::assistant("respuesta").with_thinking(Some("razonamiento".to_string()))
        ]);

        app.select_prev();
        assert_eq!(app.selected_message, Some(1));
        assert!(app.expanded_thinking.is_empty());
        app.toggle_thinking();
        assert!(app.expanded_thinking.contains(&1));
        app.toggle_thinking();
        assert!(!app.expanded_thinking.contains(&1));

        app.select_prev();
        app.toggle_thinking();
        assert!(app.expanded_thinking.is_empty());
    }

    #[test]
    fn test_selection_bounds_and_copy_text() {
        let mut app = app();
        app.select_next();
        assert_eq!(app.selected_message, None);

        app.session.begin("hola");
        app.complete_turn(vec![console("a", "b")]);
        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.selected_message, Some(1));
        assert_eq!(app.selected_text().as_deref(), Some("a\nb"));
    }

    #[test]
    fn test_yaml_raw_view_and_copy() {
        let mut app = app();
        app.session.begin("pan");
        app.complete_turn(vec![ChatMessage::assistant_body(MessageBody::Yaml(
            "# Pan\nid: 4\nenergia: 265".to_string(),
        ))]);

        // Only YAML messages have a raw view
        app.selected_message = Some(0);
        app.toggle_raw_view();
        assert!(app.raw_yaml.is_empty());

        app.selected_message = Some(1);
        assert_eq!(app.selected_text().as_deref(), Some("# Pan\nenergia: 265"));
        app.toggle_raw_view();
        assert!(app.raw_yaml.contains(&1));
        app.toggle_raw_view();
        assert!(app.raw_yaml.is_empty());

        app.toggle_raw_view();
        app.new_chat();
        assert!(app.raw_yaml.is_empty());
    }

    #[test]
    fn test_model_labels() {
        let mut app = app();
        assert!(app.model_keys().is_empty());
        let mut models = BTreeMap::new();
        models.insert("deepseek-r1".to_string(), "DeepSeek-R1".to_string());
        models.insert("qwen".to_string(), "Qwen2.5-3B".to_string());
        app.current_model = Some(CurrentModel {
            key: "qwen".to_string(),
            available_models: models,
        });

        app.open_model_picker();
        assert!(app.show_model_picker);
        assert_eq!(app.model_picker_state.selected(), Some(1));
        assert_eq!(app.model_label("deepseek-r1"), "DeepSeek-R1");
        assert_eq!(app.model_label("otro"), "otro");

        // Choosing the current model just closes the picker
        app.choose_model();
        assert!(!app.show_model_picker);
        assert!(!app.is_switching_model());
    }

    #[tokio::test]
    async fn test_submit_runs_in_background() {
        let mut app = App::new(
            Config {
                api_url: "http://127.0.0.1:9".to_string(),
                ..Config::new()
            },
            None,
        );
        app.input = "hola".to_string();
        app.submit_input();
        assert!(app.input.is_empty());
        assert!(app.chat_task.is_some());
        assert!(!app.input_enabled());

        // A second submit is ignored while the first is in flight
        app.input = "otra".to_string();
        app.submit_input();
        assert_eq!(app.messages().len(), 1);

        while app.chat_task.is_some() {
            app.poll_tasks().await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(app.messages().len(), 2);
        assert_eq!(app.messages()[1].raw_text(), "Error de conexión con el backend.");
        assert!(app.input_enabled());
    }
}
