//! Estado da aplicação TUI

use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::config::AutocompleteConfig;
use crate::fiscal::DocumentValue;
use crate::ncm::{Bounds, Key, NcmAutocomplete, NcmSearchClient, PointerBus, PointerDown};

/// Máximo de entradas mantidas no painel de logs.
const MAX_LOGS: usize = 200;

/// Nível de severidade do log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Retorna o símbolo emoji do nível
    pub fn symbol(&self) -> &'static str {
        match self {
            LogLevel::Info => "ℹ️ ",
            LogLevel::Success => "✅",
            LogLevel::Warning => "⚠️ ",
            LogLevel::Error => "❌",
        }
    }
}

/// Entrada de log
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Timestamp formatado
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }
}

/// Eventos enviados para a TUI fora do loop de input
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Nova linha no painel de logs
    Log(LogEntry),
    /// O campo NCM notificou o formulário
    NcmChanged(String),
}

/// Campo com foco
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Ncm,
    Document,
}

/// Áreas da tela, recalculadas a cada frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppLayout {
    pub header: Rect,
    pub ncm_input: Rect,
    pub dropdown: Rect,
    pub document: Rect,
    pub logs: Rect,
    pub stats: Rect,
    pub help: Rect,
}

impl AppLayout {
    /// Divide a tela. O dropdown tem `visible_rows` linhas mais as bordas.
    pub fn compute(area: Rect, visible_rows: usize) -> Self {
        let dropdown_height = (visible_rows as u16).saturating_add(2);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),               // Header
                Constraint::Length(3),               // Campo NCM
                Constraint::Length(dropdown_height), // Dropdown
                Constraint::Length(3),               // CPF/CNPJ
                Constraint::Min(5),                  // Logs + stats
                Constraint::Length(1),               // Ajuda
            ])
            .split(area);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(rows[4]);

        Self {
            header: rows[0],
            ncm_input: rows[1],
            dropdown: rows[2],
            document: rows[3],
            logs: body[0],
            stats: body[1],
            help: rows[5],
        }
    }

    /// Área do componente NCM (campo + dropdown) para o clique fora.
    pub fn ncm_bounds(&self) -> Bounds {
        let area = self.ncm_input.union(self.dropdown);
        Bounds::new(area.x, area.y, area.width, area.height)
    }
}

fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Estado principal da aplicação
pub struct App {
    /// Sessão do campo NCM
    pub ncm: NcmAutocomplete,
    /// Último valor que o campo NCM enviou ao formulário
    pub ncm_value: String,
    /// Campo CPF/CNPJ
    pub document: DocumentValue,
    pub focus: Field,
    pub logs: VecDeque<LogEntry>,
    /// Entradas roladas para cima a partir do fim (0 = acompanha o fim)
    pub log_scroll: usize,
    pub layout: AppLayout,
    pub should_quit: bool,
    pointer: PointerBus,
}

impl App {
    /// Cria a aplicação. Precisa de um runtime Tokio ativo.
    pub fn new(
        client: Arc<dyn NcmSearchClient>,
        config: AutocompleteConfig,
        events: Sender<AppEvent>,
    ) -> Self {
        let pointer = PointerBus::new();

        let ncm = NcmAutocomplete::builder(client)
            .config(config)
            .pointer_bus(&pointer, Bounds::default())
            .on_change(move |value| {
                let _ = events.send(AppEvent::NcmChanged(value.to_string()));
            })
            .build();
        ncm.focus();

        let mut app = Self {
            ncm,
            ncm_value: String::new(),
            document: DocumentValue::default(),
            focus: Field::Ncm,
            logs: VecDeque::new(),
            log_scroll: 0,
            layout: AppLayout::default(),
            should_quit: false,
            pointer,
        };
        app.log(LogEntry::info("Digite ao menos 2 caracteres para buscar NCMs"));
        app
    }

    pub fn log(&mut self, entry: LogEntry) {
        self.logs.push_back(entry);
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Processa um evento vindo de fora do loop de input
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(entry) => self.log(entry),
            AppEvent::NcmChanged(value) => self.ncm_value = value,
        }
    }

    /// Atualiza o layout e a área do componente NCM.
    pub fn set_layout(&mut self, layout: AppLayout) {
        if self.layout != layout {
            self.layout = layout;
            self.ncm.set_bounds(layout.ncm_bounds());
            // Em terminais baixos o dropdown encolhe; a rolagem segue o que cabe
            self.ncm
                .set_viewport_rows(layout.dropdown.height.saturating_sub(2) as usize);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Teclado
    // ─────────────────────────────────────────────────────────────────────────

    /// Processa uma tecla pressionada
    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                self.should_quit = true;
            }
            KeyCode::Tab | KeyCode::BackTab => self.cycle_focus(),
            _ => match self.focus {
                Field::Ncm => self.handle_ncm_key(key.code, ctrl),
                Field::Document => self.handle_document_key(key.code, ctrl),
            },
        }
    }

    fn cycle_focus(&mut self) {
        match self.focus {
            Field::Ncm => {
                // Tab fecha o dropdown sem impedir a troca de foco
                let outcome = self.ncm.handle_key(Key::Tab);
                if !outcome.prevent_default {
                    self.ncm.blur();
                    self.focus = Field::Document;
                }
            }
            Field::Document => {
                self.ncm.focus();
                self.focus = Field::Ncm;
            }
        }
    }

    fn handle_ncm_key(&mut self, code: KeyCode, ctrl: bool) {
        let key = match code {
            KeyCode::Down => Key::ArrowDown,
            KeyCode::Up => Key::ArrowUp,
            KeyCode::Enter => Key::Enter,
            KeyCode::Esc => Key::Escape,
            KeyCode::Char('u') if ctrl => {
                self.ncm.clear();
                return;
            }
            KeyCode::Char(c) if !ctrl => {
                let mut value = self.ncm.value();
                value.push(c);
                self.ncm.input(&value);
                return;
            }
            KeyCode::Backspace => {
                let mut value = self.ncm.value();
                if value.pop().is_some() {
                    self.ncm.input(&value);
                }
                return;
            }
            _ => Key::Other,
        };

        let focused = self.ncm.snapshot().focused_option().cloned();
        self.ncm.handle_key(key);

        if key == Key::Enter {
            if let Some(option) = focused {
                self.log_commit(&option.code);
            }
        }
    }

    fn log_commit(&mut self, code: &str) {
        self.log(LogEntry::success(format!("NCM confirmado: {}", code)));
    }

    fn handle_document_key(&mut self, code: KeyCode, ctrl: bool) {
        match code {
            KeyCode::Char('u') if ctrl => self.document = DocumentValue::default(),
            KeyCode::Char(c) if c.is_ascii_digit() && !ctrl => {
                let mut raw = self.document.raw().to_string();
                raw.push(c);
                self.document = DocumentValue::from_input(&raw);
            }
            KeyCode::Backspace => {
                let mut raw = self.document.raw().to_string();
                raw.pop();
                self.document = DocumentValue::from_input(&raw);
            }
            KeyCode::Enter => self.submit_document(),
            _ => {}
        }
    }

    fn submit_document(&mut self) {
        match self.document.validate() {
            Ok(kind) => self.log(LogEntry::success(format!(
                "{} válido: {}",
                kind.display_name(),
                self.document.display()
            ))),
            Err(e) => self.log(LogEntry::error(format!(
                "Documento inválido ({}): {}",
                self.document.display(),
                e
            ))),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mouse
    // ─────────────────────────────────────────────────────────────────────────

    /// Índice da opção sob a linha `y` do dropdown.
    fn option_at(&self, x: u16, y: u16) -> Option<usize> {
        let inner = self.layout.dropdown.inner(ratatui::layout::Margin::new(1, 1));
        if !contains(inner, x, y) {
            return None;
        }
        Some(self.ncm.snapshot().scroll_offset + (y - inner.y) as usize)
    }

    /// Processa um evento de mouse
    pub fn handle_mouse(&mut self, event: MouseEvent) {
        let (x, y) = (event.column, event.row);

        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.pointer.publish(PointerDown::new(x, y));

                if contains(self.layout.ncm_input, x, y) {
                    self.focus = Field::Ncm;
                    self.ncm.click_input();
                } else if let Some(index) = self.option_at(x, y) {
                    if let Some(option) = self.ncm.select(index) {
                        self.log_commit(&option.code);
                    }
                } else if contains(self.layout.document, x, y) {
                    self.ncm.blur();
                    self.focus = Field::Document;
                }
            }
            MouseEventKind::Moved => {
                if let Some(index) = self.option_at(x, y) {
                    self.ncm.hover(index);
                }
            }
            MouseEventKind::ScrollUp => self.scroll_up(),
            MouseEventKind::ScrollDown => self.scroll_down(),
            _ => {}
        }
    }

    pub fn scroll_up(&mut self) {
        if self.log_scroll + 1 < self.logs.len() {
            self.log_scroll += 1;
        }
    }

    pub fn scroll_down(&mut self) {
        self.log_scroll = self.log_scroll.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ncm::StaticNcmClient;
    use std::sync::mpsc;
    use std::time::Duration;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app() -> (App, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let client: Arc<dyn NcmSearchClient> = Arc::new(StaticNcmClient::with_defaults());
        let mut app = App::new(client, AutocompleteConfig::default(), tx);
        app.set_layout(AppLayout::compute(Rect::new(0, 0, 100, 40), 6));
        (app, rx)
    }

    fn drain(app: &mut App, rx: &mpsc::Receiver<AppEvent>) {
        while let Ok(event) = rx.try_recv() {
            app.handle_event(event);
        }
    }

    #[test]
    fn test_layout_bounds_cover_input_and_dropdown() {
        let layout = AppLayout::compute(Rect::new(0, 0, 100, 40), 6);
        let bounds = layout.ncm_bounds();
        assert_eq!(bounds.y, layout.ncm_input.y);
        assert_eq!(bounds.height, layout.ncm_input.height + layout.dropdown.height);
        assert_eq!(layout.dropdown.height, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_terminal_keeps_focus_on_screen() {
        let (mut app, _rx) = test_app();
        for c in "estatuetas".chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
        tokio::time::sleep(Duration::from_millis(401)).await;

        // Dropdown com espaço para só 1 linha (altura 3 com bordas)
        let mut layout = app.layout;
        layout.dropdown.height = 3;
        app.set_layout(layout);
        assert_eq!(app.ncm.viewport_rows(), 1);

        for _ in 0..3 {
            app.handle_key(press(KeyCode::Down));
            let state = app.ncm.snapshot();
            let rows = app.layout.dropdown.height.saturating_sub(2) as usize;
            let focused = state.focused_index.unwrap();
            assert!(focused >= state.scroll_offset && focused < state.scroll_offset + rows);
        }
        assert_eq!(app.ncm.snapshot().scroll_offset, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_and_committing_ncm() {
        let (mut app, rx) = test_app();

        for c in "velas".chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
        tokio::time::sleep(Duration::from_millis(401)).await;

        app.handle_key(press(KeyCode::Down));
        app.handle_key(press(KeyCode::Enter));
        drain(&mut app, &rx);

        assert_eq!(app.ncm_value, "3406.00.00");
        assert!(app.logs.iter().any(|l| l.message.contains("3406.00.00")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tab_moves_focus_and_closes_dropdown() {
        let (mut app, _rx) = test_app();
        app.handle_key(press(KeyCode::Char('v')));
        assert!(app.ncm.snapshot().is_open);

        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.focus, Field::Document);
        assert!(!app.ncm.snapshot().is_open);
        assert!(!app.ncm.snapshot().input_focused);

        for c in "11144477735".chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
        assert_eq!(app.document.display(), "111.444.777-35");

        app.handle_key(press(KeyCode::Enter));
        assert_eq!(app.logs.back().unwrap().level, LogLevel::Success);

        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.focus, Field::Ncm);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_option_selects_it() {
        let (mut app, rx) = test_app();
        for c in "estatuetas".chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
        tokio::time::sleep(Duration::from_millis(401)).await;

        let row = app.layout.dropdown.y + 2;
        app.handle_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: app.layout.dropdown.x + 3,
            row,
            modifiers: KeyModifiers::NONE,
        });
        drain(&mut app, &rx);

        assert_eq!(app.ncm_value, "6913.90.00");
    }
}
