//! Runner que conecta a sessão NCM com o terminal

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use super::app::{App, AppEvent, AppLayout, LogEntry};
use super::ui;
use crate::config::AutocompleteConfig;
use crate::ncm::NcmSearchClient;

/// Resultado de uma sessão da TUI
#[derive(Debug, Clone, Default)]
pub struct TuiOutcome {
    /// Último valor do campo NCM enviado ao formulário
    pub ncm: String,
    /// CPF/CNPJ digitado (só dígitos)
    pub document: String,
}

/// Executa a TUI até o usuário sair.
///
/// Bloqueia a thread atual; chame de dentro de `spawn_blocking` para que as
/// tasks do autocomplete continuem rodando no runtime.
pub fn run_tui(
    client: Arc<dyn NcmSearchClient>,
    config: AutocompleteConfig,
    event_tx: Sender<AppEvent>,
    event_rx: Receiver<AppEvent>,
) -> io::Result<TuiOutcome> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(client, config, event_tx);

    let result = run_app(&mut terminal, &mut app, event_rx);

    // Restaurar terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.ncm.dispose();
    result?;

    Ok(TuiOutcome {
        ncm: app.ncm_value.clone(),
        document: app.document.raw().to_string(),
    })
}

/// Loop principal da TUI
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    event_rx: Receiver<AppEvent>,
) -> io::Result<()> {
    let visible_rows = app.ncm.visible_rows();

    loop {
        let size = terminal.size()?;
        app.set_layout(AppLayout::compute(
            ratatui::layout::Rect::new(0, 0, size.width, size.height),
            visible_rows,
        ));

        // Renderizar
        terminal.draw(|frame| ui::render(frame, app))?;

        // Eventos da sessão (não bloqueante)
        while let Ok(event) = event_rx.try_recv() {
            app.handle_event(event);
        }

        // Input do usuário (com timeout, para redesenhar quando a busca chega)
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Cria um canal para enviar eventos para a TUI
pub fn create_event_channel() -> (Sender<AppEvent>, Receiver<AppEvent>) {
    mpsc::channel()
}

/// Wrapper para enviar logs formatados ao painel
#[derive(Debug, Clone)]
pub struct TuiLogger {
    tx: Sender<AppEvent>,
}

impl TuiLogger {
    pub fn new(tx: Sender<AppEvent>) -> Self {
        Self { tx }
    }

    pub fn info(&self, msg: impl Into<String>) {
        let _ = self.tx.send(AppEvent::Log(LogEntry::info(msg)));
    }

    pub fn success(&self, msg: impl Into<String>) {
        let _ = self.tx.send(AppEvent::Log(LogEntry::success(msg)));
    }

    pub fn warning(&self, msg: impl Into<String>) {
        let _ = self.tx.send(AppEvent::Log(LogEntry::warning(msg)));
    }

    pub fn error(&self, msg: impl Into<String>) {
        let _ = self.tx.send(AppEvent::Log(LogEntry::error(msg)));
    }
}
