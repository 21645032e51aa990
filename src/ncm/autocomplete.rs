// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AUTOCOMPLETE NCM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Sessão de busca remota com debounce para o campo NCM:
// - digitação imediata, busca só após o debounce e com ≥ 2 caracteres
// - navegação por teclado com clamp (sem wraparound)
// - commit da seleção notificando o formulário pai
// - guarda de geração: só a última busca de uma sessão viva é aplicada
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::client::{NcmSearchClient, NcmSearchError};
use super::pointer::{Bounds, PointerBus, PointerDown};
use crate::config::AutocompleteConfig;
use crate::debounce::Debouncer;
use crate::types::NcmOption;

/// Texto exibido enquanto a primeira busca está em andamento.
pub const SEARCHING_LABEL: &str = "Buscando NCMs...";

/// Texto exibido quando a busca não retorna nada (ou falha).
pub const NO_RESULTS_LABEL: &str = "Nenhum código NCM encontrado.";

/// Callback do formulário pai. Recebe o texto digitado ou o código escolhido.
pub type OnChange = Arc<dyn Fn(&str) + Send + Sync>;

/// Teclas tratadas pelo campo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
    Tab,
    Other,
}

/// Resultado do tratamento de uma tecla.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    /// O host não deve executar a ação padrão da tecla.
    pub prevent_default: bool,
}

impl KeyOutcome {
    fn handled() -> Self {
        Self {
            prevent_default: true,
        }
    }

    fn ignored() -> Self {
        Self::default()
    }
}

/// Estado observável de uma sessão.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutocompleteState {
    /// Texto atual do campo.
    pub input_value: String,
    /// Cópia atrasada de `input_value` usada para buscar.
    pub debounced_value: String,
    /// Resultados na ordem do backend.
    pub options: Vec<NcmOption>,
    pub is_open: bool,
    /// Opção destacada. Sempre um índice válido de `options` ou `None`.
    pub focused_index: Option<usize>,
    /// Busca em andamento.
    pub is_loading: bool,
    /// Primeira linha visível do dropdown.
    pub scroll_offset: usize,
    pub input_focused: bool,
    pub disabled: bool,
    /// Erro de validação exibido abaixo do campo.
    pub error: Option<String>,
}

impl AutocompleteState {
    /// O botão de limpar só aparece fora de carregamento, com o campo
    /// habilitado e preenchido.
    pub fn clear_visible(&self) -> bool {
        !self.is_loading && !self.disabled && !self.input_value.is_empty()
    }

    pub fn focused_option(&self) -> Option<&NcmOption> {
        self.focused_index.and_then(|i| self.options.get(i))
    }

    fn reset_options(&mut self) {
        self.options.clear();
        self.focused_index = None;
        self.scroll_offset = 0;
    }

    /// Rola o mínimo necessário para a opção focada ficar visível.
    fn scroll_to_focused(&mut self, visible_rows: usize) {
        let Some(index) = self.focused_index else {
            return;
        };
        if !self.is_open {
            return;
        }

        let rows = visible_rows.max(1);
        if index < self.scroll_offset {
            self.scroll_offset = index;
        } else if index >= self.scroll_offset + rows {
            self.scroll_offset = index + 1 - rows;
        }
    }
}

/// O que o dropdown deve mostrar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropdownView {
    Hidden,
    /// [`SEARCHING_LABEL`]
    Searching,
    Options {
        items: Vec<NcmOption>,
        focused: Option<usize>,
        offset: usize,
    },
    /// [`NO_RESULTS_LABEL`]
    NoResults,
}

/// Contadores de buscas da sessão.
///
/// Falha e resultado vazio são iguais para o usuário, mas contados à parte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub requests: u64,
    pub failures: u64,
    pub empty_results: u64,
    /// Respostas que chegaram depois de superadas (ou após o descarte).
    pub discarded: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// NÚCLEO COMPARTILHADO COM AS TASKS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Core {
    state: Mutex<AutocompleteState>,
    client: Arc<dyn NcmSearchClient>,
    min_query_chars: usize,
    visible_rows: usize,
    /// Linhas que o host consegue mostrar agora (≤ `visible_rows` em telas baixas).
    viewport_rows: AtomicUsize,
    on_change: Option<OnChange>,
    /// Incrementada (sob o lock de `state`) a cada reavaliação da busca.
    generation: AtomicU64,
    alive: AtomicBool,
    bounds: Mutex<Bounds>,
    requests: AtomicU64,
    failures: AtomicU64,
    empty_results: AtomicU64,
    discarded: AtomicU64,
}

impl Core {
    fn state(&self) -> MutexGuard<'_, AutocompleteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn viewport_rows(&self) -> usize {
        self.viewport_rows.load(Ordering::Relaxed)
    }

    fn notify(&self, value: &str) {
        if let Some(ref on_change) = self.on_change {
            on_change(value);
        }
    }

    /// Reavalia a busca após mudança do texto atrasado ou da abertura.
    ///
    /// Qualquer busca anterior ainda em voo fica obsoleta.
    fn refresh(self: &Arc<Self>, state: &mut AutocompleteState) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.is_alive() {
            return;
        }

        if !state.is_open || state.debounced_value.chars().count() < self.min_query_chars {
            state.reset_options();
            state.is_loading = false;
            return;
        }

        state.is_loading = true;
        self.requests.fetch_add(1, Ordering::Relaxed);

        let query = state.debounced_value.clone();
        log::debug!("🔍 Buscando NCM '{}' (geração {})", query, generation);

        let core = Arc::clone(self);
        tokio::spawn(async move {
            let client = Arc::clone(&core.client);
            let search_query = query.clone();

            // Pânico do colaborador vira falha comum; o loading sempre termina
            let result = match tokio::spawn(async move { client.search(&search_query).await }).await {
                Ok(result) => result,
                Err(e) => Err(NcmSearchError::TaskFailed(e.to_string())),
            };
            core.apply(generation, &query, result);
        });
    }

    fn apply(&self, generation: u64, query: &str, result: Result<Vec<NcmOption>, NcmSearchError>) {
        let mut state = self.state();

        if !self.is_alive() || self.generation.load(Ordering::SeqCst) != generation {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            log::debug!("🗑️  Resposta obsoleta descartada: '{}'", query);
            return;
        }

        state.is_loading = false;
        state.reset_options();

        match result {
            Ok(options) => {
                if options.is_empty() {
                    self.empty_results.fetch_add(1, Ordering::Relaxed);
                    log::debug!("📭 Nenhum NCM para '{}'", query);
                }
                state.options = options;
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                log::error!("❌ Falha ao buscar NCMs para '{}': {}", query, e);
            }
        }
    }

    fn on_debounced(self: &Arc<Self>, value: String) {
        let mut state = self.state();
        if !self.is_alive() {
            return;
        }
        state.debounced_value = value;
        self.refresh(&mut state);
    }

    fn set_open(self: &Arc<Self>, state: &mut AutocompleteState, open: bool) {
        if state.is_open != open {
            state.is_open = open;
            self.refresh(state);
        }
    }

    fn on_pointer_down(self: &Arc<Self>, event: PointerDown) {
        let bounds = *self.bounds.lock().unwrap_or_else(PoisonError::into_inner);
        if bounds.contains(event) {
            return;
        }

        let mut state = self.state();
        if self.is_alive() && state.is_open {
            log::trace!("Clique fora ({}, {}), fechando dropdown", event.x, event.y);
            self.set_open(&mut state, false);
        }
    }
}

fn spawn_debounce_watcher(core: Weak<Core>, debouncer: &Debouncer<String>) -> JoinHandle<()> {
    let mut rx = debouncer.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let value = rx.borrow_and_update().clone();
            let Some(core) = core.upgrade() else {
                break;
            };
            core.on_debounced(value);
        }
    })
}

fn spawn_pointer_listener(core: Weak<Core>, bus: &PointerBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let Some(core) = core.upgrade() else {
                        break;
                    };
                    core.on_pointer_down(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("⚠️  {} cliques perdidos pelo autocomplete", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SESSÃO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Construtor de [`NcmAutocomplete`].
pub struct AutocompleteBuilder {
    client: Arc<dyn NcmSearchClient>,
    config: AutocompleteConfig,
    on_change: Option<OnChange>,
    initial_value: Option<String>,
    pointer: Option<(PointerBus, Bounds)>,
}

impl AutocompleteBuilder {
    pub fn config(mut self, config: AutocompleteConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_change<F>(mut self, on_change: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(on_change));
        self
    }

    /// Valor inicial (controlado) do campo.
    pub fn initial_value(mut self, value: impl Into<String>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    /// Instala o listener de clique fora no barramento da tela.
    pub fn pointer_bus(mut self, bus: &PointerBus, bounds: Bounds) -> Self {
        self.pointer = Some((bus.clone(), bounds));
        self
    }

    /// Cria a sessão. Precisa de um runtime Tokio ativo.
    pub fn build(self) -> NcmAutocomplete {
        let initial = self.initial_value.unwrap_or_default();
        let bounds = self.pointer.as_ref().map(|(_, b)| *b).unwrap_or_default();

        let state = AutocompleteState {
            input_value: initial.clone(),
            debounced_value: initial.clone(),
            disabled: self.config.disabled,
            error: self.config.error.clone(),
            ..Default::default()
        };

        let core = Arc::new(Core {
            state: Mutex::new(state),
            client: self.client,
            min_query_chars: self.config.min_query_chars,
            visible_rows: self.config.visible_rows,
            viewport_rows: AtomicUsize::new(self.config.visible_rows.max(1)),
            on_change: self.on_change,
            generation: AtomicU64::new(0),
            alive: AtomicBool::new(true),
            bounds: Mutex::new(bounds),
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            empty_results: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        });

        let debouncer = Debouncer::new(initial, self.config.debounce());
        let mut tasks = vec![spawn_debounce_watcher(Arc::downgrade(&core), &debouncer)];
        if let Some((bus, _)) = self.pointer {
            tasks.push(spawn_pointer_listener(Arc::downgrade(&core), &bus));
        }

        NcmAutocomplete {
            core,
            debouncer: Mutex::new(debouncer),
            tasks: Mutex::new(tasks),
            placeholder: self.config.placeholder,
        }
    }
}

/// Sessão de autocomplete NCM.
///
/// Cada instância possui seu próprio debounce, sua guarda de geração e seu
/// listener de clique fora. [`dispose`](Self::dispose) (ou `Drop`) encerra
/// tudo; nenhuma task altera o estado depois disso.
///
/// # Exemplo
///
/// ```rust,ignore
/// let client = Arc::new(StaticNcmClient::with_defaults());
/// let ncm = NcmAutocomplete::builder(client)
///     .on_change(|code| println!("ncm = {code}"))
///     .build();
///
/// ncm.input("velas");
/// // ... 400ms depois a busca dispara
/// ncm.handle_key(Key::ArrowDown);
/// ncm.handle_key(Key::Enter);
/// ```
pub struct NcmAutocomplete {
    core: Arc<Core>,
    debouncer: Mutex<Debouncer<String>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    placeholder: String,
}

impl NcmAutocomplete {
    pub fn builder(client: Arc<dyn NcmSearchClient>) -> AutocompleteBuilder {
        AutocompleteBuilder {
            client,
            config: AutocompleteConfig::default(),
            on_change: None,
            initial_value: None,
            pointer: None,
        }
    }

    pub fn new(client: Arc<dyn NcmSearchClient>, config: AutocompleteConfig) -> Self {
        Self::builder(client).config(config).build()
    }

    fn debounce(&self, value: &str) {
        self.debouncer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set(value.to_string());
    }

    /// Sessão viva e campo habilitado.
    fn interactive(&self, state: &AutocompleteState) -> bool {
        self.core.is_alive() && !state.disabled
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entrada
    // ─────────────────────────────────────────────────────────────────────────

    /// Digitação: atualiza o campo na hora, abre o dropdown e repassa o
    /// texto cru ao formulário.
    pub fn input(&self, text: &str) {
        {
            let mut state = self.core.state();
            if !self.interactive(&state) {
                return;
            }
            state.input_value = text.to_string();
            self.core.set_open(&mut state, true);
        }

        self.debounce(text);
        self.core.notify(text);
    }

    /// Sincroniza com um valor controlado externo (ex: reset do formulário).
    ///
    /// Não notifica o pai. Retorna `true` se o valor mudou.
    pub fn set_value(&self, value: &str) -> bool {
        {
            let mut state = self.core.state();
            if !self.core.is_alive() || state.input_value == value {
                return false;
            }
            state.input_value = value.to_string();
        }

        self.debounce(value);
        true
    }

    /// Clique no campo: abre o dropdown.
    pub fn click_input(&self) {
        let mut state = self.core.state();
        if self.interactive(&state) {
            state.input_focused = true;
            self.core.set_open(&mut state, true);
        }
    }

    /// Foco programático (ex: formulário apontando erro de validação).
    pub fn focus(&self) {
        let mut state = self.core.state();
        if self.core.is_alive() && !state.disabled {
            state.input_focused = true;
        }
    }

    pub fn blur(&self) {
        self.core.state().input_focused = false;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Teclado
    // ─────────────────────────────────────────────────────────────────────────

    /// Trata uma tecla pressionada no campo.
    ///
    /// Fechado, setas apenas abrem (sem mover o foco). Aberto, as setas
    /// movem o foco com clamp, Enter confirma a opção focada, Escape fecha
    /// e Tab fecha sem impedir a troca de foco.
    pub fn handle_key(&self, key: Key) -> KeyOutcome {
        let committed = {
            let mut state = self.core.state();
            if !self.interactive(&state) {
                return KeyOutcome::ignored();
            }

            if !state.is_open {
                return match key {
                    Key::ArrowDown | Key::ArrowUp => {
                        self.core.set_open(&mut state, true);
                        KeyOutcome::handled()
                    }
                    _ => KeyOutcome::ignored(),
                };
            }

            let focused = match key {
                Key::ArrowDown => {
                    if let Some(last) = state.options.len().checked_sub(1) {
                        state.focused_index = Some(match state.focused_index {
                            Some(i) => (i + 1).min(last),
                            None => 0,
                        });
                        state.scroll_to_focused(self.core.viewport_rows());
                    }
                    return KeyOutcome::handled();
                }
                Key::ArrowUp => {
                    if !state.options.is_empty() {
                        state.focused_index = Some(state.focused_index.map_or(0, |i| i.saturating_sub(1)));
                        state.scroll_to_focused(self.core.viewport_rows());
                    }
                    return KeyOutcome::handled();
                }
                Key::Escape => {
                    self.core.set_open(&mut state, false);
                    return KeyOutcome::handled();
                }
                Key::Tab => {
                    self.core.set_open(&mut state, false);
                    return KeyOutcome::ignored();
                }
                Key::Other => return KeyOutcome::ignored(),
                Key::Enter => state.focused_option().cloned(),
            };
            focused
        };

        if let Some(option) = committed {
            self.commit(option);
        }
        KeyOutcome::handled()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ponteiro e seleção
    // ─────────────────────────────────────────────────────────────────────────

    /// Ponteiro sobre uma opção: passa a ser a focada.
    pub fn hover(&self, index: usize) {
        let mut state = self.core.state();
        if self.interactive(&state) && state.is_open && index < state.options.len() {
            state.focused_index = Some(index);
            state.scroll_to_focused(self.core.viewport_rows());
        }
    }

    /// Clique numa opção. Retorna a opção confirmada.
    pub fn select(&self, index: usize) -> Option<NcmOption> {
        let option = {
            let state = self.core.state();
            if !self.interactive(&state) || !state.is_open {
                return None;
            }
            state.options.get(index).cloned()?
        };

        self.commit(option.clone());
        Some(option)
    }

    /// Único caminho que grava um código vindo do backend.
    fn commit(&self, option: NcmOption) {
        {
            let mut state = self.core.state();
            if !self.core.is_alive() {
                return;
            }
            state.input_value = option.code.clone();
            self.core.set_open(&mut state, false);
        }

        log::info!("✅ NCM selecionado: {} ({})", option.code, option.description);
        self.debounce(&option.code);
        self.core.notify(&option.code);
    }

    /// Botão de limpar. Sem efeito quando o botão não está visível.
    pub fn clear(&self) -> bool {
        {
            let mut state = self.core.state();
            if !self.core.is_alive() || !state.clear_visible() {
                return false;
            }
            state.input_value.clear();
            state.input_focused = true;
        }

        self.debounce("");
        self.core.notify("");
        true
    }

    pub fn clear_visible(&self) -> bool {
        self.core.state().clear_visible()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Propriedades do campo
    // ─────────────────────────────────────────────────────────────────────────

    /// Atualiza a área ocupada pelo componente (campo + dropdown).
    pub fn set_bounds(&self, bounds: Bounds) {
        *self.core.bounds.lock().unwrap_or_else(PoisonError::into_inner) = bounds;
    }

    pub fn bounds(&self) -> Bounds {
        *self.core.bounds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Desabilitar fecha o dropdown.
    pub fn set_disabled(&self, disabled: bool) {
        let mut state = self.core.state();
        state.disabled = disabled;
        if disabled {
            state.input_focused = false;
            self.core.set_open(&mut state, false);
        }
    }

    pub fn set_error(&self, error: Option<String>) {
        self.core.state().error = error;
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Leitura
    // ─────────────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> AutocompleteState {
        self.core.state().clone()
    }

    pub fn value(&self) -> String {
        self.core.state().input_value.clone()
    }

    /// O que o dropdown deve mostrar agora.
    pub fn view(&self) -> DropdownView {
        let state = self.core.state();

        if !state.is_open || state.input_value.is_empty() {
            return DropdownView::Hidden;
        }
        if state.is_loading && state.options.is_empty() {
            return DropdownView::Searching;
        }
        if !state.options.is_empty() {
            return DropdownView::Options {
                items: state.options.clone(),
                focused: state.focused_index,
                offset: state.scroll_offset,
            };
        }
        if state.input_value.chars().count() >= self.core.min_query_chars && !state.is_loading {
            return DropdownView::NoResults;
        }
        DropdownView::Hidden
    }

    /// Linhas configuradas para o dropdown.
    pub fn visible_rows(&self) -> usize {
        self.core.visible_rows
    }

    pub fn viewport_rows(&self) -> usize {
        self.core.viewport_rows()
    }

    /// Informa quantas linhas o host realmente desenhou.
    ///
    /// Em terminais baixos o dropdown encolhe; a rolagem passa a usar esse
    /// valor para a opção focada não sair da tela.
    pub fn set_viewport_rows(&self, rows: usize) {
        let rows = rows.max(1);
        if self.core.viewport_rows.swap(rows, Ordering::Relaxed) != rows {
            let mut state = self.core.state();
            // Sem linhas vazias no fim quando a tela cresce
            state.scroll_offset = state.scroll_offset.min(state.options.len().saturating_sub(rows));
            state.scroll_to_focused(rows);
        }
    }

    pub fn stats(&self) -> SearchStats {
        SearchStats {
            requests: self.core.requests.load(Ordering::Relaxed),
            failures: self.core.failures.load(Ordering::Relaxed),
            empty_results: self.core.empty_results.load(Ordering::Relaxed),
            discarded: self.core.discarded.load(Ordering::Relaxed),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ciclo de vida
    // ─────────────────────────────────────────────────────────────────────────

    pub fn is_disposed(&self) -> bool {
        !self.core.is_alive()
    }

    /// Encerra a sessão: cancela o debounce, remove o listener de clique e
    /// invalida buscas em voo. Idempotente.
    pub fn dispose(&self) {
        {
            let _state = self.core.state();
            if !self.core.alive.swap(false, Ordering::SeqCst) {
                return;
            }
            self.core.generation.fetch_add(1, Ordering::SeqCst);
        }

        self.debouncer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dispose();

        for task in self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }

        log::debug!("🧹 Sessão de autocomplete NCM encerrada");
    }
}

impl Drop for NcmAutocomplete {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for NcmAutocomplete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NcmAutocomplete")
            .field("state", &*self.core.state())
            .field("alive", &self.core.is_alive())
            .finish()
    }
}
