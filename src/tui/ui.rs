//! Renderização da interface TUI

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use super::app::{App, AppLayout, Field, LogLevel};
use crate::ncm::{DropdownView, NO_RESULTS_LABEL, SEARCHING_LABEL};

/// Renderiza a interface completa
pub fn render(frame: &mut Frame<'_>, app: &App) {
    let layout = app.layout;

    render_header(frame, layout.header);
    render_ncm_input(frame, app, layout.ncm_input);
    render_document(frame, app, layout.document);
    render_logs(frame, app, layout.logs);
    render_stats(frame, app, layout.stats);
    render_help(frame, layout.help);

    // Por último, para ficar por cima
    render_dropdown(frame, app, &layout);
}

fn render_header(frame: &mut Frame<'_>, area: Rect) {
    let header = Paragraph::new(format!(" 🧾 ATELIÊ FISCAL v{} ", crate::VERSION))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, area);
}

fn border_style(focused: bool, has_error: bool) -> Style {
    match (focused, has_error) {
        (_, true) => Style::default().fg(Color::Red),
        (true, false) => Style::default().fg(Color::Yellow),
        (false, false) => Style::default().fg(Color::DarkGray),
    }
}

fn cursor() -> Span<'static> {
    Span::styled(
        "│",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::RAPID_BLINK),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// CAMPO NCM
// ═══════════════════════════════════════════════════════════════════════════════

fn render_ncm_input(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let state = app.ncm.snapshot();
    let focused = app.focus == Field::Ncm;

    let mut spans = vec![Span::styled("🔍 ", Style::default().fg(Color::DarkGray))];
    if state.input_value.is_empty() {
        if focused {
            spans.push(cursor());
        }
        spans.push(Span::styled(
            app.ncm.placeholder().to_string(),
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        spans.push(Span::raw(state.input_value.clone()));
        if focused {
            spans.push(cursor());
        }
    }

    // Indicador à direita: carregando ou botão de limpar
    let suffix = if state.is_loading {
        " ⏳"
    } else if state.clear_visible() {
        " ✕ (Ctrl+U)"
    } else {
        ""
    };
    spans.push(Span::styled(suffix, Style::default().fg(Color::DarkGray)));

    let title = match state.error {
        Some(ref error) => format!(" NCM: {} ", error),
        None => " NCM ".to_string(),
    };

    let style = if state.disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };

    let input = Paragraph::new(Line::from(spans)).style(style).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style(focused, state.error.is_some())),
    );
    frame.render_widget(input, area);
}

fn render_dropdown(frame: &mut Frame<'_>, app: &App, layout: &AppLayout) {
    let area = layout.dropdown;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let muted = |label: &'static str| {
        Paragraph::new(Span::styled(
            label,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
    };

    match app.ncm.view() {
        DropdownView::Hidden => {}
        DropdownView::Searching => {
            frame.render_widget(Clear, area);
            frame.render_widget(muted(SEARCHING_LABEL).block(block), area);
        }
        DropdownView::NoResults => {
            frame.render_widget(Clear, area);
            frame.render_widget(muted(NO_RESULTS_LABEL).block(block), area);
        }
        DropdownView::Options {
            items,
            focused,
            offset,
        } => {
            let rows = area.height.saturating_sub(2) as usize;
            let desc_width = (area.width as usize).saturating_sub(18);

            let list_items: Vec<ListItem<'_>> = items
                .iter()
                .enumerate()
                .skip(offset)
                .take(rows)
                .map(|(index, option)| {
                    let line = Line::from(vec![
                        Span::styled(
                            format!(" {:<12}", option.code),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            truncate(&option.description, desc_width),
                            Style::default().fg(Color::Gray),
                        ),
                    ]);

                    if focused == Some(index) {
                        ListItem::new(line).style(Style::default().bg(Color::DarkGray).fg(Color::White))
                    } else {
                        ListItem::new(line)
                    }
                })
                .collect();

            let title = if items.len() > rows {
                format!(" {}-{} de {} ", offset + 1, (offset + rows).min(items.len()), items.len())
            } else {
                String::new()
            };

            frame.render_widget(Clear, area);
            frame.render_widget(List::new(list_items).block(block.title(title)), area);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CAMPO CPF/CNPJ
// ═══════════════════════════════════════════════════════════════════════════════

fn render_document(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let focused = app.focus == Field::Document;
    let document = &app.document;

    let mut spans = Vec::new();
    if document.is_empty() {
        if focused {
            spans.push(cursor());
        }
        spans.push(Span::styled(
            "000.000.000-00 ou 00.000.000/0000-00",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        spans.push(Span::raw(document.display().to_string()));
        if focused {
            spans.push(cursor());
        }
        let (label, color) = match document.kind() {
            Some(kind) if document.is_valid() => (format!("  ✓ {}", kind), Color::Green),
            Some(kind) => (format!("  ✗ {} inválido", kind), Color::Red),
            None => (String::new(), Color::DarkGray),
        };
        spans.push(Span::styled(label, Style::default().fg(color)));
    }

    let input = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(" CPF/CNPJ (Enter valida) ")
            .borders(Borders::ALL)
            .border_style(border_style(focused, false)),
    );
    frame.render_widget(input, area);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAINÉIS
// ═══════════════════════════════════════════════════════════════════════════════

fn render_logs(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let visible_height = area.height.saturating_sub(2) as usize;
    let max_msg_width = (area.width as usize).saturating_sub(18);

    let end = app.logs.len().saturating_sub(app.log_scroll);
    let start = end.saturating_sub(visible_height);

    let items: Vec<ListItem<'_>> = app
        .logs
        .iter()
        .skip(start)
        .take(end - start)
        .map(|entry| {
            let style = match entry.level {
                LogLevel::Info => Style::default().fg(Color::White),
                LogLevel::Success => Style::default().fg(Color::Green),
                LogLevel::Warning => Style::default().fg(Color::Yellow),
                LogLevel::Error => Style::default().fg(Color::Red),
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("[{}] ", entry.timestamp),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(format!("{} ", entry.level.symbol()), style),
                Span::styled(truncate(&entry.message, max_msg_width), style),
            ]))
        })
        .collect();

    let scroll_info = if app.log_scroll > 0 {
        format!(" [↑{}]", app.log_scroll)
    } else {
        String::new()
    };

    let logs = List::new(items).block(
        Block::default()
            .title(format!(" 📋 Logs{} ", scroll_info))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );

    frame.render_widget(logs, area);
}

/// Renderiza o painel de estatísticas
fn render_stats(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let stats = app.ncm.stats();
    let state = app.ncm.snapshot();

    let value_or_dash = |value: &str| {
        if value.is_empty() {
            "-".to_string()
        } else {
            value.to_string()
        }
    };

    let row = |label: &'static str, value: String, color: Color| {
        Line::from(vec![
            Span::raw(label),
            Span::styled(value, Style::default().fg(color)),
        ])
    };

    let text = Text::from(vec![
        Line::from(""),
        row(" Formulário NCM: ", value_or_dash(&app.ncm_value), Color::Cyan),
        row(" Documento:      ", value_or_dash(app.document.raw()), Color::Cyan),
        Line::from(""),
        Line::from(Span::styled(
            " ═══ Buscas ═══ ",
            Style::default().fg(Color::DarkGray),
        )),
        row(" Requisições:    ", stats.requests.to_string(), Color::Yellow),
        row(" Sem resultado:  ", stats.empty_results.to_string(), Color::White),
        row(" Falhas:         ", stats.failures.to_string(), Color::Red),
        row(" Descartadas:    ", stats.discarded.to_string(), Color::Magenta),
        Line::from(""),
        row(" Opções:         ", state.options.len().to_string(), Color::Green),
        row(
            " Foco:           ",
            state
                .focused_index
                .map(|i| (i + 1).to_string())
                .unwrap_or_else(|| "-".into()),
            Color::Green,
        ),
    ]);

    let panel = Paragraph::new(text).block(
        Block::default()
            .title(" 📊 Stats ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    frame.render_widget(panel, area);
}

fn render_help(frame: &mut Frame<'_>, area: Rect) {
    let help = Paragraph::new(
        "Tab: trocar campo │ ↑/↓: navegar │ Enter: selecionar │ Esc: fechar │ Ctrl+U: limpar │ Ctrl+Q: sair",
    )
    .alignment(Alignment::Center)
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, area);
}

/// Trunca uma string para o tamanho máximo (em caracteres)
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Preparações", 20), "Preparações");
        assert_eq!(truncate("Preparações odoríferas", 10), "Prepara...");
        assert_eq!(truncate("ação", 2), "aç");
    }
}
