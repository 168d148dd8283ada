// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine l'interface TUI en utilisant les widgets de ratatui
//
//   ┌ header ───────────────────────────────────────────────┐
//   │ base (liste) │ cibles (multi) │ Add / Update Widget   │
//   │ widget │ widget │ widget                              │
//   │ widget │ ...                                          │
//   └ footer (raccourcis / confirmations / saisie) ─────────┘
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Widgets : composants UI (Block, Paragraph, List, etc.)
// 3. Layout : découpage de l'espace en zones
// 4. ListState : liste avec défilement qui suit le curseur
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{Dashboard, Focus};
use crate::models::CurrencyConfig;

/// Nombre de widgets par ligne dans la grille
const GRID_COLUMNS: usize = 3;

/// Dessine l'interface complète
pub fn render(frame: &mut Frame, app: &Dashboard) {
    let chunks = create_layout(frame.size());

    render_header(frame, chunks[0]);
    render_selectors(frame, app, chunks[1]);
    render_widgets(frame, app, chunks[2]);

    if app.is_in_input_mode() {
        render_input_footer(frame, app, chunks[3]);
    } else {
        render_footer(frame, app, chunks[3]);
    }
}

/// Crée le layout principal (header, sélecteurs, widgets, footer)
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Length(10), // Sélecteurs
            Constraint::Min(0),     // Grille des widgets
            Constraint::Length(3),  // Footer
        ])
        .split(area)
        .to_vec()
}

/// Bordure mise en valeur si la zone a le focus
fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(Line::from(Span::styled(
        "Currency Exchange Dashboard",
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    )))
    .block(block)
    .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Sélecteurs : base, cibles, action
// ============================================================================

fn render_selectors(frame: &mut Frame, app: &Dashboard, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ])
        .split(area);

    render_base_selector(frame, app, columns[0]);
    render_target_selector(frame, app, columns[1]);
    render_action_panel(frame, app, columns[2]);
}

/// Liste des devises de base (● = base en attente)
///
/// CONCEPT RATATUI : render_stateful_widget
/// - ListState garde l'index sélectionné
/// - La liste défile toute seule pour garder le curseur visible
fn render_base_selector(frame: &mut Frame, app: &Dashboard, area: Rect) {
    let focused = app.focus == Focus::BaseSelector;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(focused))
        .title(" Base ");

    let items: Vec<ListItem> = app
        .available_currencies()
        .iter()
        .map(|currency| {
            let marker = if currency.code == app.selection().base { "●" } else { " " };
            ListItem::new(format!("{} {}  {}", marker, currency.code, currency.name))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(cursor_style(focused));
    let mut state = ListState::default().with_selected(Some(app.base_cursor));

    frame.render_stateful_widget(list, area, &mut state);
}

/// Liste des devises cibles (la base en attente n'y figure jamais)
fn render_target_selector(frame: &mut Frame, app: &Dashboard, area: Rect) {
    let focused = app.focus == Focus::TargetSelector;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(focused))
        .title(" Targets ");

    let items: Vec<ListItem> = app
        .target_candidates()
        .iter()
        .map(|currency| {
            let checked = app.selection().targets.contains(&currency.code);
            let check = if checked { "[x]" } else { "[ ]" };
            let style = if checked {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(format!("{} {}  {}", check, currency.code, currency.name)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(cursor_style(focused));
    let mut state = ListState::default().with_selected(Some(app.target_cursor));

    frame.render_stateful_widget(list, area, &mut state);
}

fn cursor_style(focused: bool) -> Style {
    if focused {
        Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
    } else {
        Style::default()
    }
}

/// Résumé de la sélection + bouton "Add Widget" / "Update Widget"
fn render_action_panel(frame: &mut Frame, app: &Dashboard, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Widget ");

    let mut text = Vec::new();

    if app.available_currencies().is_empty() {
        text.push(Line::from(Span::styled(
            "No currencies available",
            Style::default().fg(Color::Gray),
        )));
    } else {
        let selection = app.selection();
        let targets = if selection.targets.is_empty() {
            "(none)".to_string()
        } else {
            selection.targets.join(", ")
        };
        text.push(Line::from(vec![
            Span::styled(&selection.base, Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" → "),
            Span::raw(targets),
        ]));
    }

    text.push(Line::from(""));
    text.push(Line::from(vec![
        Span::styled("[a] ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::styled(
            app.action_label(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ]));

    if let Some(id) = app.editing_widget_id() {
        text.push(Line::from(Span::styled(
            format!("Editing widget {}", id),
            Style::default().fg(Color::Blue),
        )));
    }

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Grille des widgets
// ============================================================================

fn render_widgets(frame: &mut Frame, app: &Dashboard, area: Rect) {
    let widgets = app.widgets();

    if widgets.is_empty() {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(app.focus == Focus::Widgets))
            .title(" Widgets ");
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "No widgets yet, pick a base and targets then press [a]",
                Style::default().fg(Color::Gray),
            )),
        ])
        .block(block)
        .alignment(Alignment::Center);

        frame.render_widget(paragraph, area);
        return;
    }

    // CONCEPT : Découpage en lignes puis en colonnes
    // - div_ceil : nombre de lignes nécessaires (arrondi supérieur)
    let row_count = widgets.len().div_ceil(GRID_COLUMNS);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, row_count as u32); row_count])
        .split(area);

    for (row_index, row_area) in rows.iter().enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, GRID_COLUMNS as u32); GRID_COLUMNS])
            .split(*row_area);

        for (column, cell) in cells.iter().enumerate() {
            let index = row_index * GRID_COLUMNS + column;
            if let Some(config) = widgets.get(index) {
                let selected = app.focus == Focus::Widgets && index == app.selected_widget;
                render_widget_card(frame, app, config, selected, *cell);
            }
        }
    }
}

/// Dessine un widget : titre, édition, montant, temps réel, conversions
fn render_widget_card(
    frame: &mut Frame,
    app: &Dashboard,
    config: &CurrencyConfig,
    selected: bool,
    area: Rect,
) {
    let editing = app.editing_widget_id() == Some(config.id);

    let errored = app
        .session(config.id)
        .is_some_and(|session| session.snapshot().is_errored());

    let border = if editing {
        Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)
    } else if errored && !selected {
        Style::default().fg(Color::Red)
    } else {
        border_style(selected)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(format!(" {} Exchange Rates ", config.base_currency));

    let mut text = Vec::new();

    if editing {
        text.push(Line::from(Span::styled(
            "Editing...",
            Style::default().fg(Color::Blue),
        )));
    }

    let Some(session) = app.session(config.id) else {
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    // Montant saisi (ou placeholder)
    let amount = if session.amount().is_empty() {
        Span::styled("Enter amount", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(session.amount())
    };
    text.push(Line::from(vec![Span::raw("Amount: "), amount]));

    let check = if session.is_real_time() { "[x]" } else { "[ ]" };
    text.push(Line::from(format!("{} Real-Time Updates", check)));
    text.push(Line::from(""));

    match session.compute_display() {
        Ok(conversions) => {
            for conversion in conversions {
                text.push(Line::from(conversion.to_string()));
            }
        }
        Err(err) => {
            text.push(Line::from(Span::styled(
                err.user_message(),
                Style::default().fg(Color::Red),
            )));
        }
    }

    if let Some(updated) = session.last_updated() {
        let date = session.snapshot().date.as_deref().unwrap_or("?");
        text.push(Line::from(Span::styled(
            format!("Updated {} (rates of {})", updated.format("%H:%M:%S"), date),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Footer : raccourcis et confirmations
// ============================================================================

fn render_footer(frame: &mut Frame, app: &Dashboard, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let warning = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let blinking = Style::default()
        .fg(Color::Red)
        .add_modifier(Modifier::BOLD)
        .add_modifier(Modifier::SLOW_BLINK);
    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let shortcuts = if app.is_awaiting_delete_confirmation() {
        let base = app
            .selected_widget_id()
            .and_then(|id| app.widgets().iter().find(|w| w.id == id))
            .map(|w| w.base_currency.as_str())
            .unwrap_or("?");

        Line::from(vec![
            Span::styled("⚠  Appuyez sur ", warning),
            Span::styled("[d]", blinking),
            Span::styled(
                format!(" à nouveau pour supprimer le widget {} ou autre touche pour annuler ⚠", base),
                warning,
            ),
        ])
    } else if app.is_awaiting_quit_confirmation() {
        Line::from(vec![
            Span::styled("⚠  Appuyez sur ", warning),
            Span::styled("[q]", blinking),
            Span::styled(
                " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠",
                warning,
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("[q]", key),
            Span::raw(" Quit  "),
            Span::styled("[Tab]", key),
            Span::raw(" Focus  "),
            Span::styled("[↑↓]", key),
            Span::raw(" Move  "),
            Span::styled("[Enter]", key),
            Span::raw(" Select/Edit  "),
            Span::styled("[a]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(format!(" {}  ", app.action_label())),
            Span::styled("[i]", key),
            Span::raw(" Amount  "),
            Span::styled("[t]", key),
            Span::raw(" Real-time  "),
            Span::styled("[r]", key),
            Span::raw(" Refresh  "),
            Span::styled("[d]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" Delete"),
        ])
    };

    let paragraph = Paragraph::new(vec![shortcuts])
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

/// Footer en mode saisie du montant
fn render_input_footer(frame: &mut Frame, app: &Dashboard, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(" [Enter] Confirm  [ESC] Cancel ");

    let input_line = Line::from(vec![
        Span::styled(
            "Amount: ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(&app.input_buffer, Style::default().fg(Color::White)),
        Span::styled(
            "█", // Curseur
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ),
    ]);

    let paragraph = Paragraph::new(vec![input_line])
        .block(block)
        .alignment(Alignment::Left);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    use super::*;
    use crate::api::fake::FakeRateService;

    /// Dessine le dashboard dans un terminal virtuel et retourne le texte
    fn draw(app: &Dashboard) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();

        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[tokio::test]
    async fn test_render_widget_with_rates_and_error() {
        let service = Arc::new(FakeRateService::new().with_symbols(&["EUR", "USD", "JPY"]));
        service.reply_next(Ok(crate::api::fake::rates(&[("USD", 0.731331)])));
        service.reply_next(Err("HTTP 500".to_string()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = Dashboard::new(service.clone(), tx, Duration::from_secs(60));
        app.load_symbols().await;

        app.add_or_update_widget();
        app.add_or_update_widget();
        for _ in 0..2 {
            let outcome = rx.recv().await.unwrap();
            app.apply_outcome(outcome);
        }

        let screen = draw(&app);
        assert!(screen.contains("EUR Exchange Rates"));
        assert!(screen.contains("USD: 0.73 per 1 EUR"));
        assert!(screen.contains("Failed to fetch data"));
        assert!(screen.contains("Add Widget"));
    }

    #[tokio::test]
    async fn test_render_without_symbols() {
        let service = Arc::new(FakeRateService::new().with_failing_symbols());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = Dashboard::new(service, tx, Duration::from_secs(60));
        app.load_symbols().await;

        let screen = draw(&app);
        assert!(screen.contains("No currencies available"));
        assert!(screen.contains("No widgets yet"));
    }
}
