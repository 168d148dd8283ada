// ============================================================================
// FxDash - Dashboard de taux de change dans le terminal
// ============================================================================
// Programme TUI : plusieurs widgets, chacun convertit une devise de base
// vers plusieurs devises cibles avec des taux récupérés en direct
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle infinie qui gère événements et rendering
// 3. Runtime tokio : les requêtes tournent en tâches de fond,
//    la boucle d'événements reste le seul endroit qui modifie l'état
// ============================================================================

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info};

use fxdash::api::ExchangeRatesClient;
use fxdash::app::Dashboard;
use fxdash::config::Config;
use fxdash::session::OutcomeReceiver;
use fxdash::ui::{events::EventHandler, render};

// ============================================================================
// Initialisation du logging
// ============================================================================
// CONCEPT : Logging dans une app TUI
// - Les println! ne fonctionnent pas une fois le TUI lancé
// - On log vers un fichier à la place, avec rotation quotidienne
// ============================================================================

/// Répertoire des logs
///
/// - Linux/WSL : ~/.local/share/fxdash/logs/
/// - macOS : ~/Library/Application Support/fxdash/logs/
/// - Windows : C:\Users\<user>\AppData\Local\fxdash\logs\
/// - Sinon : ./logs
fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("fxdash").join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialise le système de logging vers fichier
///
/// # Utilisation
/// ```bash
/// # Voir les logs en temps réel
/// tail -f ~/.local/share/fxdash/logs/fxdash.log.*
///
/// # Contrôler le niveau de log
/// RUST_LOG=fxdash=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "fxdash.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true)
                .with_thread_ids(true) // Utile : les requêtes tournent sur d'autres threads
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fxdash=debug,info".into()),
        )
        .try_init()
        .context("Échec de l'initialisation du subscriber tracing")?;

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    // Logging avant tout le reste : si l'init échoue, on continue sans
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!("FxDash starting up");
    let config = Config::from_env();
    debug!(base_url = %config.base_url, refresh = ?config.refresh_interval, "Configuration loaded");

    let runtime = tokio::runtime::Runtime::new().context("Échec de la création du runtime tokio")?;
    let client = ExchangeRatesClient::new(&config)?;

    // CONCEPT : Channel des résultats
    // - Les sessions envoient leurs RateOutcome depuis les tâches tokio
    // - La boucle d'événements les applique un par un (dans l'ordre d'arrivée)
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
    let mut app = Dashboard::new(Arc::new(client), outcome_tx, config.refresh_interval);

    // Liste des devises : une seule fois, avant d'ouvrir le TUI
    // Un échec laisse les sélecteurs vides mais n'empêche pas de démarrer
    println!("📊 Chargement des devises...");
    let count = runtime.block_on(app.load_symbols()).len();
    info!(count, "Startup symbol loading finished");

    // Les sessions appellent tokio::spawn depuis la boucle (synchrone) :
    // le contexte du runtime doit être actif sur ce thread
    let _guard = runtime.enter();

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events, &mut outcome_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. Appliquer les taux reçus (résultats des tâches de fond)
//   1. Dessiner l'interface (render)
//   2. Traiter les événements (input)
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut Dashboard,
    events: &EventHandler,
    outcomes: &mut OutcomeReceiver,
) -> Result<()> {
    while app.is_running() {
        // 0. RÉSULTATS : la dernière réponse arrivée gagne
        loop {
            match outcomes.try_recv() {
                Ok(outcome) => app.apply_outcome(outcome),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    error!("Outcome channel disconnected");
                    break;
                }
            }
        }

        // 1. RENDER
        terminal.draw(|frame| render(frame, app))?;

        // 2. INPUT
        match events.next() {
            Ok(event) => handle_event(app, event),
            Err(e) => debug!(error = ?e, "Failed to read terminal event"),
        }
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Traite un événement et met à jour l'état du dashboard
///
/// CONCEPT RUST : Pattern matching avec guards
/// - Le mode saisie passe en premier (toutes les touches vont au buffer)
/// - Puis les raccourcis du dashboard
fn handle_event(app: &mut Dashboard, event: fxdash::ui::events::Event) {
    use fxdash::ui::events::{
        get_char_from_event, is_activate_event, is_add_event, is_amount_event, is_backspace_event,
        is_delete_event, is_down_event, is_enter_event, is_escape_event, is_focus_event,
        is_quit_event, is_real_time_event, is_refresh_event, is_up_event, Event,
    };

    match event {
        // ========================================
        // Saisie du montant
        // ========================================
        Event::Key(_) if app.is_in_input_mode() && is_escape_event(&event) => {
            debug!("User cancelled amount input");
            app.cancel_input();
        }
        Event::Key(_) if app.is_in_input_mode() && is_enter_event(&event) => {
            app.submit_amount_input();
        }
        Event::Key(_) if app.is_in_input_mode() && is_backspace_event(&event) => {
            app.backspace();
        }
        Event::Key(_) if app.is_in_input_mode() => {
            if let Some(c) = get_char_from_event(&event) {
                app.append_char(c);
            }
        }

        // ========================================
        // Dashboard
        // ========================================
        Event::Key(_) if is_quit_event(&event) => {
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                info!("User requested quit (awaiting confirmation)");
                app.request_quit();
            }
        }

        Event::Key(_) if is_delete_event(&event) && !app.widgets().is_empty() => {
            app.cancel_quit();
            if app.is_awaiting_delete_confirmation() {
                info!(widget = ?app.selected_widget_id(), "User confirmed delete");
                app.delete_selected();
            } else {
                info!("User requested delete (awaiting confirmation)");
                app.request_delete();
            }
        }

        Event::Key(_) => {
            // Toute autre touche annule les confirmations en cours
            app.cancel_quit();
            app.cancel_delete();

            if is_focus_event(&event) {
                app.next_focus();
            } else if is_up_event(&event) {
                app.navigate_up();
            } else if is_down_event(&event) {
                app.navigate_down();
            } else if is_activate_event(&event) {
                app.activate();
            } else if is_add_event(&event) {
                if let Some(id) = app.add_or_update_widget() {
                    info!(widget = %id, "User added or updated widget");
                }
            } else if is_real_time_event(&event) {
                app.toggle_selected_real_time();
            } else if is_refresh_event(&event) {
                app.refresh_selected();
            } else if is_amount_event(&event) {
                app.start_amount_input();
            }
        }

        Event::Tick => {
            // Rien à faire : les résultats sont appliqués en début de boucle
        }
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================

/// Configure le terminal en mode TUI
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;

    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;

    terminal.show_cursor()?;

    Ok(())
}
