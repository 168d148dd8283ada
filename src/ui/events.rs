// ============================================================================
// Gestion des événements
// ============================================================================
// Gère les événements clavier et les ticks de l'application
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Polling avec timeout : la boucle reste réactive sans bloquer
// 3. Error handling avec Result
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Tick régulier (permet d'appliquer les taux reçus entre deux touches)
    Tick,
}

/// Gestionnaire d'événements
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    /// Crée un gestionnaire avec un tick de 250ms
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
        }
    }

    /// Lit le prochain événement (bloquant avec timeout)
    ///
    /// CONCEPT : Non-blocking I/O avec timeout
    /// - poll(timeout) attend max 250ms
    /// - Si pas d'événement, retourne Ok(Event::Tick)
    /// - Si événement, le lit et le convertit
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                // Sur certains OS, on reçoit Press ET Release
                // On ne veut gérer que Press pour éviter les doublons
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),

                // Autres événements (release, resize, souris) : simple tick
                _ => Ok(Event::Tick),
            }
        } else {
            Ok(Event::Tick)
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers : Convertir KeyEvent en action
// ============================================================================

/// Vérifie si l'événement correspond à l'une des touches données
fn is_key(event: &Event, codes: &[KeyCode]) -> bool {
    if let Event::Key(key) = event {
        codes.contains(&key.code)
    } else {
        false
    }
}

/// 'q' : quitter (avec confirmation)
pub fn is_quit_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Char('q'), KeyCode::Char('Q')])
}

pub fn is_escape_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Esc])
}

/// Entrée ou Espace : "clic" sur l'élément sous le curseur
pub fn is_activate_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Enter, KeyCode::Char(' ')])
}

pub fn is_enter_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Enter])
}

/// Tab : zone suivante (base → cibles → widgets)
pub fn is_focus_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Tab])
}

/// Flèche vers le haut ou 'k' (vim)
pub fn is_up_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Up, KeyCode::Char('k'), KeyCode::Char('K')])
}

/// Flèche vers le bas ou 'j' (vim)
pub fn is_down_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Down, KeyCode::Char('j'), KeyCode::Char('J')])
}

/// 'a' : Add Widget / Update Widget
pub fn is_add_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Char('a'), KeyCode::Char('A')])
}

/// 'd' : supprimer le widget sélectionné (avec confirmation)
pub fn is_delete_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Char('d'), KeyCode::Char('D')])
}

/// 't' : bascule du mode temps réel
pub fn is_real_time_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Char('t'), KeyCode::Char('T')])
}

/// 'r' : rafraîchissement manuel
pub fn is_refresh_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Char('r'), KeyCode::Char('R')])
}

/// 'i' : saisir le montant du widget sélectionné
pub fn is_amount_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Char('i'), KeyCode::Char('I')])
}

pub fn is_backspace_event(event: &Event) -> bool {
    is_key(event, &[KeyCode::Backspace])
}

/// Extrait le caractère d'un événement clavier si c'est un caractère
///
/// La saisie du montant accepte tout caractère : le texte reste brut,
/// une saisie non numérique sera lue comme 1 à l'affichage
pub fn get_char_from_event(event: &Event) -> Option<char> {
    if let Event::Key(key) = event {
        if let KeyCode::Char(c) = key.code {
            return Some(c);
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, event::KeyModifiers::empty()))
    }

    #[test]
    fn test_is_quit_event() {
        assert!(is_quit_event(&key(KeyCode::Char('q'))));
        assert!(!is_quit_event(&key(KeyCode::Char('a'))));
        assert!(!is_quit_event(&Event::Tick));
    }

    #[test]
    fn test_activate_accepts_enter_and_space() {
        assert!(is_activate_event(&key(KeyCode::Enter)));
        assert!(is_activate_event(&key(KeyCode::Char(' '))));
        assert!(!is_activate_event(&key(KeyCode::Tab)));
    }

    #[test]
    fn test_get_char_from_event() {
        assert_eq!(get_char_from_event(&key(KeyCode::Char('x'))), Some('x'));
        assert_eq!(get_char_from_event(&key(KeyCode::Enter)), None);
        assert_eq!(get_char_from_event(&key(KeyCode::Char('7'))), Some('7'));
        assert_eq!(get_char_from_event(&Event::Tick), None);
    }
}
