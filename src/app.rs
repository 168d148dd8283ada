// ============================================================================
// Structure : Dashboard
// ============================================================================
// Gère l'état global du dashboard de devises
//
// CONCEPTS RUST :
// 1. State Management : centraliser l'état dans une seule structure
// 2. Mutabilité contrôlée : &mut self pour modifier l'état
// 3. Enums pour state machines : EditState, Focus, Screen
//
// PATTERN : Cette structure suit le pattern "Application State"
// - Tous les composants de l'UI lisent depuis Dashboard
// - Toutes les modifications passent par les méthodes de Dashboard
// - Seule la boucle d'événements appelle ces méthodes (un seul thread
//   modifie l'état, les tâches tokio ne font qu'envoyer des résultats)
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hashlink::LinkedHashMap;
use tracing::{debug, error, info, warn};

use crate::api::RateService;
use crate::error::DashboardError;
use crate::models::{Currency, CurrencyConfig, PendingSelection, WidgetId};
use crate::session::{OutcomeSender, RateOutcome, WidgetSession};

/// Nombre de devises cibles présélectionnées après le chargement des symboles
const DEFAULT_TARGET_COUNT: usize = 3;

// ============================================================================
// Enum : EditState
// ============================================================================
// Machine à deux états pour l'édition d'un widget :
//
//   état actuel   | clic sur un widget W  | résultat
//   --------------+-----------------------+-------------------------------
//   Idle          | n'importe lequel      | Editing(W), sélection chargée
//   Editing(A)    | A (le même)           | Idle
//   Editing(A)    | B (un autre)          | Idle  (PAS Editing(B))
//
// Cliquer un autre widget pendant l'édition annule l'édition, il ne
// redirige pas vers ce widget : c'est un interrupteur, pas un aiguillage.
// ============================================================================

/// État d'édition du dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    /// Aucun widget en cours d'édition
    #[default]
    Idle,

    /// Le widget donné est en cours d'édition
    Editing(WidgetId),
}

impl EditState {
    /// Transition déclenchée par un clic sur un widget
    pub fn on_widget_clicked(self, clicked: WidgetId) -> EditState {
        match self {
            EditState::Idle => EditState::Editing(clicked),
            EditState::Editing(_) => EditState::Idle,
        }
    }

    pub fn editing_id(self) -> Option<WidgetId> {
        match self {
            EditState::Idle => None,
            EditState::Editing(id) => Some(id),
        }
    }
}

/// Zone qui reçoit les touches de navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Liste des devises de base
    BaseSelector,

    /// Liste des devises cibles (sélection multiple)
    TargetSelector,

    /// Grille des widgets
    Widgets,
}

impl Focus {
    /// Tab : Base → Cibles → Widgets → Base
    pub fn next(self) -> Self {
        match self {
            Focus::BaseSelector => Focus::TargetSelector,
            Focus::TargetSelector => Focus::Widgets,
            Focus::Widgets => Focus::BaseSelector,
        }
    }
}

/// Écrans de l'application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Vue principale
    Dashboard,

    /// Saisie du montant du widget sélectionné
    /// CONCEPT : Modal input mode (Vim-like)
    /// - Capture les touches pour construire un buffer
    /// - Enter valide, ESC annule
    AmountInput,
}

/// État principal du dashboard
pub struct Dashboard {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Two-step quit : première pression de 'q' = confirmation demandée
    pub confirm_quit: bool,

    /// Two-step delete : première pression de 'd' = confirmation demandée
    pub confirm_delete: bool,

    /// Écran actuellement affiché
    pub current_screen: Screen,

    /// Zone active pour la navigation
    pub focus: Focus,

    /// Curseurs des listes de sélection et de la grille
    pub base_cursor: usize,
    pub target_cursor: usize,
    pub selected_widget: usize,

    /// Buffer de saisie du montant
    pub input_buffer: String,

    /// Configurations des widgets, dans l'ordre de création
    widgets: Vec<CurrencyConfig>,

    /// Une session vivante par widget
    sessions: HashMap<WidgetId, WidgetSession>,

    /// Devises connues (vide si le chargement des symboles a échoué)
    available: Vec<Currency>,

    /// Erreur du chargement des symboles (loguée, jamais affichée)
    symbols_error: Option<DashboardError>,

    /// Sélection en attente dans les contrôles
    selection: PendingSelection,

    edit: EditState,

    /// Compteur monotone : un id n'est jamais réutilisé
    next_id: u64,

    service: Arc<dyn RateService>,
    outcomes: OutcomeSender,
    refresh_interval: Duration,
}

impl Dashboard {
    /// Crée un dashboard vide
    ///
    /// Les devises sont chargées ensuite avec load_symbols()
    pub fn new(
        service: Arc<dyn RateService>,
        outcomes: OutcomeSender,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            running: true,
            confirm_quit: false,
            confirm_delete: false,
            current_screen: Screen::Dashboard,
            focus: Focus::BaseSelector,
            base_cursor: 0,
            target_cursor: 0,
            selected_widget: 0,
            input_buffer: String::new(),
            widgets: Vec::new(),
            sessions: HashMap::new(),
            available: Vec::new(),
            symbols_error: None,
            selection: PendingSelection::default(),
            edit: EditState::Idle,
            next_id: 1,
            service,
            outcomes,
            refresh_interval,
        }
    }

    // ========================================================================
    // Symboles et sélection
    // ========================================================================

    /// Charge la liste des devises (une seule fois, au démarrage)
    ///
    /// En cas d'échec, la liste reste vide et les sélecteurs sont inertes.
    /// L'erreur est loguée mais ne bloque rien.
    pub async fn load_symbols(&mut self) -> &[Currency] {
        match self.service.list_symbols().await {
            Ok(response) => self.apply_symbols(response.symbols),
            Err(e) => {
                error!(error = ?e, "Error fetching symbols");
                self.symbols_error = Some(DashboardError::SymbolsFetchFailed(format!("{:#}", e)));
            }
        }
        &self.available
    }

    /// Remplit les devises connues et la sélection par défaut
    ///
    /// Base = première devise, cibles = les trois suivantes (ordre de l'API)
    pub fn apply_symbols(&mut self, symbols: LinkedHashMap<String, String>) {
        self.available = symbols
            .into_iter()
            .map(|(code, name)| Currency::new(code, name))
            .collect();
        self.symbols_error = None;

        let mut codes = self.available.iter().map(|c| c.code.clone());
        self.selection = PendingSelection {
            base: codes.next().unwrap_or_default(),
            targets: codes.take(DEFAULT_TARGET_COUNT).collect(),
        };
        self.base_cursor = 0;
        self.target_cursor = 0;

        info!(
            count = self.available.len(),
            base = %self.selection.base,
            targets = ?self.selection.targets,
            "Currency symbols loaded"
        );
    }

    pub fn available_currencies(&self) -> &[Currency] {
        &self.available
    }

    pub fn symbols_error(&self) -> Option<&DashboardError> {
        self.symbols_error.as_ref()
    }

    pub fn selection(&self) -> &PendingSelection {
        &self.selection
    }

    pub fn is_known(&self, code: &str) -> bool {
        self.available.iter().any(|c| c.code == code)
    }

    /// Devises proposées comme cibles : toutes sauf la base en attente
    pub fn target_candidates(&self) -> Vec<&Currency> {
        self.available
            .iter()
            .filter(|c| c.code != self.selection.base)
            .collect()
    }

    /// Change la base en attente (aucun widget n'est modifié)
    ///
    /// La nouvelle base est retirée des cibles en attente.
    /// Retourne false si la devise est inconnue (ou la liste vide).
    pub fn select_base_currency(&mut self, code: &str) -> bool {
        if !self.is_known(code) {
            debug!(code = %code, "Ignoring unknown base currency");
            return false;
        }

        self.selection.base = code.to_string();
        self.selection.strip_base_from_targets();
        debug!(base = %code, targets = ?self.selection.targets, "Pending base currency changed");
        true
    }

    /// Remplace les cibles en attente
    ///
    /// Ne garde que les devises candidates, sans doublon, dans l'ordre donné
    pub fn select_target_currencies(&mut self, codes: Vec<String>) {
        let mut targets: Vec<String> = Vec::with_capacity(codes.len());
        for code in codes {
            if code != self.selection.base && self.is_known(&code) && !targets.contains(&code) {
                targets.push(code);
            }
        }

        debug!(targets = ?targets, "Pending target currencies changed");
        self.selection.targets = targets;
    }

    /// Ajoute ou retire une cible (clic dans la liste à sélection multiple)
    pub fn toggle_target_currency(&mut self, code: &str) {
        let mut targets = self.selection.targets.clone();
        if let Some(pos) = targets.iter().position(|c| c == code) {
            targets.remove(pos);
        } else {
            targets.push(code.to_string());
        }
        self.select_target_currencies(targets);
    }

    // ========================================================================
    // Widgets
    // ========================================================================

    pub fn widgets(&self) -> &[CurrencyConfig] {
        &self.widgets
    }

    pub fn session(&self, id: WidgetId) -> Option<&WidgetSession> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: WidgetId) -> Option<&mut WidgetSession> {
        self.sessions.get_mut(&id)
    }

    pub fn edit_state(&self) -> EditState {
        self.edit
    }

    pub fn editing_widget_id(&self) -> Option<WidgetId> {
        self.edit.editing_id()
    }

    /// Libellé du bouton d'action
    pub fn action_label(&self) -> &'static str {
        match self.edit {
            EditState::Idle => "Add Widget",
            EditState::Editing(_) => "Update Widget",
        }
    }

    /// Clic sur un widget : entre en édition ou l'annule (voir EditState)
    pub fn begin_or_toggle_edit(&mut self, id: WidgetId) {
        let next = self.edit.on_widget_clicked(id);

        match next {
            EditState::Editing(id) => {
                let Some(config) = self.widgets.iter().find(|w| w.id == id) else {
                    warn!(widget = %id, "Cannot edit unknown widget");
                    return;
                };
                self.selection = PendingSelection {
                    base: config.base_currency.clone(),
                    targets: config.target_currencies.clone(),
                };
                info!(widget = %id, "Editing widget");
            }
            EditState::Idle => {
                info!(clicked = %id, "Edit cancelled");
            }
        }

        self.edit = next;
    }

    /// Ajoute un widget (Idle) ou applique la sélection au widget édité
    ///
    /// Retourne l'id du widget créé ou modifié, None si rien n'a été fait
    pub fn add_or_update_widget(&mut self) -> Option<WidgetId> {
        if !self.is_known(&self.selection.base) {
            warn!(base = %self.selection.base, "No valid base currency selected");
            return None;
        }

        let base = self.selection.base.clone();
        let targets = self.selection.targets.clone();

        match self.edit {
            EditState::Idle => {
                let id = WidgetId(self.next_id);
                self.next_id += 1;

                let config = CurrencyConfig::new(id, base, targets);
                info!(
                    widget = %id,
                    base = %config.base_currency,
                    targets = ?config.target_currencies,
                    "Adding widget"
                );
                self.mount(config.clone());
                self.widgets.push(config);
                Some(id)
            }
            EditState::Editing(id) => {
                self.edit = EditState::Idle;

                let Some(config) = self.widgets.iter_mut().find(|w| w.id == id) else {
                    warn!(widget = %id, "Edited widget no longer exists");
                    return None;
                };

                let changed = !config.same_pair(&base, &targets);
                config.base_currency = base;
                config.target_currencies = targets;
                info!(widget = %id, changed, "Widget updated");

                // Nouvelle paire = nouvelle session (nouveaux taux, timer annulé)
                if changed {
                    let config = config.clone();
                    self.mount(config);
                }
                Some(id)
            }
        }
    }

    /// Supprime un widget ; s'il était en édition, retour à Idle
    pub fn remove_widget(&mut self, id: WidgetId) -> bool {
        if self.edit == EditState::Editing(id) {
            self.edit = EditState::Idle;
        }

        let before = self.widgets.len();
        self.widgets.retain(|w| w.id != id);
        self.sessions.remove(&id);

        let removed = self.widgets.len() != before;
        if removed {
            info!(widget = %id, "Widget removed");
            self.selected_widget = self
                .selected_widget
                .min(self.widgets.len().saturating_sub(1));
        }
        removed
    }

    /// Route le résultat d'un chargement vers sa session
    ///
    /// Un résultat destiné à une session démontée est ignoré
    pub fn apply_outcome(&mut self, outcome: RateOutcome) {
        match self.sessions.get_mut(&outcome.widget) {
            Some(session) if session.id() == outcome.session => session.apply(outcome.result),
            _ => debug!(widget = %outcome.widget, "Discarding outcome for unmounted session"),
        }
    }

    /// Monte (ou remonte) la session d'un widget
    fn mount(&mut self, config: CurrencyConfig) {
        let id = config.id;
        let session = WidgetSession::mount(
            config,
            self.service.clone(),
            self.outcomes.clone(),
            self.refresh_interval,
        );
        // L'ancienne session éventuelle est droppée ici (timer annulé)
        self.sessions.insert(id, session);
    }

    // ========================================================================
    // Navigation et actions clavier
    // ========================================================================

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    pub fn request_delete(&mut self) {
        self.confirm_delete = true;
    }

    pub fn cancel_delete(&mut self) {
        self.confirm_delete = false;
    }

    pub fn is_awaiting_delete_confirmation(&self) -> bool {
        self.confirm_delete
    }

    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    /// Widget sous le curseur de la grille
    pub fn selected_widget_id(&self) -> Option<WidgetId> {
        self.widgets.get(self.selected_widget).map(|w| w.id)
    }

    /// Navigue vers le haut dans la zone active
    ///
    /// CONCEPT RUST : Saturating arithmetic
    /// - saturating_sub() : soustrait mais ne descend pas en dessous de 0
    pub fn navigate_up(&mut self) {
        match self.focus {
            Focus::BaseSelector => self.base_cursor = self.base_cursor.saturating_sub(1),
            Focus::TargetSelector => self.target_cursor = self.target_cursor.saturating_sub(1),
            Focus::Widgets => self.selected_widget = self.selected_widget.saturating_sub(1),
        }
    }

    /// Navigue vers le bas dans la zone active
    pub fn navigate_down(&mut self) {
        match self.focus {
            Focus::BaseSelector => {
                let max = self.available.len().saturating_sub(1);
                self.base_cursor = (self.base_cursor + 1).min(max);
            }
            Focus::TargetSelector => {
                let max = self.target_candidates().len().saturating_sub(1);
                self.target_cursor = (self.target_cursor + 1).min(max);
            }
            Focus::Widgets => {
                let max = self.widgets.len().saturating_sub(1);
                self.selected_widget = (self.selected_widget + 1).min(max);
            }
        }
    }

    /// Entrée / Espace sur la zone active
    ///
    /// - Base : choisit la devise sous le curseur
    /// - Cibles : coche/décoche la devise sous le curseur
    /// - Widgets : "clic" sur le widget (édition)
    pub fn activate(&mut self) {
        match self.focus {
            Focus::BaseSelector => {
                if let Some(code) = self.available.get(self.base_cursor).map(|c| c.code.clone()) {
                    self.select_base_currency(&code);
                    // La liste des cibles a changé de taille
                    let max = self.target_candidates().len().saturating_sub(1);
                    self.target_cursor = self.target_cursor.min(max);
                }
            }
            Focus::TargetSelector => {
                let code = self
                    .target_candidates()
                    .get(self.target_cursor)
                    .map(|c| c.code.clone());
                if let Some(code) = code {
                    self.toggle_target_currency(&code);
                }
            }
            Focus::Widgets => {
                if let Some(id) = self.selected_widget_id() {
                    self.begin_or_toggle_edit(id);
                }
            }
        }
    }

    /// Supprime le widget sélectionné (après confirmation)
    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selected_widget_id() {
            self.remove_widget(id);
        }
        self.confirm_delete = false;
    }

    /// Bascule le mode temps réel du widget sélectionné
    pub fn toggle_selected_real_time(&mut self) {
        if let Some(session) = self.selected_widget_id().and_then(|id| self.sessions.get_mut(&id)) {
            session.toggle_real_time();
        }
    }

    /// Relance manuellement le chargement du widget sélectionné
    pub fn refresh_selected(&mut self) {
        if let Some(session) = self.selected_widget_id().and_then(|id| self.sessions.get(&id)) {
            session.refresh_rates();
        }
    }

    // ========================================================================
    // Saisie du montant
    // ========================================================================

    /// Entre en saisie du montant du widget sélectionné (pré-rempli)
    pub fn start_amount_input(&mut self) {
        let Some(id) = self.selected_widget_id() else {
            return;
        };
        self.input_buffer = self
            .sessions
            .get(&id)
            .map(|s| s.amount().to_string())
            .unwrap_or_default();
        self.current_screen = Screen::AmountInput;
    }

    pub fn cancel_input(&mut self) {
        self.current_screen = Screen::Dashboard;
        self.input_buffer.clear();
    }

    /// Valide la saisie : le texte brut est transmis tel quel à la session
    pub fn submit_amount_input(&mut self) {
        let text = std::mem::take(&mut self.input_buffer);
        self.current_screen = Screen::Dashboard;

        let Some(id) = self.selected_widget_id() else {
            return;
        };
        if let Some(session) = self.session_mut(id) {
            debug!(widget = %id, amount = %text, "Amount changed");
            session.set_amount(text);
        }
    }

    pub fn append_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn is_in_input_mode(&self) -> bool {
        self.current_screen == Screen::AmountInput
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
