// ============================================================================
// Structure : WidgetSession
// ============================================================================
// État vivant d'un widget : taux reçus, montant saisi, mode temps réel
//
// CONCEPTS RUST :
// 1. Tâches tokio : chaque requête tourne dans sa propre tâche
// 2. Channels (mpsc) : les tâches renvoient leur résultat à la boucle
//    d'événements, seule autorisée à modifier l'état
// 3. RAII : le timer de rafraîchissement est annulé dans Drop
//
// Cycle de vie :
// - mount() : création + premier chargement des taux
// - set_real_time(true) : un rafraîchissement toutes les 60 s
// - set_real_time(false) ou drop : le timer est annulé immédiatement
//
// Ordre des réponses : la dernière réponse arrivée gagne, même si elle
// correspond à une requête plus ancienne (pas de numérotation des requêtes).
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::api::{LatestRatesResponse, RateService};
use crate::error::DashboardError;
use crate::models::{Conversion, CurrencyConfig, RateSnapshot, WidgetId};

/// Identifiant d'une session (change à chaque remontage du widget)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Résultat d'un chargement de taux, renvoyé à la boucle d'événements
#[derive(Debug)]
pub struct RateOutcome {
    pub session: SessionId,
    pub widget: WidgetId,
    pub result: Result<LatestRatesResponse, DashboardError>,
}

/// Côté émetteur du channel des résultats
pub type OutcomeSender = mpsc::UnboundedSender<RateOutcome>;

/// Côté récepteur, lu par la boucle d'événements
pub type OutcomeReceiver = mpsc::UnboundedReceiver<RateOutcome>;

/// Session d'un widget
pub struct WidgetSession {
    id: SessionId,
    config: CurrencyConfig,
    snapshot: RateSnapshot,

    /// Texte brut saisi (interprété seulement à l'affichage)
    amount: String,

    /// Mode temps réel actif
    real_time: bool,

    /// Timer du mode temps réel (Some uniquement si real_time)
    poller: Option<JoinHandle<()>>,

    refresh_interval: Duration,
    last_updated: Option<DateTime<Local>>,

    service: Arc<dyn RateService>,
    outcomes: OutcomeSender,
}

impl WidgetSession {
    /// Crée la session et lance le premier chargement des taux
    ///
    /// Doit être appelé depuis un contexte tokio (tokio::spawn)
    pub fn mount(
        config: CurrencyConfig,
        service: Arc<dyn RateService>,
        outcomes: OutcomeSender,
        refresh_interval: Duration,
    ) -> Self {
        let session = Self {
            id: SessionId::next(),
            config,
            snapshot: RateSnapshot::default(),
            amount: String::new(),
            real_time: false,
            poller: None,
            refresh_interval,
            last_updated: None,
            service,
            outcomes,
        };

        info!(
            widget = %session.config.id,
            session = ?session.id,
            base = %session.config.base_currency,
            "Widget session mounted"
        );
        session.refresh_rates();
        session
    }

    /// Lance un chargement des taux en arrière-plan
    ///
    /// Le résultat arrive plus tard via le channel (RateOutcome)
    pub fn refresh_rates(&self) {
        debug!(widget = %self.config.id, session = ?self.id, "Refreshing rates");
        tokio::spawn(fetch_rates(
            self.service.clone(),
            self.id,
            self.config.clone(),
            self.outcomes.clone(),
        ));
    }

    /// Applique le résultat d'un chargement
    ///
    /// - Succès : remplace tous les taux, efface l'erreur
    /// - Échec : garde les anciens taux, active l'erreur
    pub fn apply(&mut self, result: Result<LatestRatesResponse, DashboardError>) {
        match result {
            Ok(response) => {
                debug!(
                    widget = %self.config.id,
                    rates = response.rates.len(),
                    "Applying fetched rates"
                );
                let date = Some(response.date).filter(|d| !d.is_empty());
                self.snapshot.replace(response.rates, date);
                self.last_updated = Some(Local::now());
            }
            Err(err) => {
                debug!(widget = %self.config.id, error = %err, "Applying fetch failure");
                self.snapshot.fail(err);
            }
        }
    }

    /// Active ou désactive le rafraîchissement automatique
    ///
    /// CONCEPT : Un seul JoinHandle par session
    /// - Activer deux fois ne crée pas un second timer
    /// - Désactiver annule la tâche (abort), aucun tick ne suit
    pub fn set_real_time(&mut self, enabled: bool) {
        if enabled == self.real_time {
            return;
        }
        self.real_time = enabled;

        if enabled {
            info!(
                widget = %self.config.id,
                every = ?self.refresh_interval,
                "Real-time mode enabled"
            );
            self.poller = Some(tokio::spawn(poll_rates(
                self.service.clone(),
                self.id,
                self.config.clone(),
                self.outcomes.clone(),
                self.refresh_interval,
            )));
        } else {
            info!(widget = %self.config.id, "Real-time mode disabled");
            self.stop_polling();
        }
    }

    pub fn toggle_real_time(&mut self) {
        self.set_real_time(!self.real_time);
    }

    /// Enregistre le montant saisi, sans déclencher de chargement
    pub fn set_amount(&mut self, text: impl Into<String>) {
        self.amount = text.into();
    }

    /// Conversions à afficher, ou l'erreur si le dernier chargement a échoué
    pub fn compute_display(&self) -> Result<Vec<Conversion>, DashboardError> {
        self.snapshot
            .conversions(&self.config.base_currency, &self.amount)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &CurrencyConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &RateSnapshot {
        &self.snapshot
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn is_real_time(&self) -> bool {
        self.real_time
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
    }
}

/// Démontage : plus aucun tick après la suppression du widget
impl Drop for WidgetSession {
    fn drop(&mut self) {
        self.stop_polling();
        debug!(widget = %self.config.id, session = ?self.id, "Widget session unmounted");
    }
}

// ============================================================================
// Tâches de fond
// ============================================================================

/// Charge les taux et envoie le résultat à la boucle d'événements
///
/// Les erreurs réseau/HTTP sont loguées et converties en RatesFetchFailed,
/// elles ne remontent jamais plus haut.
async fn fetch_rates(
    service: Arc<dyn RateService>,
    session: SessionId,
    config: CurrencyConfig,
    outcomes: OutcomeSender,
) {
    let result = service
        .latest_rates(&config.base_currency, &config.target_currencies)
        .await
        .map_err(|e| {
            error!(
                widget = %config.id,
                base = %config.base_currency,
                error = ?e,
                "Failed to fetch rates"
            );
            DashboardError::RatesFetchFailed(format!("{:#}", e))
        });

    // Le récepteur peut avoir disparu (fermeture de l'application)
    if outcomes
        .send(RateOutcome {
            session,
            widget: config.id,
            result,
        })
        .is_err()
    {
        debug!(widget = %config.id, "Outcome channel closed, dropping result");
    }
}

/// Boucle du mode temps réel : un chargement à chaque période
///
/// Premier tick une période après l'activation. Chaque tick lance son
/// propre chargement, un chargement lent ne retarde pas le suivant.
async fn poll_rates(
    service: Arc<dyn RateService>,
    session: SessionId,
    config: CurrencyConfig,
    outcomes: OutcomeSender,
    period: Duration,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        debug!(widget = %config.id, "Real-time tick");
        tokio::spawn(fetch_rates(
            service.clone(),
            session,
            config.clone(),
            outcomes.clone(),
        ));
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{rates, FakeRateService};

    const PERIOD: Duration = Duration::from_secs(60);

    fn config() -> CurrencyConfig {
        CurrencyConfig::new(
            WidgetId(1),
            "EUR".to_string(),
            vec!["USD".to_string(), "JPY".to_string()],
        )
    }

    fn mount(service: &Arc<FakeRateService>) -> (WidgetSession, OutcomeReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = WidgetSession::mount(config(), service.clone(), tx, PERIOD);
        (session, rx)
    }

    /// Laisse tourner les tâches déjà prêtes
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn display(session: &WidgetSession) -> Vec<String> {
        session
            .compute_display()
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_mount_fetches_once() {
        let service = Arc::new(FakeRateService::new());
        service.set_rates(&[("USD", 0.731331), ("JPY", 114.25988)]);

        let (mut session, mut rx) = mount(&service);
        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.session, session.id());
        session.apply(outcome.result);

        assert_eq!(
            service.calls(),
            vec![("EUR".to_string(), vec!["USD".to_string(), "JPY".to_string()])]
        );
        assert_eq!(
            display(&session),
            vec!["USD: 0.73 per 1 EUR", "JPY: 114.26 per 1 EUR"]
        );
        assert!(session.last_updated().is_some());
        assert_eq!(session.snapshot().date.as_deref(), Some("2024-01-15"));
    }

    #[tokio::test]
    async fn test_amount_does_not_refresh() {
        let service = Arc::new(FakeRateService::new());
        service.set_rates(&[("USD", 0.731331)]);

        let (mut session, mut rx) = mount(&service);
        let outcome = rx.recv().await.unwrap();
        session.apply(outcome.result);

        session.set_amount("2");
        settle().await;

        assert_eq!(service.call_count(), 1);
        assert_eq!(session.amount(), "2");
        assert_eq!(display(&session), vec!["USD: 1.46 per 2 EUR"]);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_rates_hidden() {
        let service = Arc::new(FakeRateService::new());
        service.set_rates(&[("USD", 0.731331)]);

        let (mut session, mut rx) = mount(&service);
        session.apply(rx.recv().await.unwrap().result);

        service.set_failure("HTTP 500");
        session.refresh_rates();
        session.apply(rx.recv().await.unwrap().result);

        let err = session.compute_display().unwrap_err();
        assert!(matches!(err, DashboardError::RatesFetchFailed(_)));
        assert_eq!(err.user_message(), "Failed to fetch data");
        // Les taux précédents sont toujours là, juste masqués
        assert_eq!(session.snapshot().rates.get("USD"), Some(&0.731331));
    }

    #[tokio::test]
    async fn test_last_completion_wins() {
        let service = Arc::new(FakeRateService::new());
        let first = service.hold_next();
        let second = service.hold_next();

        // Requête 1 (montage) puis requête 2 (rafraîchissement manuel)
        let (mut session, mut rx) = mount(&service);
        session.refresh_rates();
        settle().await;
        assert_eq!(service.call_count(), 2);

        // La requête 2 répond d'abord, la 1 ensuite
        second.send(Ok(rates(&[("USD", 2.0)]))).unwrap();
        session.apply(rx.recv().await.unwrap().result);
        first.send(Ok(rates(&[("USD", 1.0)]))).unwrap();
        session.apply(rx.recv().await.unwrap().result);

        // La réponse arrivée en dernier écrase la précédente
        assert_eq!(display(&session), vec!["USD: 1.00 per 1 EUR"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_time_polls_every_period() {
        let service = Arc::new(FakeRateService::new());
        service.set_rates(&[("USD", 0.731331)]);

        let (mut session, mut rx) = mount(&service);
        rx.recv().await.unwrap();
        let start = Instant::now();

        session.set_real_time(true);
        assert!(session.is_real_time());

        // Le temps avance automatiquement jusqu'au prochain tick
        rx.recv().await.unwrap();
        assert!(start.elapsed() >= PERIOD);
        rx.recv().await.unwrap();
        assert!(start.elapsed() >= PERIOD * 2);
        assert_eq!(service.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_real_time_stops_polling() {
        let service = Arc::new(FakeRateService::new());
        service.set_rates(&[("USD", 0.731331)]);

        let (mut session, mut rx) = mount(&service);
        rx.recv().await.unwrap();

        session.set_real_time(true);
        rx.recv().await.unwrap();
        assert_eq!(service.call_count(), 2);

        session.set_real_time(false);
        tokio::time::sleep(PERIOD * 3).await;
        settle().await;

        assert_eq!(service.call_count(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabling_twice_keeps_one_timer() {
        let service = Arc::new(FakeRateService::new());

        let (mut session, mut rx) = mount(&service);
        rx.recv().await.unwrap();

        session.set_real_time(true);
        session.set_real_time(true);
        tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(service.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let service = Arc::new(FakeRateService::new());

        let (mut session, mut rx) = mount(&service);
        rx.recv().await.unwrap();
        session.toggle_real_time();
        drop(session);

        tokio::time::sleep(PERIOD * 3).await;
        settle().await;

        assert_eq!(service.call_count(), 1);
    }
}
