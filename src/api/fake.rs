// ============================================================================
// Faux RateService pour les tests
// ============================================================================
// - Réponses scriptées (succès / échec) sans réseau
// - Réponses "retenues" : la requête reste en vol jusqu'à ce que le test
//   envoie la réponse, ce qui permet de rejouer des courses entre requêtes
// - Historique des appels pour vérifier qui a demandé quoi
// ============================================================================

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use hashlink::LinkedHashMap;
use tokio::sync::oneshot;

use super::{LatestRatesResponse, RateService, SymbolsResponse};
use crate::models::Rates;

/// Réponse programmée pour un appel à latest_rates
enum Reply {
    Now(Result<Rates, String>),
    Held(oneshot::Receiver<Result<Rates, String>>),
}

pub(crate) struct FakeRateService {
    symbols: Result<Vec<(String, String)>, String>,
    replies: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Result<Rates, String>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeRateService {
    pub(crate) fn new() -> Self {
        Self {
            symbols: Ok(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(Rates::new())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_symbols(mut self, codes: &[&str]) -> Self {
        self.symbols = Ok(codes
            .iter()
            .map(|code| (code.to_string(), format!("{} currency", code)))
            .collect());
        self
    }

    pub(crate) fn with_failing_symbols(mut self) -> Self {
        self.symbols = Err("HTTP 503".to_string());
        self
    }

    /// Réponse utilisée quand aucune réponse n'est programmée
    pub(crate) fn set_rates(&self, pairs: &[(&str, f64)]) {
        *self.fallback.lock().unwrap() = Ok(rates(pairs));
    }

    pub(crate) fn set_failure(&self, message: &str) {
        *self.fallback.lock().unwrap() = Err(message.to_string());
    }

    /// Programme une réponse retenue pour le prochain appel
    pub(crate) fn hold_next(&self) -> oneshot::Sender<Result<Rates, String>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Reply::Held(rx));
        tx
    }

    /// Programme une réponse immédiate pour le prochain appel
    pub(crate) fn reply_next(&self, reply: Result<Rates, String>) {
        self.replies.lock().unwrap().push_back(Reply::Now(reply));
    }

    pub(crate) fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub(crate) fn rates(pairs: &[(&str, f64)]) -> Rates {
    pairs.iter().map(|(code, rate)| (code.to_string(), *rate)).collect()
}

#[async_trait]
impl RateService for FakeRateService {
    async fn list_symbols(&self) -> Result<SymbolsResponse> {
        match &self.symbols {
            Ok(pairs) => {
                let symbols: LinkedHashMap<String, String> = pairs.iter().cloned().collect();
                Ok(SymbolsResponse {
                    success: true,
                    symbols,
                    error: None,
                })
            }
            Err(message) => anyhow::bail!("{}", message),
        }
    }

    async fn latest_rates(&self, base: &str, targets: &[String]) -> Result<LatestRatesResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((base.to_string(), targets.to_vec()));

        // Le verrou est relâché avant tout .await
        let reply = self.replies.lock().unwrap().pop_front();
        let result = match reply {
            Some(Reply::Now(result)) => result,
            Some(Reply::Held(rx)) => rx.await.unwrap_or_else(|_| Err("reply dropped".to_string())),
            None => {
                let fallback = self.fallback.lock().unwrap();
                fallback.clone()
            }
        };

        match result {
            Ok(rates) => Ok(LatestRatesResponse {
                success: true,
                base: base.to_string(),
                date: "2024-01-15".to_string(),
                rates,
                error: None,
            }),
            Err(message) => anyhow::bail!("{}", message),
        }
    }
}
