// ============================================================================
// API Client : Exchange Rates Data (apilayer)
// ============================================================================
// Récupère la liste des devises et les derniers taux de change
//
// Endpoints :
// - GET {base_url}/symbols
// - GET {base_url}/latest?symbols=USD%2CJPY&base=EUR
//
// CONCEPTS RUST :
// 1. async/await : programmation asynchrone (non-bloquante)
// 2. Result<T, E> : gestion d'erreurs avec contexte (anyhow)
// 3. Serde : désérialisation JSON automatique
// ============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use hashlink::LinkedHashMap;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

use super::RateService;
use crate::config::Config;
use crate::models::Rates;

// ============================================================================
// Structures pour parser les réponses JSON
// ============================================================================
// CONCEPT : LinkedHashMap plutôt que HashMap
// - L'API renvoie les devises dans un ordre précis (alphabétique)
// - LinkedHashMap conserve cet ordre, HashMap le mélangerait
// ============================================================================

/// Réponse de /symbols
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolsResponse {
    #[serde(default)]
    pub success: bool,

    /// Code → nom complet (ex: "AED" → "United Arab Emirates Dirham")
    #[serde(default)]
    pub symbols: LinkedHashMap<String, String>,

    #[serde(default)]
    pub(crate) error: Option<ApiErrorBody>,
}

/// Réponse de /latest
#[derive(Debug, Clone, Deserialize)]
pub struct LatestRatesResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub base: String,

    #[serde(default)]
    pub date: String,

    /// Code → taux (1 base = taux cible)
    #[serde(default)]
    pub rates: Rates,

    #[serde(default)]
    pub(crate) error: Option<ApiErrorBody>,
}

/// Corps d'erreur renvoyé avec "success": false (quota, clé invalide...)
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    info: Option<String>,
}

impl ApiErrorBody {
    fn describe(error: &Option<ApiErrorBody>) -> String {
        match error {
            Some(body) => format!(
                "code {} : {}",
                body.code
                    .as_ref()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                body.info.as_deref().unwrap_or("sans détail")
            ),
            None => "sans détail".to_string(),
        }
    }
}

// ============================================================================
// Client HTTP
// ============================================================================

/// Client de l'API exchangerates_data
///
/// CONCEPT : Un seul reqwest::Client réutilisé
/// - Le client garde un pool de connexions
/// - Le header "apikey" est ajouté une fois pour toutes
pub struct ExchangeRatesClient {
    client: reqwest::Client,
    base_url: String,
}

impl ExchangeRatesClient {
    /// Crée le client à partir de la configuration
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if !config.api_key.is_empty() {
            let value = HeaderValue::from_str(&config.api_key)
                .context("Clé API invalide (caractères non autorisés dans un header)")?;
            headers.insert("apikey", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// GET + vérification du statut HTTP + parsing JSON
    ///
    /// CONCEPT RUST : Fonction générique avec borne de trait
    /// - T: DeserializeOwned : n'importe quel type désérialisable
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "Sending HTTP request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Échec de la requête HTTP vers l'API de taux")?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        // Vérifie que la réponse est un succès HTTP (200-299)
        if !status.is_success() {
            error!(status = %status, "Exchange rates API returned error status");
            anyhow::bail!("L'API de taux a retourné une erreur : HTTP {}", status);
        }

        response
            .json::<T>()
            .await
            .context("Échec du parsing JSON de la réponse")
    }
}

#[async_trait]
impl RateService for ExchangeRatesClient {
    #[instrument(skip(self))]
    async fn list_symbols(&self) -> Result<SymbolsResponse> {
        let url = build_symbols_url(&self.base_url);
        let response: SymbolsResponse = self.get_json(&url).await?;

        if !response.success {
            anyhow::bail!(
                "L'API a refusé la liste des devises ({})",
                ApiErrorBody::describe(&response.error)
            );
        }

        info!(count = response.symbols.len(), "Fetched currency symbols");
        Ok(response)
    }

    #[instrument(skip(self, targets), fields(targets = %targets.join(",")))]
    async fn latest_rates(&self, base: &str, targets: &[String]) -> Result<LatestRatesResponse> {
        let url = build_latest_url(&self.base_url, base, targets);
        let response: LatestRatesResponse = self.get_json(&url).await?;

        if !response.success {
            anyhow::bail!(
                "L'API a refusé les taux pour {} ({})",
                base,
                ApiErrorBody::describe(&response.error)
            );
        }

        info!(rates = response.rates.len(), date = %response.date, "Fetched latest rates");
        Ok(response)
    }
}

/// URL de la liste des devises
fn build_symbols_url(base_url: &str) -> String {
    format!("{}/symbols", base_url)
}

/// URL des derniers taux
///
/// Les cibles sont jointes par une virgule encodée (%2C), dans l'ordre donné
fn build_latest_url(base_url: &str, base: &str, targets: &[String]) -> String {
    format!(
        "{}/latest?symbols={}&base={}",
        base_url,
        targets.join("%2C"),
        base
    )
}

// ============================================================================
// Tests unitaires
// ============================================================================
