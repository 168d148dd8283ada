// ============================================================================
// Configuration
// ============================================================================
// Lit la configuration depuis les variables d'environnement
// (et un fichier .env optionnel à la racine du projet)
//
//   FXDASH_API_KEY       clé de l'API apilayer (header "apikey")
//   FXDASH_BASE_URL      URL de base de l'API exchangerates_data
//   FXDASH_REFRESH_SECS  intervalle du mode temps réel (60 par défaut)
//   FXDASH_TIMEOUT_SECS  timeout des requêtes HTTP (10 par défaut)
// ============================================================================

use std::time::Duration;

use tracing::{debug, warn};

pub const API_KEY_ENV_VAR: &str = "FXDASH_API_KEY";
pub const BASE_URL_ENV_VAR: &str = "FXDASH_BASE_URL";
pub const REFRESH_SECS_ENV_VAR: &str = "FXDASH_REFRESH_SECS";
pub const TIMEOUT_SECS_ENV_VAR: &str = "FXDASH_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://api.apilayer.com/exchangerates_data";
pub const DEFAULT_REFRESH_SECS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration de l'application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Clé API envoyée dans le header "apikey" (vide = pas de clé)
    pub api_key: String,

    /// URL de base, sans slash final
    pub base_url: String,

    /// Période du rafraîchissement automatique (mode temps réel)
    pub refresh_interval: Duration,

    /// Timeout de chaque requête HTTP
    pub request_timeout: Duration,
}

impl Config {
    /// Charge la configuration depuis l'environnement
    ///
    /// Le fichier .env est optionnel : s'il est absent on continue
    /// avec les variables déjà présentes dans l'environnement.
    pub fn from_env() -> Self {
        if dotenv::dotenv().is_ok() {
            debug!("Loaded .env file");
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construit la configuration à partir d'une fonction de lookup
    ///
    /// CONCEPT RUST : Closure générique (impl Fn)
    /// - Permet de tester sans toucher aux vraies variables d'environnement
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = lookup(API_KEY_ENV_VAR).unwrap_or_default();
        if api_key.is_empty() {
            warn!(var = API_KEY_ENV_VAR, "No API key configured, requests will likely be rejected");
        }

        let base_url = lookup(BASE_URL_ENV_VAR)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let refresh_secs = parse_secs(&lookup, REFRESH_SECS_ENV_VAR, DEFAULT_REFRESH_SECS);
        let timeout_secs = parse_secs(&lookup, TIMEOUT_SECS_ENV_VAR, DEFAULT_TIMEOUT_SECS);

        Self {
            api_key,
            base_url,
            refresh_interval: Duration::from_secs(refresh_secs),
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Lit un nombre de secondes strictement positif, sinon la valeur par défaut
fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                warn!(var = key, value = %raw, default, "Invalid duration, using default");
                default
            }
        },
    }
}
