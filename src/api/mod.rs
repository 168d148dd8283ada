// ============================================================================
// Module : api
// ============================================================================
// Client de l'API de taux de change (apilayer "exchangerates_data")
//
// CONCEPT RUST : Trait comme point d'extension
// - Le dashboard et les widgets ne connaissent que le trait RateService
// - ExchangeRatesClient l'implémente avec reqwest
// - Les tests l'implémentent avec un faux service (pas de réseau)
// ============================================================================

use anyhow::Result;
use async_trait::async_trait;

pub mod exchange_rates; // Client HTTP exchangerates_data

#[cfg(test)]
pub(crate) mod fake; // Faux service scriptable pour les tests

// Re-export des types principaux
pub use exchange_rates::{ExchangeRatesClient, LatestRatesResponse, SymbolsResponse};

/// Service distant de taux de change
///
/// CONCEPT RUST : #[async_trait]
/// - Les méthodes async dans un trait utilisé en `dyn` passent par async-trait
/// - Send + Sync : le service est partagé (Arc) entre les tâches tokio
#[async_trait]
pub trait RateService: Send + Sync {
    /// Liste des devises connues (code → nom), dans l'ordre de l'API
    async fn list_symbols(&self) -> Result<SymbolsResponse>;

    /// Derniers taux de `base` vers chacune des `targets`
    async fn latest_rates(&self, base: &str, targets: &[String]) -> Result<LatestRatesResponse>;
}
