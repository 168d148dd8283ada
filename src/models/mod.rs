// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
// ============================================================================

pub mod currency_config; // Configuration d'un widget, devises connues, sélection
pub mod rates;           // Taux reçus et conversions affichées

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use fxdash::models::currency_config::CurrencyConfig;
// On peut faire : use fxdash::models::CurrencyConfig;
pub use currency_config::{Currency, CurrencyConfig, PendingSelection, WidgetId};
pub use rates::{amount_label, parse_amount, to_fixed_2, Conversion, RateSnapshot, Rates};
