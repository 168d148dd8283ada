// ============================================================================
// Structure : CurrencyConfig
// ============================================================================
// Configuration d'un widget : une devise de base convertie vers
// plusieurs devises cibles
//
// CONCEPTS RUST :
// 1. Newtype pattern : WidgetId enveloppe un u64 (impossible de confondre
//    un identifiant de widget avec un simple nombre)
// 2. Derive : Copy/Eq/Hash pour utiliser WidgetId comme clé de HashMap
// ============================================================================

use std::fmt;

/// Identifiant unique et stable d'un widget
///
/// CONCEPT RUST : Newtype pattern
/// - struct WidgetId(u64) : type distinct, zéro coût à l'exécution
/// - Les ids ne sont jamais réutilisés (compteur monotone dans le dashboard)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub u64);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Configuration d'un widget de conversion
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyConfig {
    /// Identifiant stable pendant toute la vie du widget
    pub id: WidgetId,

    /// Devise de base (ex: "EUR")
    pub base_currency: String,

    /// Devises cibles, dans l'ordre choisi (peut être vide)
    pub target_currencies: Vec<String>,
}

impl CurrencyConfig {
    pub fn new(id: WidgetId, base_currency: String, target_currencies: Vec<String>) -> Self {
        Self {
            id,
            base_currency,
            target_currencies,
        }
    }

    /// Vrai si base et cibles sont identiques à celles d'une autre config
    ///
    /// Utilisé pour savoir si une mise à jour doit remonter la session
    /// (nouvelle base ou nouvelles cibles = nouveaux taux à charger)
    pub fn same_pair(&self, base: &str, targets: &[String]) -> bool {
        self.base_currency == base && self.target_currencies == targets
    }
}

/// Une devise connue, telle que retournée par l'API (code + nom)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    /// Code ISO 4217 sur 3 lettres (ex: "JPY")
    pub code: String,

    /// Nom affiché (ex: "Japanese Yen")
    pub name: String,
}

impl Currency {
    pub fn new(code: String, name: String) -> Self {
        Self { code, name }
    }
}

/// Sélection en attente dans les contrôles (pas encore appliquée à un widget)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSelection {
    pub base: String,
    pub targets: Vec<String>,
}

impl PendingSelection {
    /// Retire la devise de base des cibles (on ne convertit pas EUR → EUR)
    pub fn strip_base_from_targets(&mut self) {
        let base = self.base.clone();
        self.targets.retain(|code| *code != base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_id_display() {
        assert_eq!(WidgetId(42).to_string(), "#42");
    }

    #[test]
    fn test_same_pair() {
        let config = CurrencyConfig::new(
            WidgetId(1),
            "EUR".to_string(),
            vec!["USD".to_string(), "JPY".to_string()],
        );

        assert!(config.same_pair("EUR", &["USD".to_string(), "JPY".to_string()]));
        // L'ordre des cibles compte
        assert!(!config.same_pair("EUR", &["JPY".to_string(), "USD".to_string()]));
        assert!(!config.same_pair("GBP", &["USD".to_string(), "JPY".to_string()]));
    }

    #[test]
    fn test_strip_base_from_targets() {
        let mut selection = PendingSelection {
            base: "USD".to_string(),
            targets: vec!["EUR".to_string(), "USD".to_string(), "JPY".to_string()],
        };

        selection.strip_base_from_targets();
        assert_eq!(selection.targets, vec!["EUR".to_string(), "JPY".to_string()]);
    }
}
