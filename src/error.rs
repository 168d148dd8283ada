// ============================================================================
// Erreurs du domaine
// ============================================================================
// Deux seules sortes d'erreurs visibles par l'utilisateur :
// - SymbolsFetchFailed : la liste des devises n'a pas pu être chargée
//   (les sélecteurs restent vides, le dashboard s'affiche quand même)
// - RatesFetchFailed : un widget n'a pas pu rafraîchir ses taux
//   (seul ce widget affiche un message d'erreur)
//
// Ces erreurs ne sont jamais propagées hors de la boucle d'événements :
// elles sont loguées puis stockées comme état "dégradé".
// ============================================================================

use thiserror::Error;

/// Erreurs dégradées du dashboard
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    /// Échec du chargement de la liste des devises
    #[error("Failed to fetch symbols: {0}")]
    SymbolsFetchFailed(String),

    /// Échec du chargement des taux d'un widget
    #[error("Failed to fetch data: {0}")]
    RatesFetchFailed(String),
}

impl DashboardError {
    /// Message court affiché dans le widget
    ///
    /// Le détail technique reste dans les logs, l'utilisateur voit
    /// toujours le même message générique.
    pub fn user_message(&self) -> &'static str {
        match self {
            DashboardError::SymbolsFetchFailed(_) => "Failed to fetch symbols",
            DashboardError::RatesFetchFailed(_) => "Failed to fetch data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_details() {
        let err = DashboardError::RatesFetchFailed("HTTP 500".to_string());
        assert_eq!(err.user_message(), "Failed to fetch data");
        assert_eq!(err.to_string(), "Failed to fetch data: HTTP 500");
    }
}
