// ============================================================================
// FxDash - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;     // Client de l'API de taux de change
pub mod app;     // État du dashboard (widgets, sélection, édition)
pub mod config;  // Configuration (variables d'environnement / .env)
pub mod error;   // Erreurs du domaine
pub mod models;  // Structures de données
pub mod session; // Session vivante d'un widget (taux, temps réel)
pub mod ui;      // Interface utilisateur
