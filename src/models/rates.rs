// ============================================================================
// Structure : RateSnapshot
// ============================================================================
// Dernier jeu de taux reçu par un widget + état d'erreur éventuel
//
// Règles :
// - Un succès remplace entièrement la map des taux et efface l'erreur
// - Un échec garde les anciens taux mais active l'erreur (affichage masqué)
//
// CONCEPT : LinkedHashMap (crate hashlink)
// - Comme une HashMap mais conserve l'ordre d'insertion
// - L'affichage suit l'ordre des taux tel que renvoyé par l'API
// ============================================================================

use std::fmt;

use hashlink::LinkedHashMap;

use crate::error::DashboardError;

/// Map ordonnée code devise → taux
pub type Rates = LinkedHashMap<String, f64>;

/// Taux d'un widget, avec l'erreur du dernier rafraîchissement
#[derive(Debug, Clone, Default)]
pub struct RateSnapshot {
    /// Taux par devise cible (ordre = ordre de la réponse)
    pub rates: Rates,

    /// Date des taux annoncée par l'API (ex: "2024-01-15")
    pub date: Option<String>,

    /// Erreur du dernier rafraîchissement (None si OK)
    pub error: Option<DashboardError>,
}

impl RateSnapshot {
    /// Applique une réponse réussie : remplace tout
    pub fn replace(&mut self, rates: Rates, date: Option<String>) {
        self.rates = rates;
        self.date = date;
        self.error = None;
    }

    /// Applique un échec : les taux précédents sont conservés
    pub fn fail(&mut self, error: DashboardError) {
        self.error = Some(error);
    }

    pub fn is_errored(&self) -> bool {
        self.error.is_some()
    }

    /// Calcule les conversions à afficher pour un montant saisi
    ///
    /// CONCEPT RUST : Result comme valeur d'affichage
    /// - Ok(conversions) : une ligne par devise, dans l'ordre des taux
    /// - Err(erreur) : le widget affiche le message d'erreur à la place
    pub fn conversions(
        &self,
        base: &str,
        amount_text: &str,
    ) -> Result<Vec<Conversion>, DashboardError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }

        let amount = parse_amount(amount_text);
        let label = amount_label(amount_text);

        Ok(self
            .rates
            .iter()
            .map(|(code, rate)| Conversion {
                code: code.clone(),
                value: rate * amount,
                amount_label: label.clone(),
                base: base.to_string(),
            })
            .collect())
    }
}

/// Une ligne de conversion affichée dans un widget
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Devise cible
    pub code: String,

    /// Valeur convertie (non arrondie, l'arrondi se fait à l'affichage)
    pub value: f64,

    /// Montant tel qu'affiché ("1" si la saisie est vide ou invalide)
    pub amount_label: String,

    /// Devise de base
    pub base: String,
}

/// Format : "JPY: 114.26 per 1 EUR"
impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} per {} {}",
            self.code,
            to_fixed_2(self.value),
            self.amount_label,
            self.base
        )
    }
}

/// Arrondi à 2 décimales, égalités exactes arrondies en s'éloignant de zéro
///
/// `{:.2}` arrondit les égalités au pair (1.125 → "1.12"), ici on veut "1.13".
///
/// CONCEPT : Une égalité exacte (x = n/100 + 0.005 en binaire) n'existe que
/// si x * 8 est un entier impair. La multiplication par 8 est exacte en f64.
/// 1.005 n'est pas une égalité : il est stocké comme 1.00499...
pub fn to_fixed_2(value: f64) -> String {
    let eighths = value.abs() * 8.0;
    let is_tie = value.is_finite() && eighths.fract() == 0.0 && eighths % 2.0 == 1.0;
    if !is_tie {
        return format!("{:.2}", value);
    }

    // x * 100 = n + 0.5 exactement : on prend n + 1
    let cents = (value.abs() * 100.0).ceil() as u64;
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}

/// Interprète le montant saisi
///
/// Vide ou invalide → 1.0 (jamais d'erreur : "abc" se comporte comme "").
/// NaN et infini sont refusés, même si Rust sait les parser.
pub fn parse_amount(text: &str) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 1.0,
    }
}

/// Montant affiché après "per" : la saisie si elle est valide, sinon "1"
///
/// La saisie est affichée sans ses espaces autour (" 2 " → "2"), elle
/// n'est pas recopiée telle quelle.
pub fn amount_label(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => trimmed.to_string(),
        _ => "1".to_string(),
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
