/// Fixed bookmaker margin subtracted from confidence before inverting
pub const BOOKMAKER_MARGIN: f64 = 0.10;
/// Implied probability floor; caps quoted odds at 10.0
pub const MIN_IMPLIED_PROBABILITY: f64 = 0.10;
/// Implied probability ceiling; odds never drop below ~1.11
pub const MAX_IMPLIED_PROBABILITY: f64 = 0.90;

/// Convert a 0-1 confidence into quoted decimal odds.
///
/// odds = 1 / clamp(confidence - margin, 0.10, 0.90), rounded to 2 decimals.
pub fn calculate_odds(confidence: f64) -> f64 {
    calculate_odds_with_margin(confidence, BOOKMAKER_MARGIN)
}

pub fn calculate_odds_with_margin(confidence: f64, margin: f64) -> f64 {
    let implied = (confidence - margin).clamp(MIN_IMPLIED_PROBABILITY, MAX_IMPLIED_PROBABILITY);
    round_to(1.0 / implied, 2)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_odds() {
        assert_eq!(calculate_odds(0.75), 1.54);
        assert_eq!(calculate_odds(0.60), 2.0);
        assert_eq!(calculate_odds(0.55), 2.22);
    }

    #[test]
    fn test_odds_are_clamped() {
        // Below the floor: 1 / 0.10
        assert_eq!(calculate_odds(0.05), 10.0);
        assert_eq!(calculate_odds(0.0), 10.0);
        // Above the ceiling: 1 / 0.90
        assert_eq!(calculate_odds(1.0), 1.11);
        assert_eq!(calculate_odds(0.99), 1.12);
    }
}
