//! Product review rating.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Aggregate review score for a product on a 0–5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rating {
    /// Average score, 0–5.
    pub rate: Decimal,
    /// Number of reviews behind the average.
    pub count: u32,
}

impl Rating {
    /// Create a rating, clamping the score into the 0–5 scale.
    #[must_use]
    pub fn new(rate: Decimal, count: u32) -> Self {
        let max = Decimal::from(5_u8);
        let rate = rate.clamp(Decimal::ZERO, max);
        Self { rate, count }
    }

    /// Whether any reviews exist.
    #[must_use]
    pub const fn has_reviews(&self) -> bool {
        self.count > 0
    }

    /// Whole-star count for display, 0–5.
    #[must_use]
    pub fn rounded_stars(&self) -> u8 {
        self.rate.round().to_u8().unwrap_or(0).min(5)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_out_of_scale() {
        assert_eq!(Rating::new(Decimal::from(9_u8), 3).rate, Decimal::from(5_u8));
        assert_eq!(Rating::new(Decimal::from(-1), 3).rate, Decimal::ZERO);
    }

    #[test]
    fn test_rounded_stars() {
        assert_eq!(Rating::new(Decimal::new(45, 1), 10).rounded_stars(), 5);
        assert_eq!(Rating::new(Decimal::new(44, 1), 10).rounded_stars(), 4);
        assert_eq!(Rating::default().rounded_stars(), 0);
    }

    #[test]
    fn test_default_has_no_reviews() {
        assert!(!Rating::default().has_reviews());
        assert!(Rating::new(Decimal::from(4_u8), 1).has_reviews());
    }
}
