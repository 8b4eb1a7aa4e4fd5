use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MoleculeId(pub u64);

impl std::fmt::Display for MoleculeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// The seven scoring components of a drug program.
///
/// Declaration order is the canonical order: it matches the weight ranking
/// and is the tie-break order wherever results are sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Component {
    MarketSize,
    ClinicalDifferentiation,
    CommercialExecution,
    StrategicFit,
    CompetitivePosition,
    MarketAccess,
    PricingPower,
}

impl Component {
    pub const COUNT: usize = 7;

    pub const ALL: [Component; Self::COUNT] = [
        Component::MarketSize,
        Component::ClinicalDifferentiation,
        Component::CommercialExecution,
        Component::StrategicFit,
        Component::CompetitivePosition,
        Component::MarketAccess,
        Component::PricingPower,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Component::MarketSize => "Base Market Size",
            Component::ClinicalDifferentiation => "Clinical Differentiation",
            Component::CommercialExecution => "Commercial Execution",
            Component::StrategicFit => "Strategic Fit",
            Component::CompetitivePosition => "Competitive Position",
            Component::MarketAccess => "Market Access",
            Component::PricingPower => "Pricing Power",
        }
    }

    /// Relative importance as published. These sum to 1.10, not 1.0.
    pub fn relative_weight(self) -> f64 {
        match self {
            Component::MarketSize => 0.25,
            Component::ClinicalDifferentiation => 0.20,
            Component::CommercialExecution => 0.18,
            Component::StrategicFit => 0.15,
            Component::CompetitivePosition => 0.12,
            Component::MarketAccess => 0.10,
            Component::PricingPower => 0.10,
        }
    }

    /// Relative weight normalized by the total, so the seven sum to 1.0.
    pub fn canonical_weight(self) -> f64 {
        let total: f64 = Component::ALL.iter().map(|c| c.relative_weight()).sum();
        self.relative_weight() / total
    }

    /// Position in [`Component::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_weights_sum_to_one() {
        let total: f64 = Component::ALL.iter().map(|c| c.canonical_weight()).sum();
        assert!((total - 1.0).abs() < 1e-12, "weights sum to {total}");
    }

    #[test]
    fn normalization_keeps_relative_proportions() {
        let total: f64 = Component::ALL.iter().map(|c| c.relative_weight()).sum();
        assert!((total - 1.10).abs() < 1e-12);
        assert!((Component::MarketSize.canonical_weight() - 0.25 / 1.10).abs() < 1e-12);
        let ratio = Component::MarketSize.canonical_weight() / Component::PricingPower.canonical_weight();
        assert!((ratio - 2.5).abs() < 1e-12);
    }

    #[test]
    fn index_matches_declaration_order() {
        for (i, c) in Component::ALL.iter().enumerate() {
            assert_eq!(c.index(), i, "{c} out of place");
        }
    }

    #[test]
    fn weights_are_non_increasing_in_canonical_order() {
        let w: Vec<f64> = Component::ALL.iter().map(|c| c.canonical_weight()).collect();
        assert!(w.windows(2).all(|p| p[0] >= p[1]), "weights out of order: {w:?}");
    }
}
