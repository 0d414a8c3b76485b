//! Factor definitions and raw-value representation.

/// The six ranked factors. Value (P/E, P/B), quality (ROE, D/E), momentum,
/// and low-volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Factor {
    PeRatio,
    PbRatio,
    Roe,
    DebtEquity,
    Momentum,
    LowVolatility,
}

/// Which end of the raw scale is favorable for a factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Factor {
    pub const ALL: [Factor; 6] = [
        Factor::PeRatio,
        Factor::PbRatio,
        Factor::Roe,
        Factor::DebtEquity,
        Factor::Momentum,
        Factor::LowVolatility,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Factor::PeRatio => "pe_ratio",
            Factor::PbRatio => "pb_ratio",
            Factor::Roe => "roe",
            Factor::DebtEquity => "debt_equity",
            Factor::Momentum => "momentum",
            Factor::LowVolatility => "low_volatility",
        }
    }

    pub fn from_name(name: &str) -> Option<Factor> {
        match name {
            "pe_ratio" => Some(Factor::PeRatio),
            "pb_ratio" => Some(Factor::PbRatio),
            "roe" => Some(Factor::Roe),
            "debt_equity" => Some(Factor::DebtEquity),
            "momentum" => Some(Factor::Momentum),
            "low_volatility" => Some(Factor::LowVolatility),
            _ => None,
        }
    }

    /// Cheap multiples, low leverage, and low realized volatility are
    /// favorable; profitability and momentum are favorable when high.
    pub fn direction(&self) -> Direction {
        match self {
            Factor::PeRatio | Factor::PbRatio | Factor::DebtEquity | Factor::LowVolatility => {
                Direction::LowerIsBetter
            }
            Factor::Roe | Factor::Momentum => Direction::HigherIsBetter,
        }
    }
}

/// A raw factor value. Missing is an explicit state, never a NaN sentinel:
/// missingness is informative and is penalized downstream (worst bucket).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FactorValue {
    Present(f64),
    Missing,
}

impl FactorValue {
    pub fn from_option(value: Option<f64>) -> FactorValue {
        match value {
            Some(v) if v.is_finite() => FactorValue::Present(v),
            _ => FactorValue::Missing,
        }
    }

    pub fn present(&self) -> Option<f64> {
        match self {
            FactorValue::Present(v) => Some(*v),
            FactorValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FactorValue::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for factor in Factor::ALL {
            assert_eq!(Factor::from_name(factor.name()), Some(factor));
        }
        assert_eq!(Factor::from_name("pe"), None);
    }

    #[test]
    fn orientations() {
        assert_eq!(Factor::PeRatio.direction(), Direction::LowerIsBetter);
        assert_eq!(Factor::PbRatio.direction(), Direction::LowerIsBetter);
        assert_eq!(Factor::Roe.direction(), Direction::HigherIsBetter);
        assert_eq!(Factor::DebtEquity.direction(), Direction::LowerIsBetter);
        assert_eq!(Factor::Momentum.direction(), Direction::HigherIsBetter);
        assert_eq!(Factor::LowVolatility.direction(), Direction::LowerIsBetter);
    }

    #[test]
    fn from_option_rejects_non_finite() {
        assert_eq!(
            FactorValue::from_option(Some(1.5)),
            FactorValue::Present(1.5)
        );
        assert!(FactorValue::from_option(None).is_missing());
        assert!(FactorValue::from_option(Some(f64::NAN)).is_missing());
        assert!(FactorValue::from_option(Some(f64::INFINITY)).is_missing());
    }
}
