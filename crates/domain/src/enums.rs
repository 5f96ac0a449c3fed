use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarketMakerType {
    #[serde(rename = "AMM")]
    Amm,
    #[serde(rename = "CSMM")]
    Csmm,
    #[serde(rename = "PMM")]
    Pmm,
    #[serde(rename = "MAMM")]
    Mamm,
    #[serde(rename = "MCSMM")]
    Mcsmm,
    #[serde(rename = "MPMM")]
    Mpmm,
}

impl MarketMakerType {
    pub const ALL: [MarketMakerType; 6] = [
        MarketMakerType::Amm,
        MarketMakerType::Csmm,
        MarketMakerType::Pmm,
        MarketMakerType::Mamm,
        MarketMakerType::Mcsmm,
        MarketMakerType::Mpmm,
    ];

    pub fn curve_kind(&self) -> CurveKind {
        match self {
            Self::Amm | Self::Mamm => CurveKind::ConstantProduct,
            Self::Csmm | Self::Mcsmm => CurveKind::ConstantSum,
            Self::Pmm => CurveKind::Proactive,
            Self::Mpmm => CurveKind::MultiProactive,
        }
    }

    pub fn topology(&self) -> Topology {
        match self {
            Self::Amm | Self::Csmm | Self::Pmm => Topology::Pairwise,
            Self::Mamm | Self::Mcsmm | Self::Mpmm => Topology::Shared,
        }
    }

    pub fn is_multi_token(&self) -> bool {
        self.topology() == Topology::Shared
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Amm => "AMM",
            Self::Csmm => "CSMM",
            Self::Pmm => "PMM",
            Self::Mamm => "MAMM",
            Self::Mcsmm => "MCSMM",
            Self::Mpmm => "MPMM",
        }
    }
}

impl fmt::Display for MarketMakerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MarketMakerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown market maker type `{s}`"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveKind {
    ConstantProduct,
    ConstantSum,
    Proactive,
    MultiProactive,
}

/// Pairwise pools (one pool per token pair) or one pool shared by all tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    Pairwise,
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapOrigin {
    Organic,
    Arbitrage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_maker_mapping() {
        assert_eq!(MarketMakerType::Pmm.curve_kind(), CurveKind::Proactive);
        assert_eq!(MarketMakerType::Mpmm.curve_kind(), CurveKind::MultiProactive);
        assert_eq!(MarketMakerType::Mcsmm.curve_kind(), CurveKind::ConstantSum);
        assert!(MarketMakerType::Mamm.is_multi_token());
        assert!(!MarketMakerType::Amm.is_multi_token());
    }

    #[test]
    fn test_market_maker_parse() {
        assert_eq!("mpmm".parse::<MarketMakerType>(), Ok(MarketMakerType::Mpmm));
        assert!("XYZ".parse::<MarketMakerType>().is_err());

        let parsed: MarketMakerType = serde_json::from_str("\"CSMM\"").unwrap();
        assert_eq!(parsed, MarketMakerType::Csmm);
    }
}
