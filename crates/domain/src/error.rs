//! Error taxonomy shared by the curve engine and the simulator.
//!
//! [`SwapError`] is local to one swap: the swap is skipped and recorded, the
//! batch continues. [`ConfigError`] is fatal and is raised before any pool
//! state is touched.

use crate::token::TokenId;
use serde::{Deserialize, Serialize};

/// Per-swap failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SwapError {
    /// The swap falls outside the curve's feasible domain.
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(String),
    /// The cap limit would be violated even after clamping.
    #[error("capacity exceeded for {token}: {value:.4} above cap {cap_limit:.4}")]
    CapacityExceeded {
        /// Token whose market cap breaches the limit.
        token: TokenId,
        /// Configured limit.
        cap_limit: f64,
        /// Market cap the swap would leave behind.
        value: f64,
    },
    /// The equilibrium solver found no real, feasible root.
    #[error("equilibrium solver failed: {0}")]
    CurveSolveError(String),
    /// The token is not part of the pool or has no price.
    #[error("unknown token {0}")]
    UnknownToken(TokenId),
}

impl SwapError {
    /// Serializable discriminant used for skipped-sample bookkeeping.
    #[must_use]
    pub fn kind(&self) -> SkipKind {
        match self {
            Self::InsufficientLiquidity(_) => SkipKind::InsufficientLiquidity,
            Self::CapacityExceeded { .. } => SkipKind::CapacityExceeded,
            Self::CurveSolveError(_) => SkipKind::CurveSolve,
            Self::UnknownToken(_) => SkipKind::UnknownToken,
        }
    }
}

/// Why a swap was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    InsufficientLiquidity,
    CapacityExceeded,
    CurveSolve,
    UnknownToken,
}

/// Invalid or missing configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A required field is absent.
    #[error("missing required field `{0}`")]
    Missing(String),
    /// A field holds a value outside its domain.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: String,
        /// Human readable reason.
        reason: String,
    },
    /// External streams do not fit the run.
    #[error("stream mismatch: {0}")]
    StreamMismatch(String),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
