use serde::{Deserialize, Serialize};

/// Impermanent-loss ratio of one token: current pool balance over the amount
/// the liquidity provider deposited.
///
/// # Arguments
///
/// * `balance` - The token's balance after the swap
/// * `deposit` - The token's balance at pool creation
///
/// # Returns
///
/// * `f64` - 1.0 means no change, below 1.0 the provider holds less of the token
pub fn calculate_il_ratio(balance: f64, deposit: f64) -> Result<f64, &'static str> {
    if deposit <= 0.0 {
        return Err("Deposit must be positive");
    }
    if balance < 0.0 {
        return Err("Balance cannot be negative");
    }
    Ok(balance / deposit)
}

/// Value of the pool relative to simply holding the deposits, at current prices.
/// Each entry is `(balance, deposit, price)`.
///
/// Returns the relative difference: negative when the pool is worth less than
/// the held deposits.
pub fn calculate_il_vs_hold(reserves: &[(f64, f64, f64)]) -> Result<f64, &'static str> {
    let value_pool: f64 = reserves.iter().map(|(b, _, p)| b * p).sum();
    let value_held: f64 = reserves.iter().map(|(_, d, p)| d * p).sum();
    if value_held <= 0.0 {
        return Err("Held value must be positive");
    }
    Ok((value_pool - value_held) / value_held)
}

/// Direction of an impermanent-loss ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IlDirection {
    Gain,
    Loss,
    Flat,
}

impl IlDirection {
    pub fn of(ratio: f64) -> Self {
        if ratio > 1.0 {
            Self::Gain
        } else if ratio < 1.0 {
            Self::Loss
        } else {
            Self::Flat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_il_ratio() {
        // 1000 deposited, 909.09 left after a swap drew from the pool
        let ratio = calculate_il_ratio(909.09, 1000.0).unwrap();
        assert!((ratio - 0.90909).abs() < 1e-9);
        assert_eq!(IlDirection::of(ratio), IlDirection::Loss);
        assert_eq!(IlDirection::of(1.1), IlDirection::Gain);
        assert_eq!(IlDirection::of(1.0), IlDirection::Flat);
    }

    #[test]
    fn test_calculate_il_ratio_rejects_bad_input() {
        assert!(calculate_il_ratio(1.0, 0.0).is_err());
        assert!(calculate_il_ratio(-1.0, 10.0).is_err());
    }

    #[test]
    fn test_calculate_il_vs_hold() {
        // 1000 x 1000 pool, x doubled in price, arbitraged to 707.1 x / 1414.2 y
        // pool value 2 * 707.1 + 1414.2 = 2828.4, held value 3000
        let il = calculate_il_vs_hold(&[(707.106_78, 1000.0, 2.0), (1414.213_56, 1000.0, 1.0)])
            .unwrap();
        assert!((il - (-0.05719)).abs() < 1e-4);
    }
}
