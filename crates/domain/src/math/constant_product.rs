use crate::error::SwapError;
use crate::math::{Equilibrium, SwapQuote};

/// Calculates the output amount for a given input amount in a constant product pool (x * y = C).
/// returns the quote including post-swap reserves
///
/// formula: dy = y - C / (x + dx) = y * dx / (x + dx)
pub fn calculate_out_amount(
    amount_in: f64,
    reserve_in: f64,
    reserve_out: f64,
) -> Result<SwapQuote, SwapError> {
    if !amount_in.is_finite() || amount_in <= 0.0 {
        return Err(SwapError::InsufficientLiquidity(format!(
            "input amount must be positive, got {amount_in}"
        )));
    }
    if reserve_in <= 0.0 || reserve_out <= 0.0 {
        return Err(SwapError::InsufficientLiquidity(
            "reserves must be non-zero".to_string(),
        ));
    }

    let new_in = reserve_in + amount_in;
    let amount_out = reserve_out * amount_in / new_in;
    let new_out = reserve_out - amount_out;

    // only reachable through float underflow on absurd inputs
    if new_out <= 0.0 {
        return Err(SwapError::InsufficientLiquidity(
            "swap would drain the output reserve".to_string(),
        ));
    }

    Ok(SwapQuote {
        amount_in,
        amount_out,
        balance_in_after: new_in,
        balance_out_after: new_out,
    })
}

/// Calculates the constant product C
pub fn calculate_k(reserve0: f64, reserve1: f64) -> f64 {
    reserve0 * reserve1
}

/// Balances on the current curve at which reserve_in / reserve_out equals the
/// market rate (input units per output unit).
pub fn equilibrium(reserve_in: f64, reserve_out: f64, market_rate: f64) -> Equilibrium {
    let c = calculate_k(reserve_in, reserve_out);
    let output = (c / market_rate).sqrt();
    Equilibrium {
        input: c / output,
        output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_out_amount() {
        // 1000 reserve0, 1000 reserve1, 100 input
        // out = 1000 - 1_000_000 / 1100 = 90.9090...
        let quote = calculate_out_amount(100.0, 1000.0, 1000.0).unwrap();
        assert!((quote.amount_out - 90.909_090_909).abs() < 1e-6);
        assert_eq!(quote.balance_in_after, 1100.0);
        assert!((quote.balance_out_after - 909.090_909_09).abs() < 1e-6);
    }

    #[test]
    fn test_product_is_preserved() {
        let (x, y) = (2_500.0, 731.0);
        for amount in [0.001, 1.0, 37.5, 2_500.0, 1e7] {
            let quote = calculate_out_amount(amount, x, y).unwrap();
            let before = calculate_k(x, y);
            let after = calculate_k(quote.balance_in_after, quote.balance_out_after);
            assert!((after - before).abs() <= 1e-9 * before);
        }
    }

    #[test]
    fn test_output_grows_with_input() {
        let mut last = 0.0;
        for amount in [1.0, 10.0, 100.0, 1_000.0, 10_000.0] {
            let quote = calculate_out_amount(amount, 1000.0, 1000.0).unwrap();
            assert!(quote.amount_out > last);
            assert!(quote.amount_out < 1000.0);
            last = quote.amount_out;
        }
    }

    #[test]
    fn test_equilibrium_matches_market_rate() {
        let eq = equilibrium(1000.0, 1000.0, 4.0);
        // pool rate in/out at equilibrium equals the market rate
        assert!((eq.input / eq.output - 4.0).abs() < 1e-12);
        assert!((eq.input * eq.output - 1_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_non_positive_input() {
        assert!(calculate_out_amount(0.0, 1.0, 1.0).is_err());
        assert!(calculate_out_amount(-1.0, 1.0, 1.0).is_err());
    }
}
