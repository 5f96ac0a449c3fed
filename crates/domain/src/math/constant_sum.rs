use crate::error::SwapError;
use crate::math::SwapQuote;

/// Fills a constant-sum swap at the market rate.
///
/// `market_rate` is in input units per output unit, so the uncapped output is
/// `amount_in / market_rate`. When that exceeds `reserve_out` the output is
/// truncated to the whole reserve and only the input needed to buy it enters
/// the pool; the rest is returned to the trader.
pub fn fill(
    amount_in: f64,
    reserve_in: f64,
    reserve_out: f64,
    market_rate: f64,
) -> Result<SwapQuote, SwapError> {
    if !amount_in.is_finite() || amount_in <= 0.0 {
        return Err(SwapError::InsufficientLiquidity(format!(
            "input amount must be positive, got {amount_in}"
        )));
    }
    if reserve_out <= 0.0 {
        return Err(SwapError::InsufficientLiquidity(
            "output reserve is drained".to_string(),
        ));
    }

    let wanted = amount_in / market_rate;
    let (taken, amount_out) = if wanted > reserve_out {
        (reserve_out * market_rate, reserve_out)
    } else {
        (amount_in, wanted)
    };

    Ok(SwapQuote {
        amount_in: taken,
        amount_out,
        balance_in_after: reserve_in + taken,
        balance_out_after: reserve_out - amount_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_at_market_rate() {
        // 1 output costs 2 input
        let quote = fill(100.0, 500.0, 500.0, 2.0).unwrap();
        assert_eq!(quote.amount_out, 50.0);
        assert_eq!(quote.amount_in, 100.0);
        assert_eq!(quote.balance_in_after, 600.0);
        assert_eq!(quote.balance_out_after, 450.0);
    }

    #[test]
    fn test_fill_truncates_to_reserve() {
        let quote = fill(600.0, 500.0, 500.0, 1.0).unwrap();
        assert_eq!(quote.amount_out, 500.0);
        assert_eq!(quote.amount_in, 500.0);
        assert_eq!(quote.balance_in_after, 1000.0);
        assert_eq!(quote.balance_out_after, 0.0);
    }

    #[test]
    fn test_fill_on_drained_reserve() {
        let err = fill(1.0, 1000.0, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, SwapError::InsufficientLiquidity(_)));
    }
}
