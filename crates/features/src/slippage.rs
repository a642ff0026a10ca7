//! Slippage scoring.
//!
//! Slippage is the fraction of the quoted spread given up relative to the
//! favourable touch: 0 at the touch, 1 at the far side. Values outside
//! [0, 1] mean the trade printed outside the quote and are kept as-is.

use tca_core::{MatchedQuote, MatchedTrade, QuoteOffset, ScoredTrade};

/// Slippage of a trade against a quote.
///
/// Returns 0 when the quantity is zero, a side of the quote is missing, or
/// the spread is zero.
pub fn slippage(quantity: f64, price: f64, quote: &MatchedQuote) -> f64 {
    let (Some(bid), Some(ask)) = (quote.best_bid, quote.best_ask) else {
        return 0.0;
    };
    let spread = ask - bid;
    if spread == 0.0 {
        return 0.0;
    }

    if quantity > 0.0 {
        (ask - price) / spread
    } else if quantity < 0.0 {
        (price - bid) / spread
    } else {
        0.0
    }
}

/// Score a matched trade against its 0s quote.
pub fn score(matched: MatchedTrade) -> ScoredTrade {
    let trade = &matched.trade;
    let slippage = slippage(trade.quantity, trade.price, matched.quote(QuoteOffset::At));
    ScoredTrade { matched, slippage }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tca_core::Trade;

    fn quote(bid: f64, ask: f64) -> MatchedQuote {
        MatchedQuote::from_sides(Some(bid), Some(ask))
    }

    #[test]
    fn test_buy_mid_spread() {
        // (10.6 - 10.5) / (10.6 - 10.4)
        assert_relative_eq!(slippage(100.0, 10.5, &quote(10.4, 10.6)), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_sell_mid_spread() {
        // (10.7 - 10.6) / (10.8 - 10.6)
        assert_relative_eq!(slippage(-50.0, 10.7, &quote(10.6, 10.8)), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_touches() {
        let q = quote(10.0, 10.2);
        // Buy at the bid is the best possible fill, at the ask the worst.
        assert_relative_eq!(slippage(1.0, 10.2, &q), 0.0, epsilon = 1e-9);
        assert_relative_eq!(slippage(1.0, 10.0, &q), 1.0, epsilon = 1e-9);
        assert_relative_eq!(slippage(-1.0, 10.0, &q), 0.0, epsilon = 1e-9);
        assert_relative_eq!(slippage(-1.0, 10.2, &q), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_outside_spread_not_clamped() {
        let q = quote(10.0, 10.2);
        assert_relative_eq!(slippage(1.0, 10.4, &q), -1.0, epsilon = 1e-9);
        assert_relative_eq!(slippage(-1.0, 10.4, &q), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_spread_is_zero() {
        let q = quote(10.5, 10.5);
        assert_eq!(slippage(100.0, 11.0, &q), 0.0);
        assert_eq!(slippage(-100.0, 9.0, &q), 0.0);
    }

    #[test]
    fn test_missing_quote_is_zero() {
        assert_eq!(slippage(100.0, 10.5, &MatchedQuote::missing()), 0.0);
        assert_eq!(slippage(100.0, 10.5, &MatchedQuote::from_sides(Some(10.4), None)), 0.0);
    }

    #[test]
    fn test_zero_quantity_is_zero() {
        assert_eq!(slippage(0.0, 10.5, &quote(10.0, 10.2)), 0.0);
    }

    #[test]
    fn test_score_uses_exact_second_quote() {
        let matched = MatchedTrade {
            trade: Trade {
                trade_time: 0,
                quantity: 100.0,
                price: 10.5,
                instrument_id: Some(1),
                venue: Some("XNYS".to_string()),
            },
            quotes: [quote(1.0, 2.0), quote(10.4, 10.6), quote(100.0, 200.0)],
        };

        let scored = score(matched);
        assert_relative_eq!(scored.slippage, 0.5, epsilon = 1e-9);
    }
}
