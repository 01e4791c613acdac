// ===============================
// src/policy.rs
// ===============================
//
// Quote evaluation: decide whether to answer a QuoteRequest and at what bid.
//
// - `QuotePolicy` is the seam for real pricing models; the handler only sees
//   the trait, so swapping the model never touches message plumbing.
// - `SizeThresholdPolicy` is the current placeholder rule: quote requests
//   strictly larger than `min_size` at a fixed bid, decline the rest.
//
// Policies must stay pure (no I/O, no session state, no interior mutability):
// the dispatcher may evaluate requests from several sessions concurrently.
//
use rust_decimal::Decimal;

use crate::domain::Instrument;

/// A declined decision carries no price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteDecision {
    Quote { bid_px: Decimal },
    Decline,
}

impl QuoteDecision {
    pub fn should_quote(&self) -> bool { matches!(self, QuoteDecision::Quote { .. }) }
}

pub trait QuotePolicy: Send + Sync {
    /// `requested_size` is already validated (numeric, non-negative).
    fn evaluate(&self, instrument: &Instrument, requested_size: Decimal) -> QuoteDecision;
}

#[derive(Debug, Clone)]
pub struct SizeThresholdPolicy {
    min_size: Decimal,
    bid_px: Decimal,
}

impl SizeThresholdPolicy {
    pub fn new(min_size: Decimal, bid_px: Decimal) -> Self { Self { min_size, bid_px } }
}

impl Default for SizeThresholdPolicy {
    fn default() -> Self {
        // quote above 1000 at 100.25
        Self::new(Decimal::new(1000, 0), Decimal::new(10025, 2))
    }
}

impl QuotePolicy for SizeThresholdPolicy {
    fn evaluate(&self, _instrument: &Instrument, requested_size: Decimal) -> QuoteDecision {
        if requested_size > self.min_size {
            QuoteDecision::Quote { bid_px: self.bid_px }
        } else {
            QuoteDecision::Decline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ibm() -> Instrument { Instrument::new("IBM", "US4592001014") }

    #[test]
    fn quotes_strictly_above_threshold() {
        let p = SizeThresholdPolicy::default();
        for size in [dec!(1000.01), dec!(1001), dec!(5000), dec!(1000000)] {
            assert_eq!(p.evaluate(&ibm(), size), QuoteDecision::Quote { bid_px: dec!(100.25) });
        }
    }

    #[test]
    fn declines_at_or_below_threshold() {
        let p = SizeThresholdPolicy::default();
        for size in [dec!(0), dec!(200), dec!(999.99), dec!(1000)] {
            let d = p.evaluate(&ibm(), size);
            assert_eq!(d, QuoteDecision::Decline);
            assert!(!d.should_quote());
        }
    }

    #[test]
    fn decision_is_deterministic_and_ignores_instrument() {
        let p = SizeThresholdPolicy::default();
        let aapl = Instrument::new("AAPL", "US0378331005");
        assert_eq!(p.evaluate(&ibm(), dec!(2500)), p.evaluate(&aapl, dec!(2500)));
        assert_eq!(p.evaluate(&ibm(), dec!(2500)), p.evaluate(&ibm(), dec!(2500)));
    }

    #[test]
    fn custom_threshold_and_bid() {
        let p = SizeThresholdPolicy::new(dec!(10), dec!(99.5));
        assert_eq!(p.evaluate(&ibm(), dec!(11)), QuoteDecision::Quote { bid_px: dec!(99.5) });
        assert_eq!(p.evaluate(&ibm(), dec!(10)), QuoteDecision::Decline);
    }
}
