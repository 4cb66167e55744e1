//! Strategy-producer contract (§6): the input boundary to the Risk Manager.
//! No concrete producer lives here; producers are the strategy layer, out of
//! scope for this core.

use rust_decimal::Decimal;

use mqk_risk::types::{OrderIntent, Side};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignalSide {
    Buy,
    Sell,
    Abstain,
}

/// A single signal emitted by a producer for one symbol, per bar/tick.
/// `strength` is clamped to `[0, 1]` by producers; this contract does not
/// enforce the clamp itself.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub side: SignalSide,
    pub strength: f64,
    pub price: Option<Decimal>,
    pub reason: String,
}

impl Signal {
    pub fn is_actionable(&self) -> bool {
        self.side != SignalSide::Abstain
    }
}

/// A producer converts its own non-ABSTAIN signals into order intents,
/// supplying its own stop-loss and quantity sizing (§6). The risk gate never
/// sizes or sets stops on a producer's behalf.
pub trait Producer {
    fn id(&self) -> &str;

    fn on_bar(&mut self, symbol: &str, price: Decimal) -> Vec<Signal>;

    /// Converts an actionable signal into a fully-formed order intent. Callers
    /// filter ABSTAIN signals before invoking this; it panics if given one.
    fn size(&self, signal: &Signal, quantity: Decimal, price: Decimal) -> OrderIntent {
        let side = match signal.side {
            SignalSide::Buy => Side::Buy,
            SignalSide::Sell => Side::Sell,
            SignalSide::Abstain => panic!("cannot size an ABSTAIN signal"),
        };

        OrderIntent {
            symbol: signal.symbol.clone(),
            side,
            quantity,
            price,
            producer_id: self.id().to_string(),
            stop_loss_price: None,
            last_traded_price: None,
            avg_daily_volume: None,
        }
    }
}

/// Filters a batch of signals down to the actionable (non-ABSTAIN) subset, as
/// required before conversion to order intents (§6).
pub fn actionable_signals(signals: Vec<Signal>) -> Vec<Signal> {
    signals.into_iter().filter(Signal::is_actionable).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct FixedProducer {
        id: String,
    }

    impl Producer for FixedProducer {
        fn id(&self) -> &str {
            &self.id
        }

        fn on_bar(&mut self, symbol: &str, price: Decimal) -> Vec<Signal> {
            vec![Signal {
                symbol: symbol.to_string(),
                side: SignalSide::Buy,
                strength: 1.0,
                price: Some(price),
                reason: "fixed".to_string(),
            }]
        }
    }

    #[test]
    fn abstain_signals_are_filtered_out() {
        let signals = vec![
            Signal {
                symbol: "AAPL".into(),
                side: SignalSide::Abstain,
                strength: 0.0,
                price: None,
                reason: "no edge".into(),
            },
            Signal {
                symbol: "MSFT".into(),
                side: SignalSide::Buy,
                strength: 0.8,
                price: None,
                reason: "momentum".into(),
            },
        ];

        let actionable = actionable_signals(signals);
        assert_eq!(actionable.len(), 1);
        assert_eq!(actionable[0].symbol, "MSFT");
    }

    #[test]
    fn producer_sizes_signal_into_intent() {
        let mut producer = FixedProducer { id: "p1".into() };
        let signals = producer.on_bar("AAPL", dec!(150));
        let intent = producer.size(&signals[0], dec!(10), dec!(150));

        assert_eq!(intent.symbol, "AAPL");
        assert_eq!(intent.side, Side::Buy);
        assert_eq!(intent.producer_id, "p1");
    }

    #[test]
    #[should_panic(expected = "ABSTAIN")]
    fn sizing_an_abstain_signal_panics() {
        let producer = FixedProducer { id: "p1".into() };
        let signal = Signal {
            symbol: "AAPL".into(),
            side: SignalSide::Abstain,
            strength: 0.0,
            price: None,
            reason: "none".into(),
        };
        producer.size(&signal, dec!(1), dec!(1));
    }
}
