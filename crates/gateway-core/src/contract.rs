//! Contract description shared by requests and decoded records.
//!
//! Fields that only make sense for some security types (expiry, strike,
//! right, multiplier) are `Option`s. The per-type constructors leave them
//! unset, so a stock contract simply has no strike instead of a `0.0`
//! placeholder. The protocol layer maps `None` to the wire defaults.

use crate::sec_type::{Right, SecType};

/// A free-form `tag=value` option pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagValue {
    pub tag: String,
    pub value: String,
}

impl TagValue {
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        TagValue {
            tag: tag.into(),
            value: value.into(),
        }
    }
}

/// One leg of a combination (`BAG`) contract.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComboLeg {
    pub con_id: i32,
    pub ratio: i32,
    /// `"BUY"`, `"SELL"` or `"SSHORT"`.
    pub action: String,
    pub exchange: String,
}

/// Delta-neutral underlying attached to a combo market-data request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeltaNeutralContract {
    pub con_id: i32,
    pub delta: f64,
    pub price: f64,
}

/// An instrument, as understood by the gateway.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contract {
    /// Gateway-assigned contract id; `0` when unknown.
    pub con_id: i32,
    pub symbol: String,
    pub sec_type: SecType,
    pub last_trade_date_or_contract_month: Option<String>,
    pub strike: Option<f64>,
    pub right: Option<Right>,
    pub multiplier: Option<String>,
    pub exchange: String,
    pub primary_exchange: String,
    pub currency: String,
    pub local_symbol: String,
    pub trading_class: String,
    pub include_expired: bool,
    pub sec_id_type: String,
    pub sec_id: String,
    pub description: String,
    pub issuer_id: String,
    pub combo_legs: Vec<ComboLeg>,
    pub delta_neutral_contract: Option<DeltaNeutralContract>,
}

impl Contract {
    /// Stock routed through `exchange` (usually `"SMART"`).
    pub fn stock(
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Contract {
            symbol: symbol.into(),
            sec_type: SecType::Stock,
            exchange: exchange.into(),
            currency: currency.into(),
            ..Default::default()
        }
    }

    /// Equity option with the conventional multiplier of 100.
    pub fn option(
        symbol: impl Into<String>,
        expiry: impl Into<String>,
        strike: f64,
        right: Right,
        exchange: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Contract {
            symbol: symbol.into(),
            sec_type: SecType::Option,
            last_trade_date_or_contract_month: Some(expiry.into()),
            strike: Some(strike),
            right: Some(right),
            multiplier: Some("100".to_string()),
            exchange: exchange.into(),
            currency: currency.into(),
            ..Default::default()
        }
    }

    pub fn future(
        symbol: impl Into<String>,
        contract_month: impl Into<String>,
        exchange: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Contract {
            symbol: symbol.into(),
            sec_type: SecType::Future,
            last_trade_date_or_contract_month: Some(contract_month.into()),
            exchange: exchange.into(),
            currency: currency.into(),
            ..Default::default()
        }
    }

    /// Currency pair on the interbank venue, e.g. `Contract::forex("EUR", "USD")`.
    pub fn forex(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Contract {
            symbol: base.into(),
            sec_type: SecType::Cash,
            exchange: "IDEALPRO".to_string(),
            currency: quote.into(),
            ..Default::default()
        }
    }

    pub fn index(
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Contract {
            symbol: symbol.into(),
            sec_type: SecType::Index,
            exchange: exchange.into(),
            currency: currency.into(),
            ..Default::default()
        }
    }

    /// Lookup by contract id alone.
    pub fn by_con_id(con_id: i32, exchange: impl Into<String>) -> Self {
        Contract {
            con_id,
            sec_type: SecType::Unspecified,
            exchange: exchange.into(),
            ..Default::default()
        }
    }

    pub fn with_primary_exchange(mut self, primary_exchange: impl Into<String>) -> Self {
        self.primary_exchange = primary_exchange.into();
        self
    }

    pub fn with_trading_class(mut self, trading_class: impl Into<String>) -> Self {
        self.trading_class = trading_class.into();
        self
    }

    pub fn is_combo(&self) -> bool {
        self.sec_type == SecType::Bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_has_no_derivative_fields() {
        let c = Contract::stock("AAPL", "SMART", "USD");
        assert_eq!(c.sec_type, SecType::Stock);
        assert!(c.strike.is_none());
        assert!(c.right.is_none());
        assert!(c.multiplier.is_none());
        assert!(c.last_trade_date_or_contract_month.is_none());
    }

    #[test]
    fn option_carries_strike_and_right() {
        let c = Contract::option("SPY", "20260116", 450.0, Right::Put, "SMART", "USD");
        assert_eq!(c.strike, Some(450.0));
        assert_eq!(c.right, Some(Right::Put));
        assert_eq!(c.multiplier.as_deref(), Some("100"));
    }
}
