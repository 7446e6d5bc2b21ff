//! Decoded business records.
//!
//! These are the payloads carried by [`crate::InboundMessage`]. Their shape
//! follows what the gateway sends; the protocol crate fills them in.

use crate::contract::{Contract, TagValue};

/// Informational / error notice pushed by the gateway.
///
/// `id` is the request id the notice refers to, or `-1` for
/// connection-wide notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: i32,
    pub code: i32,
    pub message: String,
    pub advanced_order_reject_json: String,
}

impl Notice {
    /// Codes 2100..2200 are farm/connectivity status notices, not failures.
    pub fn is_status(&self) -> bool {
        (2100..2200).contains(&self.code)
    }
}

/// Full description returned for a contract lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContractDetails {
    pub contract: Contract,
    /// Time part of the last trade date, when the gateway sends one.
    pub last_trade_time: String,
    pub market_name: String,
    pub min_tick: f64,
    pub order_types: String,
    pub valid_exchanges: String,
    pub price_magnifier: i32,
    pub under_con_id: i32,
    pub long_name: String,
    pub contract_month: String,
    pub industry: String,
    pub category: String,
    pub subcategory: String,
    pub time_zone_id: String,
    pub trading_hours: String,
    pub liquid_hours: String,
    pub ev_rule: String,
    pub ev_multiplier: f64,
    pub sec_id_list: Vec<TagValue>,
    pub agg_group: Option<i32>,
    pub under_symbol: String,
    pub under_sec_type: String,
    pub market_rule_ids: String,
    pub real_expiration_date: String,
    pub stock_type: String,
    pub min_size: Option<f64>,
    pub size_increment: Option<f64>,
    pub suggested_size_increment: Option<f64>,
}

/// One hit of a symbol search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContractDescription {
    pub contract: Contract,
    pub derivative_sec_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub account: String,
    pub contract: Contract,
    pub position: f64,
    pub avg_cost: f64,
}

/// Historical OHLC bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Formatted per the request's `format_date`.
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub wap: f64,
    pub bar_count: i32,
}

/// Five-second bar pushed on a real-time bars subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct RealTimeBar {
    pub req_id: i32,
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub wap: f64,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummaryEntry {
    pub req_id: i32,
    pub account: String,
    pub tag: String,
    pub value: String,
    pub currency: String,
}

/// Attribute flags carried by a price tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickAttrib {
    pub can_auto_execute: bool,
    pub past_limit: bool,
    pub pre_open: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickPrice {
    pub req_id: i32,
    pub tick_type: i32,
    pub price: f64,
    pub size: f64,
    pub attrib: TickAttrib,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickSize {
    pub req_id: i32,
    pub tick_type: i32,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickGeneric {
    pub req_id: i32,
    pub tick_type: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickString {
    pub req_id: i32,
    pub tick_type: i32,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReqParams {
    pub req_id: i32,
    pub min_tick: f64,
    pub bbo_exchange: String,
    pub snapshot_permissions: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyCode {
    pub account_id: String,
    pub family_code: String,
}

/// Market-depth capable venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthMktDataDescription {
    pub exchange: String,
    pub sec_type: String,
    pub listing_exchange: String,
    /// `"Deep"` or `"Deep2"`.
    pub service_data_type: String,
    /// Only reported by newer gateways.
    pub agg_group: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsProvider {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramEntry {
    pub price: f64,
    pub size: f64,
}

/// Price increment that applies from `low_edge` upwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceIncrement {
    pub low_edge: f64,
    pub increment: f64,
}

/// Option chain parameters for one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionChain {
    pub req_id: i32,
    pub exchange: String,
    pub underlying_con_id: i32,
    pub trading_class: String,
    pub multiplier: String,
    pub expirations: Vec<String>,
    pub strikes: Vec<f64>,
}

/// Daily P&L snapshot for an account.
///
/// Unrealized and realized P&L are `None` when the gateway is too old to
/// report them or reports them as unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Pnl {
    pub req_id: i32,
    pub daily_pnl: f64,
    pub unrealized_pnl: Option<f64>,
    pub realized_pnl: Option<f64>,
}
