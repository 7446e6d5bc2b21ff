//! Message catalogues used by the gateway client.
//!
//! These are **transport-agnostic** logical messages:
//! - [`OutboundRequest`]: what the client asks the gateway for.
//! - [`InboundMessage`]: what the gateway pushes back.
//!
//! Note: field layouts and wire ids live in the `gateway-protocol` crate;
//! this module is purely logical.

use crate::contract::{Contract, TagValue};
use crate::records::{
    AccountSummaryEntry, Bar, ContractDescription, ContractDetails, DepthMktDataDescription,
    FamilyCode, HistogramEntry, NewsProvider, Notice, OptionChain, Pnl, Position, PriceIncrement,
    RealTimeBar, TickGeneric, TickPrice, TickReqParams, TickSize, TickString,
};

/// Parameters of a historical bars request.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalDataRequest {
    pub req_id: i32,
    pub contract: Contract,
    /// `"yyyymmdd hh:mm:ss [tz]"`, or empty for "now".
    pub end_date_time: String,
    /// e.g. `"1 D"`, `"2 W"`.
    pub duration: String,
    /// e.g. `"1 min"`, `"1 day"`.
    pub bar_size: String,
    /// e.g. `"TRADES"`, `"MIDPOINT"`.
    pub what_to_show: String,
    pub use_rth: bool,
    /// `1` for formatted strings, `2` for epoch seconds.
    pub format_date: i32,
    pub keep_up_to_date: bool,
    pub chart_options: Vec<TagValue>,
}

/// A request sent from the client to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundRequest {
    /// First message after the handshake; identifies the API session.
    StartApi {
        client_id: i32,
        optional_capabilities: String,
    },
    CurrentTime,
    Ids {
        num_ids: i32,
    },
    ManagedAccounts,
    MarketDataType {
        market_data_type: i32,
    },
    MarketData {
        req_id: i32,
        contract: Contract,
        generic_tick_list: String,
        snapshot: bool,
        regulatory_snapshot: bool,
        options: Vec<TagValue>,
    },
    CancelMarketData {
        req_id: i32,
    },
    ContractDetails {
        req_id: i32,
        contract: Contract,
    },
    MatchingSymbols {
        req_id: i32,
        pattern: String,
    },
    Positions,
    CancelPositions,
    AccountSummary {
        req_id: i32,
        group: String,
        tags: String,
    },
    CancelAccountSummary {
        req_id: i32,
    },
    FundamentalData {
        req_id: i32,
        contract: Contract,
        report_type: String,
        options: Vec<TagValue>,
    },
    CancelFundamentalData {
        req_id: i32,
    },
    HistoricalData(HistoricalDataRequest),
    CancelHistoricalData {
        req_id: i32,
    },
    HeadTimestamp {
        req_id: i32,
        contract: Contract,
        what_to_show: String,
        use_rth: bool,
        format_date: i32,
    },
    CancelHeadTimestamp {
        req_id: i32,
    },
    HistogramData {
        req_id: i32,
        contract: Contract,
        use_rth: bool,
        /// e.g. `"3 days"`.
        time_period: String,
    },
    SecDefOptParams {
        req_id: i32,
        underlying_symbol: String,
        fut_fop_exchange: String,
        underlying_sec_type: String,
        underlying_con_id: i32,
    },
    FamilyCodes,
    MktDepthExchanges,
    NewsProviders,
    MarketRule {
        market_rule_id: i32,
    },
    Pnl {
        req_id: i32,
        account: String,
        model_code: String,
    },
    CancelPnl {
        req_id: i32,
    },
    RealTimeBars {
        req_id: i32,
        contract: Contract,
        bar_size: i32,
        what_to_show: String,
        use_rth: bool,
        options: Vec<TagValue>,
    },
    CancelRealTimeBars {
        req_id: i32,
    },
    ScannerParameters,
}

/// A decoded message pushed by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    TickPrice(TickPrice),
    TickSize(TickSize),
    TickGeneric(TickGeneric),
    TickString(TickString),
    TickReqParams(TickReqParams),
    TickSnapshotEnd {
        req_id: i32,
    },
    MarketDataType {
        req_id: i32,
        market_data_type: i32,
    },

    /// Informational / error side channel.
    Notice(Notice),

    NextValidId(i32),
    ManagedAccounts(Vec<String>),
    CurrentTime(i64),

    ContractDetails {
        req_id: i32,
        details: Box<ContractDetails>,
    },
    ContractDetailsEnd {
        req_id: i32,
    },
    SymbolSamples {
        req_id: i32,
        descriptions: Vec<ContractDescription>,
    },

    Position(Position),
    PositionEnd,
    AccountSummary(AccountSummaryEntry),
    AccountSummaryEnd {
        req_id: i32,
    },
    Pnl(Pnl),

    FundamentalData {
        req_id: i32,
        data: String,
    },
    HistoricalData {
        req_id: i32,
        start: String,
        end: String,
        bars: Vec<Bar>,
    },
    RealTimeBar(RealTimeBar),
    HeadTimestamp {
        req_id: i32,
        timestamp: String,
    },
    HistogramData {
        req_id: i32,
        entries: Vec<HistogramEntry>,
    },

    OptionChain(OptionChain),
    OptionChainEnd {
        req_id: i32,
    },
    FamilyCodes(Vec<FamilyCode>),
    MktDepthExchanges(Vec<DepthMktDataDescription>),
    NewsProviders(Vec<NewsProvider>),
    MarketRule {
        market_rule_id: i32,
        increments: Vec<PriceIncrement>,
    },
    ScannerParameters(String),

    /// Inbound message with no decoder, or one that failed to decode.
    /// Kept as raw text so nothing received is silently lost.
    Unrecognized {
        wire_id: i32,
        name: Option<&'static str>,
        fields: Vec<String>,
    },
}

impl InboundMessage {
    /// Request id this message answers, when it carries one.
    pub fn request_id(&self) -> Option<i32> {
        match self {
            InboundMessage::TickPrice(t) => Some(t.req_id),
            InboundMessage::TickSize(t) => Some(t.req_id),
            InboundMessage::TickGeneric(t) => Some(t.req_id),
            InboundMessage::TickString(t) => Some(t.req_id),
            InboundMessage::TickReqParams(t) => Some(t.req_id),
            InboundMessage::TickSnapshotEnd { req_id }
            | InboundMessage::MarketDataType { req_id, .. }
            | InboundMessage::ContractDetails { req_id, .. }
            | InboundMessage::ContractDetailsEnd { req_id }
            | InboundMessage::SymbolSamples { req_id, .. }
            | InboundMessage::AccountSummaryEnd { req_id }
            | InboundMessage::FundamentalData { req_id, .. }
            | InboundMessage::HistoricalData { req_id, .. }
            | InboundMessage::HeadTimestamp { req_id, .. }
            | InboundMessage::HistogramData { req_id, .. }
            | InboundMessage::OptionChainEnd { req_id } => Some(*req_id),
            InboundMessage::Notice(n) => Some(n.id),
            InboundMessage::AccountSummary(a) => Some(a.req_id),
            InboundMessage::Pnl(p) => Some(p.req_id),
            InboundMessage::RealTimeBar(b) => Some(b.req_id),
            InboundMessage::OptionChain(c) => Some(c.req_id),
            InboundMessage::NextValidId(_)
            | InboundMessage::ManagedAccounts(_)
            | InboundMessage::CurrentTime(_)
            | InboundMessage::Position(_)
            | InboundMessage::PositionEnd
            | InboundMessage::FamilyCodes(_)
            | InboundMessage::MktDepthExchanges(_)
            | InboundMessage::NewsProviders(_)
            | InboundMessage::MarketRule { .. }
            | InboundMessage::ScannerParameters(_)
            | InboundMessage::Unrecognized { .. } => None,
        }
    }

    /// End-of-stream markers carry no payload of their own.
    pub fn is_end_marker(&self) -> bool {
        matches!(
            self,
            InboundMessage::TickSnapshotEnd { .. }
                | InboundMessage::ContractDetailsEnd { .. }
                | InboundMessage::PositionEnd
                | InboundMessage::AccountSummaryEnd { .. }
                | InboundMessage::OptionChainEnd { .. }
        )
    }

    pub fn as_notice(&self) -> Option<&Notice> {
        match self {
            InboundMessage::Notice(n) => Some(n),
            _ => None,
        }
    }
}
