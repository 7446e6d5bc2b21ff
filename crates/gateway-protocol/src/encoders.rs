//! Outbound message encoders.
//!
//! Every request is described as a list of typed slots. Each slot carries
//! its own version window, so the gating logic lives in [`MessageBuilder`]
//! instead of being repeated at each call site:
//!
//! ```text
//! req_contract_data (id=9, message version 8)
//! -------------------------------------------
//! id               always
//! version          always
//! req_id           >= 40  (contract data chain)
//! con_id           >= 37
//! symbol .. mult   always
//! exchange         always
//! primary_exchange >= 75
//! currency         always
//! local_symbol     always
//! trading_class    >= 68
//! include_expired  always
//! sec_id_type      >= 45
//! sec_id           >= 45
//! issuer_id        >= 176
//! ```
//!
//! Slots are resolved against the negotiated version first, then checked,
//! then written. A missing required value or a NUL inside text fails the
//! whole message before any byte is produced.

use gateway_core::{Contract, HistoricalDataRequest, OutboundRequest, SecType, TagValue};

use crate::error::{ProtocolError, ProtocolResult};
use crate::field_codec::{encode_message, Field};
use crate::frame::Frame;
use crate::server_versions as sv;
use crate::wire_types::{OutgoingId, ProtocolVersion};

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    name: &'static str,
    value: Option<Field>,
    /// Present when `negotiated >= since` ...
    since: i32,
    /// ... and `negotiated < before`.
    before: i32,
}

impl Slot {
    fn admits(&self, version: ProtocolVersion) -> bool {
        version.supports(self.since) && !version.supports(self.before)
    }
}

/// Ordered, version-gated field list for one outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageBuilder {
    id: OutgoingId,
    slots: Vec<Slot>,
}

impl MessageBuilder {
    /// Starts a message; the wire id is always the first token.
    pub fn new(id: OutgoingId) -> Self {
        MessageBuilder {
            id,
            slots: Vec::with_capacity(16),
        }
        .field("msg_id", id.id())
    }

    pub fn id(&self) -> OutgoingId {
        self.id
    }

    fn push(mut self, name: &'static str, value: Option<Field>, since: i32, before: i32) -> Self {
        self.slots.push(Slot {
            name,
            value,
            since,
            before,
        });
        self
    }

    /// Field present at every version.
    pub fn field(self, name: &'static str, value: impl Into<Field>) -> Self {
        self.push(name, Some(value.into()), i32::MIN, i32::MAX)
    }

    /// Field present once the gateway is at `threshold` or newer.
    pub fn since(self, threshold: i32, name: &'static str, value: impl Into<Field>) -> Self {
        self.push(name, Some(value.into()), threshold, i32::MAX)
    }

    /// Field the gateway stopped expecting at `threshold`.
    pub fn before(self, threshold: i32, name: &'static str, value: impl Into<Field>) -> Self {
        self.push(name, Some(value.into()), i32::MIN, threshold)
    }

    /// Field that must be supplied; `None` fails the encode.
    pub fn required<T: Into<Field>>(self, name: &'static str, value: Option<T>) -> Self {
        self.push(name, value.map(Into::into), i32::MIN, i32::MAX)
    }

    /// Appends whatever `build` adds, gated on `threshold` as a block.
    pub fn group_since(self, threshold: i32, build: impl FnOnce(Self) -> Self) -> Self {
        let start = self.slots.len();
        let mut this = build(self);
        for slot in &mut this.slots[start..] {
            slot.since = slot.since.max(threshold);
        }
        this
    }

    /// Appends whatever `build` adds only when `condition` holds.
    pub fn when(self, condition: bool, build: impl FnOnce(Self) -> Self) -> Self {
        if condition {
            build(self)
        } else {
            self
        }
    }

    /// Names of the slots that would be sent at `version`.
    pub fn field_names(&self, version: ProtocolVersion) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter(|s| s.admits(version))
            .map(|s| s.name)
            .collect()
    }

    /// Resolves the slots for `version`, failing on the first missing or
    /// invalid value.
    pub fn fields(&self, version: ProtocolVersion) -> ProtocolResult<Vec<Field>> {
        let mut fields = Vec::with_capacity(self.slots.len());
        for slot in self.slots.iter().filter(|s| s.admits(version)) {
            let value = slot
                .value
                .as_ref()
                .ok_or_else(|| ProtocolError::invalid_field(slot.name, "required value missing"))?;
            value.check(slot.name)?;
            fields.push(value.clone());
        }
        Ok(fields)
    }

    pub fn encode(&self, version: ProtocolVersion) -> ProtocolResult<Frame> {
        let fields = self.fields(version)?;
        encode_message(&fields)
    }
}

// ============================================================================
// Request catalogue
// ============================================================================

/// Oldest gateway that understands `req`, with a short feature name.
///
/// `None` means any gateway in the supported range accepts it.
pub fn min_version(req: &OutboundRequest) -> Option<(&'static str, i32)> {
    let gate = match req {
        OutboundRequest::MarketDataType { .. } => ("market data type", sv::REQ_MARKET_DATA_TYPE),
        OutboundRequest::MatchingSymbols { .. } => ("matching symbols", sv::REQ_MATCHING_SYMBOLS),
        OutboundRequest::Positions | OutboundRequest::CancelPositions => {
            ("positions", sv::POSITIONS)
        }
        OutboundRequest::AccountSummary { .. } | OutboundRequest::CancelAccountSummary { .. } => {
            ("account summary", sv::ACCOUNT_SUMMARY)
        }
        OutboundRequest::FundamentalData { .. } | OutboundRequest::CancelFundamentalData { .. } => {
            ("fundamental data", sv::FUNDAMENTAL_DATA)
        }
        OutboundRequest::HeadTimestamp { .. } => ("head timestamp", sv::REQ_HEAD_TIMESTAMP),
        OutboundRequest::CancelHeadTimestamp { .. } => {
            ("cancel head timestamp", sv::CANCEL_HEADTIMESTAMP)
        }
        OutboundRequest::HistogramData { .. } => ("histogram data", sv::REQ_HISTOGRAM),
        OutboundRequest::SecDefOptParams { .. } => {
            ("security definition option parameters", sv::SEC_DEF_OPT_PARAMS_REQ)
        }
        OutboundRequest::FamilyCodes => ("family codes", sv::REQ_FAMILY_CODES),
        OutboundRequest::MktDepthExchanges => {
            ("market depth exchanges", sv::REQ_MKT_DEPTH_EXCHANGES)
        }
        OutboundRequest::NewsProviders => ("news providers", sv::REQ_NEWS_PROVIDERS),
        OutboundRequest::MarketRule { .. } => ("market rules", sv::MARKET_RULES),
        OutboundRequest::Pnl { .. } | OutboundRequest::CancelPnl { .. } => ("pnl", sv::PNL),
        OutboundRequest::RealTimeBars { .. } | OutboundRequest::CancelRealTimeBars { .. } => {
            ("real time bars", sv::REAL_TIME_BARS)
        }
        OutboundRequest::MarketData {
            regulatory_snapshot: true,
            ..
        } => ("regulatory snapshot", sv::REQ_SMART_COMPONENTS),
        OutboundRequest::MarketData { snapshot: true, .. } => {
            ("snapshot market data", sv::SNAPSHOT_MKT_DATA)
        }
        OutboundRequest::HistoricalData(h) if h.keep_up_to_date => {
            ("historical data updates", sv::SYNT_REALTIME_BARS)
        }
        _ => return None,
    };
    Some(gate)
}

/// Slot layout of `req`.
pub fn builder_for(req: &OutboundRequest) -> MessageBuilder {
    use OutboundRequest as R;

    match req {
        R::StartApi {
            client_id,
            optional_capabilities,
        } => MessageBuilder::new(OutgoingId::StartApi)
            .field("version", 2)
            .field("client_id", *client_id)
            .since(sv::OPTIONAL_CAPABILITIES, "optional_capabilities", optional_capabilities),

        R::CurrentTime => versioned(OutgoingId::ReqCurrentTime, 1),
        R::Ids { num_ids } => versioned(OutgoingId::ReqIds, 1).field("num_ids", *num_ids),
        R::ManagedAccounts => versioned(OutgoingId::ReqManagedAccts, 1),
        R::MarketDataType { market_data_type } => versioned(OutgoingId::ReqMarketDataType, 1)
            .field("market_data_type", *market_data_type),

        R::MarketData {
            req_id,
            contract,
            generic_tick_list,
            snapshot,
            regulatory_snapshot,
            options,
        } => {
            let b = versioned(OutgoingId::ReqMktData, 11)
                .field("req_id", *req_id)
                .since(sv::REQ_MKT_DATA_CONID, "con_id", contract.con_id);
            let b = contract_fields(b, contract)
                .since(sv::TRADING_CLASS, "trading_class", &contract.trading_class);
            let b = combo_legs(b, contract);
            let b = b.group_since(sv::DELTA_NEUTRAL, |b| match &contract.delta_neutral_contract {
                Some(dn) => b
                    .field("delta_neutral", true)
                    .field("delta_neutral_con_id", dn.con_id)
                    .field("delta_neutral_delta", dn.delta)
                    .field("delta_neutral_price", dn.price),
                None => b.field("delta_neutral", false),
            });
            b.field("generic_tick_list", generic_tick_list)
                .since(sv::SNAPSHOT_MKT_DATA, "snapshot", *snapshot)
                .since(sv::REQ_SMART_COMPONENTS, "regulatory_snapshot", *regulatory_snapshot)
                .since(sv::LINKING, "mkt_data_options", tag_values(options))
        }
        R::CancelMarketData { req_id } => {
            versioned(OutgoingId::CancelMktData, 2).field("req_id", *req_id)
        }

        R::ContractDetails { req_id, contract } => {
            let b = versioned(OutgoingId::ReqContractData, 8)
                .since(sv::CONTRACT_DATA_CHAIN, "req_id", *req_id)
                .since(sv::CONTRACT_CONID, "con_id", contract.con_id)
                .field("symbol", &contract.symbol)
                .field("sec_type", contract.sec_type.as_str())
                .field("last_trade_date", last_trade(contract))
                .field("strike", contract.strike.unwrap_or(0.0))
                .field("right", right(contract))
                .field("multiplier", multiplier(contract))
                .field("exchange", &contract.exchange)
                .since(sv::PRIMARYEXCH, "primary_exchange", &contract.primary_exchange)
                .field("currency", &contract.currency)
                .field("local_symbol", &contract.local_symbol)
                .since(sv::TRADING_CLASS, "trading_class", &contract.trading_class)
                .field("include_expired", contract.include_expired);
            b.since(sv::SEC_ID_TYPE, "sec_id_type", &contract.sec_id_type)
                .since(sv::SEC_ID_TYPE, "sec_id", &contract.sec_id)
                .since(sv::BOND_ISSUERID, "issuer_id", &contract.issuer_id)
        }

        R::MatchingSymbols { req_id, pattern } => {
            MessageBuilder::new(OutgoingId::ReqMatchingSymbols)
                .field("req_id", *req_id)
                .required("pattern", non_empty(pattern))
        }

        R::Positions => versioned(OutgoingId::ReqPositions, 1),
        R::CancelPositions => versioned(OutgoingId::CancelPositions, 1),

        R::AccountSummary { req_id, group, tags } => {
            versioned(OutgoingId::ReqAccountSummary, 1)
                .field("req_id", *req_id)
                .required("group", non_empty(group))
                .required("tags", non_empty(tags))
        }
        R::CancelAccountSummary { req_id } => {
            versioned(OutgoingId::CancelAccountSummary, 1).field("req_id", *req_id)
        }

        R::FundamentalData {
            req_id,
            contract,
            report_type,
            options,
        } => versioned(OutgoingId::ReqFundamentalData, 2)
            .field("req_id", *req_id)
            .since(sv::TRADING_CLASS, "con_id", contract.con_id)
            .field("symbol", &contract.symbol)
            .field("sec_type", contract.sec_type.as_str())
            .field("exchange", &contract.exchange)
            .field("primary_exchange", &contract.primary_exchange)
            .field("currency", &contract.currency)
            .field("local_symbol", &contract.local_symbol)
            .required("report_type", non_empty(report_type))
            .group_since(sv::LINKING, |b| {
                b.field("options_count", options.len() as i32)
                    .field("options", tag_values(options))
            }),
        R::CancelFundamentalData { req_id } => {
            versioned(OutgoingId::CancelFundamentalData, 1).field("req_id", *req_id)
        }

        R::HistoricalData(h) => historical_data(h),
        R::CancelHistoricalData { req_id } => {
            versioned(OutgoingId::CancelHistoricalData, 1).field("req_id", *req_id)
        }

        R::HeadTimestamp {
            req_id,
            contract,
            what_to_show,
            use_rth,
            format_date,
        } => {
            let b = MessageBuilder::new(OutgoingId::ReqHeadTimestamp)
                .field("req_id", *req_id)
                .field("con_id", contract.con_id);
            contract_fields(b, contract)
                .field("trading_class", &contract.trading_class)
                .field("include_expired", contract.include_expired)
                .field("use_rth", *use_rth)
                .required("what_to_show", non_empty(what_to_show))
                .field("format_date", *format_date)
        }
        R::CancelHeadTimestamp { req_id } => {
            MessageBuilder::new(OutgoingId::CancelHeadTimestamp).field("req_id", *req_id)
        }

        R::HistogramData {
            req_id,
            contract,
            use_rth,
            time_period,
        } => {
            let b = MessageBuilder::new(OutgoingId::ReqHistogramData)
                .field("req_id", *req_id)
                .field("con_id", contract.con_id);
            contract_fields(b, contract)
                .field("trading_class", &contract.trading_class)
                .field("include_expired", contract.include_expired)
                .field("use_rth", *use_rth)
                .required("time_period", non_empty(time_period))
        }

        R::SecDefOptParams {
            req_id,
            underlying_symbol,
            fut_fop_exchange,
            underlying_sec_type,
            underlying_con_id,
        } => MessageBuilder::new(OutgoingId::ReqSecDefOptParams)
            .field("req_id", *req_id)
            .required("underlying_symbol", non_empty(underlying_symbol))
            .field("fut_fop_exchange", fut_fop_exchange)
            .field("underlying_sec_type", underlying_sec_type)
            .field("underlying_con_id", *underlying_con_id),

        R::FamilyCodes => MessageBuilder::new(OutgoingId::ReqFamilyCodes),
        R::MktDepthExchanges => MessageBuilder::new(OutgoingId::ReqMktDepthExchanges),
        R::NewsProviders => MessageBuilder::new(OutgoingId::ReqNewsProviders),
        R::MarketRule { market_rule_id } => MessageBuilder::new(OutgoingId::ReqMarketRule)
            .field("market_rule_id", *market_rule_id),

        R::Pnl {
            req_id,
            account,
            model_code,
        } => MessageBuilder::new(OutgoingId::ReqPnl)
            .field("req_id", *req_id)
            .required("account", non_empty(account))
            .field("model_code", model_code),
        R::CancelPnl { req_id } => MessageBuilder::new(OutgoingId::CancelPnl).field("req_id", *req_id),

        R::RealTimeBars {
            req_id,
            contract,
            bar_size,
            what_to_show,
            use_rth,
            options,
        } => {
            let b = versioned(OutgoingId::ReqRealTimeBars, 3)
                .field("req_id", *req_id)
                .since(sv::TRADING_CLASS, "con_id", contract.con_id);
            contract_fields(b, contract)
                .since(sv::TRADING_CLASS, "trading_class", &contract.trading_class)
                .field("bar_size", *bar_size)
                .required("what_to_show", non_empty(what_to_show))
                .field("use_rth", *use_rth)
                .since(sv::LINKING, "options", tag_values(options))
        }
        R::CancelRealTimeBars { req_id } => {
            versioned(OutgoingId::CancelRealTimeBars, 1).field("req_id", *req_id)
        }

        R::ScannerParameters => versioned(OutgoingId::ReqScannerParameters, 1),
    }
}

/// Encodes `req` for a gateway at `version`.
pub fn encode_request(req: &OutboundRequest, version: ProtocolVersion) -> ProtocolResult<Frame> {
    builder_for(req).encode(version)
}

fn historical_data(h: &HistoricalDataRequest) -> MessageBuilder {
    let c = &h.contract;
    let b = MessageBuilder::new(OutgoingId::ReqHistoricalData)
        .before(sv::SYNT_REALTIME_BARS, "version", 6)
        .field("req_id", h.req_id)
        .since(sv::TRADING_CLASS, "con_id", c.con_id);
    let b = contract_fields(b, c)
        .since(sv::TRADING_CLASS, "trading_class", &c.trading_class)
        .field("include_expired", c.include_expired)
        .field("end_date_time", &h.end_date_time)
        .required("bar_size", non_empty(&h.bar_size))
        .required("duration", non_empty(&h.duration))
        .field("use_rth", h.use_rth)
        .required("what_to_show", non_empty(&h.what_to_show))
        .field("format_date", h.format_date);
    combo_legs(b, c)
        .since(sv::SYNT_REALTIME_BARS, "keep_up_to_date", h.keep_up_to_date)
        .since(sv::LINKING, "chart_options", tag_values(&h.chart_options))
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn versioned(id: OutgoingId, version: i32) -> MessageBuilder {
    MessageBuilder::new(id).field("version", version)
}

/// symbol .. local_symbol, the block most contract-carrying requests share.
fn contract_fields(b: MessageBuilder, c: &Contract) -> MessageBuilder {
    b.field("symbol", &c.symbol)
        .field("sec_type", c.sec_type.as_str())
        .field("last_trade_date", last_trade(c))
        .field("strike", c.strike.unwrap_or(0.0))
        .field("right", right(c))
        .field("multiplier", multiplier(c))
        .field("exchange", &c.exchange)
        .field("primary_exchange", &c.primary_exchange)
        .field("currency", &c.currency)
        .field("local_symbol", &c.local_symbol)
}

/// Count-prefixed combo legs, sent for `BAG` contracts only.
fn combo_legs(b: MessageBuilder, c: &Contract) -> MessageBuilder {
    b.when(c.sec_type == SecType::Bag, |b| {
        c.combo_legs.iter().fold(
            b.field("combo_legs_count", c.combo_legs.len() as i32),
            |b, leg| {
                b.field("leg_con_id", leg.con_id)
                    .field("leg_ratio", leg.ratio)
                    .field("leg_action", &leg.action)
                    .field("leg_exchange", &leg.exchange)
            },
        )
    })
}

fn last_trade(c: &Contract) -> &str {
    c.last_trade_date_or_contract_month.as_deref().unwrap_or("")
}

fn right(c: &Contract) -> &'static str {
    c.right.map(|r| r.as_str()).unwrap_or("")
}

fn multiplier(c: &Contract) -> &str {
    c.multiplier.as_deref().unwrap_or("")
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// `tag=value;tag=value;` as the gateway expects option lists.
fn tag_values(options: &[TagValue]) -> String {
    options
        .iter()
        .map(|tv| format!("{}={};", tv.tag, tv.value))
        .collect()
}
