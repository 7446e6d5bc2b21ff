//! Inbound message decoders.
//!
//! Each decoder receives a [`FieldReader`] positioned just after the
//! message id token, plus the negotiated version. Fields that only exist
//! from some version onwards are read behind `version.supports(..)`
//! checks; the thresholds live in [`crate::server_versions`].
//!
//! Several older messages also carry their own per-message version token
//! right after the id. Where the negotiated version makes that token
//! redundant the gateway stops sending it, and the decoder must not read
//! it either.

use gateway_core::{
    AccountSummaryEntry, Bar, Contract, ContractDescription, ContractDetails,
    DepthMktDataDescription, FamilyCode, HistogramEntry, InboundMessage, NewsProvider, Notice,
    OptionChain, Pnl, Position, PriceIncrement, RealTimeBar, Right, SecType, TagValue, TickAttrib,
    TickGeneric, TickPrice, TickReqParams, TickSize, TickString,
};

use crate::error::ProtocolResult;
use crate::field_codec::{unset_double_to_option, FieldReader, UNSET_DOUBLE};
use crate::server_versions as sv;
use crate::wire_types::{IncomingId, ProtocolVersion};

/// Decoder function for one inbound message type.
pub type Decoder = fn(&mut FieldReader, ProtocolVersion) -> ProtocolResult<InboundMessage>;

/// Decoder registered for `id`, if any.
///
/// Ids that are named but not listed here (orders, executions, news, ...)
/// surface as unknown messages.
pub fn decoder_for(id: IncomingId) -> Option<Decoder> {
    let decoder: Decoder = match id {
        IncomingId::TickPrice => decode_tick_price,
        IncomingId::TickSize => decode_tick_size,
        IncomingId::TickGeneric => decode_tick_generic,
        IncomingId::TickString => decode_tick_string,
        IncomingId::TickReqParams => decode_tick_req_params,
        IncomingId::TickSnapshotEnd => decode_tick_snapshot_end,
        IncomingId::MarketDataType => decode_market_data_type,
        IncomingId::ErrorMessage => decode_error_message,
        IncomingId::NextValidId => decode_next_valid_id,
        IncomingId::ManagedAccounts => decode_managed_accounts,
        IncomingId::CurrentTime => decode_current_time,
        IncomingId::ContractData => decode_contract_data,
        IncomingId::ContractDataEnd => decode_contract_data_end,
        IncomingId::SymbolSamples => decode_symbol_samples,
        IncomingId::PositionData => decode_position_data,
        IncomingId::PositionEnd => decode_position_end,
        IncomingId::AccountSummary => decode_account_summary,
        IncomingId::AccountSummaryEnd => decode_account_summary_end,
        IncomingId::Pnl => decode_pnl,
        IncomingId::FundamentalData => decode_fundamental_data,
        IncomingId::HistoricalData => decode_historical_data,
        IncomingId::RealTimeBars => decode_real_time_bars,
        IncomingId::HeadTimestamp => decode_head_timestamp,
        IncomingId::HistogramData => decode_histogram_data,
        IncomingId::SecurityDefinitionOptionParameter => decode_option_chain,
        IncomingId::SecurityDefinitionOptionParameterEnd => decode_option_chain_end,
        IncomingId::FamilyCodes => decode_family_codes,
        IncomingId::MktDepthExchanges => decode_mkt_depth_exchanges,
        IncomingId::NewsProviders => decode_news_providers,
        IncomingId::MarketRule => decode_market_rule,
        IncomingId::ScannerParameters => decode_scanner_parameters,
        _ => return None,
    };
    Some(decoder)
}

// ============================================================================
// Market data
// ============================================================================

fn decode_tick_price(r: &mut FieldReader, v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    r.read_i32()?; // message version
    let req_id = r.read_i32()?;
    let tick_type = r.read_i32()?;
    let price = r.read_f64()?;
    let size = r.read_f64()?;
    let mask = r.read_i32()?;

    let mut attrib = TickAttrib {
        can_auto_execute: mask == 1,
        ..Default::default()
    };
    if v.supports(sv::PAST_LIMIT) {
        attrib.can_auto_execute = mask & 1 != 0;
        attrib.past_limit = mask & 2 != 0;
        if v.supports(sv::PRE_OPEN_BID_ASK) {
            attrib.pre_open = mask & 4 != 0;
        }
    }

    Ok(InboundMessage::TickPrice(TickPrice {
        req_id,
        tick_type,
        price,
        size,
        attrib,
    }))
}

fn decode_tick_size(r: &mut FieldReader, _v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::TickSize(TickSize {
        req_id: r.read_i32()?,
        tick_type: r.read_i32()?,
        size: r.read_f64()?,
    }))
}

fn decode_tick_generic(r: &mut FieldReader, _v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::TickGeneric(TickGeneric {
        req_id: r.read_i32()?,
        tick_type: r.read_i32()?,
        value: r.read_f64()?,
    }))
}

fn decode_tick_string(r: &mut FieldReader, _v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::TickString(TickString {
        req_id: r.read_i32()?,
        tick_type: r.read_i32()?,
        value: r.read_str()?,
    }))
}

fn decode_tick_req_params(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    Ok(InboundMessage::TickReqParams(TickReqParams {
        req_id: r.read_i32()?,
        min_tick: r.read_f64()?,
        bbo_exchange: r.read_str()?,
        snapshot_permissions: r.read_i32()?,
    }))
}

fn decode_tick_snapshot_end(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::TickSnapshotEnd {
        req_id: r.read_i32()?,
    })
}

fn decode_market_data_type(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::MarketDataType {
        req_id: r.read_i32()?,
        market_data_type: r.read_i32()?,
    })
}

fn decode_real_time_bars(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::RealTimeBar(RealTimeBar {
        req_id: r.read_i32()?,
        time: r.read_i64()?,
        open: r.read_f64()?,
        high: r.read_f64()?,
        low: r.read_f64()?,
        close: r.read_f64()?,
        volume: r.read_f64()?,
        wap: r.read_f64()?,
        count: r.read_i32()?,
    }))
}

// ============================================================================
// Session / informational
// ============================================================================

fn decode_error_message(r: &mut FieldReader, v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    let id = r.read_i32()?;
    let code = r.read_i32()?;
    let message = r.read_str()?;
    let advanced_order_reject_json = if v.supports(sv::ADVANCED_ORDER_REJECT) {
        r.read_str()?
    } else {
        String::new()
    };

    Ok(InboundMessage::Notice(Notice {
        id,
        code,
        message,
        advanced_order_reject_json,
    }))
}

fn decode_next_valid_id(r: &mut FieldReader, _v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::NextValidId(r.read_i32()?))
}

fn decode_managed_accounts(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    let accounts = r
        .read_str()?
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();
    Ok(InboundMessage::ManagedAccounts(accounts))
}

fn decode_current_time(r: &mut FieldReader, _v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::CurrentTime(r.read_i64()?))
}

fn decode_scanner_parameters(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::ScannerParameters(r.read_str()?))
}

// ============================================================================
// Contracts
// ============================================================================

fn decode_contract_data(r: &mut FieldReader, v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    let version = if v.supports(sv::SIZE_RULES) {
        8
    } else {
        r.read_i32()?
    };
    let req_id = if version >= 3 { r.read_i32()? } else { -1 };

    let mut d = ContractDetails::default();
    d.contract.symbol = r.read_str()?;
    d.contract.sec_type = SecType::from_wire(&r.read_str()?);
    let (last_trade, last_trade_time) = split_last_trade_date(&r.read_str()?);
    d.contract.last_trade_date_or_contract_month = last_trade;
    d.last_trade_time = last_trade_time;
    d.contract.strike = strike_option(r.read_f64()?);
    d.contract.right = Right::from_wire(&r.read_str()?);
    d.contract.exchange = r.read_str()?;
    d.contract.currency = r.read_str()?;
    d.contract.local_symbol = r.read_str()?;
    d.market_name = r.read_str()?;
    d.contract.trading_class = r.read_str()?;
    d.contract.con_id = r.read_i32()?;
    d.min_tick = r.read_f64()?;
    if v.supports(sv::MD_SIZE_MULTIPLIER) && !v.supports(sv::SIZE_RULES) {
        r.read_i32()?; // md size multiplier, superseded by size rules
    }
    d.contract.multiplier = non_empty(r.read_str()?);
    d.order_types = r.read_str()?;
    d.valid_exchanges = r.read_str()?;
    d.price_magnifier = r.read_i32()?;

    if version >= 4 {
        d.under_con_id = r.read_i32()?;
    }
    if version >= 5 {
        d.long_name = r.read_str()?;
        d.contract.primary_exchange = r.read_str()?;
    }
    if version >= 6 {
        d.contract_month = r.read_str()?;
        d.industry = r.read_str()?;
        d.category = r.read_str()?;
        d.subcategory = r.read_str()?;
        d.time_zone_id = r.read_str()?;
        d.trading_hours = r.read_str()?;
        d.liquid_hours = r.read_str()?;
    }
    if version >= 8 {
        d.ev_rule = r.read_str()?;
        d.ev_multiplier = r.read_f64()?;
    }
    if version >= 7 {
        d.sec_id_list = r.read_group(read_tag_value)?;
    }

    if v.supports(sv::AGG_GROUP) {
        d.agg_group = Some(r.read_i32()?);
    }
    if v.supports(sv::UNDERLYING_INFO) {
        d.under_symbol = r.read_str()?;
        d.under_sec_type = r.read_str()?;
    }
    if v.supports(sv::MARKET_RULES) {
        d.market_rule_ids = r.read_str()?;
    }
    if v.supports(sv::REAL_EXPIRATION_DATE) {
        d.real_expiration_date = r.read_str()?;
    }
    if v.supports(sv::STOCK_TYPE) {
        d.stock_type = r.read_str()?;
    }
    if v.supports(sv::FRACTIONAL_SIZE_SUPPORT) && !v.supports(sv::SIZE_RULES) {
        r.read_f64()?; // size min tick, superseded by size rules
    }
    if v.supports(sv::SIZE_RULES) {
        d.min_size = unset_double_to_option(r.read_f64_unset()?);
        d.size_increment = unset_double_to_option(r.read_f64_unset()?);
        d.suggested_size_increment = unset_double_to_option(r.read_f64_unset()?);
    }

    Ok(InboundMessage::ContractDetails {
        req_id,
        details: Box::new(d),
    })
}

fn decode_contract_data_end(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::ContractDetailsEnd {
        req_id: r.read_i32()?,
    })
}

fn decode_symbol_samples(r: &mut FieldReader, v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    let req_id = r.read_i32()?;
    let descriptions = r.read_group(|r| {
        let mut contract = Contract {
            con_id: r.read_i32()?,
            symbol: r.read_str()?,
            sec_type: SecType::from_wire(&r.read_str()?),
            primary_exchange: r.read_str()?,
            currency: r.read_str()?,
            ..Default::default()
        };
        let derivative_sec_types = r.read_group(|r| r.read_str())?;
        if v.supports(sv::BOND_ISSUERID) {
            contract.description = r.read_str()?;
            contract.issuer_id = r.read_str()?;
        }
        Ok(ContractDescription {
            contract,
            derivative_sec_types,
        })
    })?;

    Ok(InboundMessage::SymbolSamples {
        req_id,
        descriptions,
    })
}

fn decode_option_chain(r: &mut FieldReader, _v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    Ok(InboundMessage::OptionChain(OptionChain {
        req_id: r.read_i32()?,
        exchange: r.read_str()?,
        underlying_con_id: r.read_i32()?,
        trading_class: r.read_str()?,
        multiplier: r.read_str()?,
        expirations: r.read_group(|r| r.read_str())?,
        strikes: r.read_group(|r| r.read_f64())?,
    }))
}

fn decode_option_chain_end(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    Ok(InboundMessage::OptionChainEnd {
        req_id: r.read_i32()?,
    })
}

fn decode_market_rule(r: &mut FieldReader, _v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    let market_rule_id = r.read_i32()?;
    let increments = r.read_group(|r| {
        Ok(PriceIncrement {
            low_edge: r.read_f64()?,
            increment: r.read_f64()?,
        })
    })?;
    Ok(InboundMessage::MarketRule {
        market_rule_id,
        increments,
    })
}

// ============================================================================
// Account
// ============================================================================

fn decode_position_data(r: &mut FieldReader, _v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    let version = r.read_i32()?;
    let account = r.read_str()?;

    let mut contract = Contract {
        con_id: r.read_i32()?,
        symbol: r.read_str()?,
        sec_type: SecType::from_wire(&r.read_str()?),
        ..Default::default()
    };
    contract.last_trade_date_or_contract_month = non_empty(r.read_str()?);
    contract.strike = strike_option(r.read_f64()?);
    contract.right = Right::from_wire(&r.read_str()?);
    contract.multiplier = non_empty(r.read_str()?);
    contract.exchange = r.read_str()?;
    contract.currency = r.read_str()?;
    contract.local_symbol = r.read_str()?;
    if version >= 2 {
        contract.trading_class = r.read_str()?;
    }

    let position = r.read_f64()?;
    let avg_cost = if version >= 3 { r.read_f64()? } else { 0.0 };

    Ok(InboundMessage::Position(Position {
        account,
        contract,
        position,
        avg_cost,
    }))
}

fn decode_position_end(r: &mut FieldReader, _v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::PositionEnd)
}

fn decode_account_summary(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::AccountSummary(AccountSummaryEntry {
        req_id: r.read_i32()?,
        account: r.read_str()?,
        tag: r.read_str()?,
        value: r.read_str()?,
        currency: r.read_str()?,
    }))
}

fn decode_account_summary_end(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::AccountSummaryEnd {
        req_id: r.read_i32()?,
    })
}

fn decode_pnl(r: &mut FieldReader, v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    let req_id = r.read_i32()?;
    let daily_pnl = r.read_f64()?;
    let unrealized = if v.supports(sv::UNREALIZED_PNL) {
        r.read_f64_unset()?
    } else {
        UNSET_DOUBLE
    };
    let realized = if v.supports(sv::REALIZED_PNL) {
        r.read_f64_unset()?
    } else {
        UNSET_DOUBLE
    };

    Ok(InboundMessage::Pnl(Pnl {
        req_id,
        daily_pnl,
        unrealized_pnl: unset_double_to_option(unrealized),
        realized_pnl: unset_double_to_option(realized),
    }))
}

fn decode_family_codes(r: &mut FieldReader, _v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    let codes = r.read_group(|r| {
        Ok(FamilyCode {
            account_id: r.read_str()?,
            family_code: r.read_str()?,
        })
    })?;
    Ok(InboundMessage::FamilyCodes(codes))
}

// ============================================================================
// Reference / historical data
// ============================================================================

fn decode_fundamental_data(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    r.read_i32()?;
    Ok(InboundMessage::FundamentalData {
        req_id: r.read_i32()?,
        data: r.read_str()?,
    })
}

fn decode_historical_data(r: &mut FieldReader, v: ProtocolVersion) -> ProtocolResult<InboundMessage> {
    let synthetic = v.supports(sv::SYNT_REALTIME_BARS);
    let version = if synthetic { i32::MAX } else { r.read_i32()? };
    let req_id = r.read_i32()?;

    let (start, end) = if version >= 2 {
        (r.read_str()?, r.read_str()?)
    } else {
        (String::new(), String::new())
    };

    let bars = r.read_group(|r| {
        let date = r.read_str()?;
        let open = r.read_f64()?;
        let high = r.read_f64()?;
        let low = r.read_f64()?;
        let close = r.read_f64()?;
        let volume = r.read_f64()?;
        let wap = r.read_f64()?;
        if !synthetic {
            r.read_str()?; // has-gaps flag, no longer meaningful
        }
        let bar_count = if version >= 3 { r.read_i32()? } else { -1 };
        Ok(Bar {
            date,
            open,
            high,
            low,
            close,
            volume,
            wap,
            bar_count,
        })
    })?;

    Ok(InboundMessage::HistoricalData {
        req_id,
        start,
        end,
        bars,
    })
}

fn decode_head_timestamp(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    Ok(InboundMessage::HeadTimestamp {
        req_id: r.read_i32()?,
        timestamp: r.read_str()?,
    })
}

fn decode_histogram_data(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    let req_id = r.read_i32()?;
    let entries = r.read_group(|r| {
        Ok(HistogramEntry {
            price: r.read_f64()?,
            size: r.read_f64()?,
        })
    })?;
    Ok(InboundMessage::HistogramData { req_id, entries })
}

fn decode_mkt_depth_exchanges(
    r: &mut FieldReader,
    v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    let venues = r.read_group(|r| {
        if v.supports(sv::SERVICE_DATA_TYPE) {
            Ok(DepthMktDataDescription {
                exchange: r.read_str()?,
                sec_type: r.read_str()?,
                listing_exchange: r.read_str()?,
                service_data_type: r.read_str()?,
                agg_group: Some(r.read_i32()?),
            })
        } else {
            let exchange = r.read_str()?;
            let sec_type = r.read_str()?;
            let deep2 = r.read_bool()?;
            Ok(DepthMktDataDescription {
                exchange,
                sec_type,
                listing_exchange: String::new(),
                service_data_type: if deep2 { "Deep2" } else { "Deep" }.to_string(),
                agg_group: None,
            })
        }
    })?;
    Ok(InboundMessage::MktDepthExchanges(venues))
}

fn decode_news_providers(
    r: &mut FieldReader,
    _v: ProtocolVersion,
) -> ProtocolResult<InboundMessage> {
    let providers = r.read_group(|r| {
        Ok(NewsProvider {
            code: r.read_str()?,
            name: r.read_str()?,
        })
    })?;
    Ok(InboundMessage::NewsProviders(providers))
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn read_tag_value(r: &mut FieldReader) -> ProtocolResult<TagValue> {
    Ok(TagValue {
        tag: r.read_str()?,
        value: r.read_str()?,
    })
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// The gateway sends `0` (or nothing) for contracts without a strike.
fn strike_option(strike: f64) -> Option<f64> {
    if strike == 0.0 || strike == UNSET_DOUBLE {
        None
    } else {
        Some(strike)
    }
}

/// `"20260116 16:00:00 US/Eastern"` → (`"20260116"`, `"16:00:00"`).
fn split_last_trade_date(raw: &str) -> (Option<String>, String) {
    let mut parts = raw.split_whitespace();
    let date = parts.next().map(str::to_string);
    let time = parts.next().unwrap_or_default().to_string();
    (date, time)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn reader(tokens: &[&str]) -> FieldReader {
        let mut payload = Vec::new();
        for t in tokens {
            payload.extend_from_slice(t.as_bytes());
            payload.push(0);
        }
        FieldReader::from_payload(&Bytes::from(payload))
    }

    fn decode(id: IncomingId, tokens: &[&str], v: i32) -> InboundMessage {
        let decoder = decoder_for(id).expect("decoder registered");
        let mut r = reader(tokens);
        let msg = decoder(&mut r, ProtocolVersion::new(v)).unwrap();
        assert_eq!(r.remaining(), 0, "decoder left tokens unread");
        msg
    }

    #[test]
    fn symbol_samples_issuer_fields_are_gated() {
        let base = [
            "7", "1", "265598", "AAPL", "STK", "NASDAQ", "USD", "2", "OPT", "WAR",
        ];
        let old = decode(IncomingId::SymbolSamples, &base, 175);
        let mut newer = base.to_vec();
        newer.extend_from_slice(&["APPLE INC", ""]);
        let new = decode(IncomingId::SymbolSamples, &newer, 176);

        match (old, new) {
            (
                InboundMessage::SymbolSamples { descriptions: a, .. },
                InboundMessage::SymbolSamples { descriptions: b, .. },
            ) => {
                assert_eq!(a[0].derivative_sec_types, vec!["OPT", "WAR"]);
                assert_eq!(a[0].contract.description, "");
                assert_eq!(b[0].contract.description, "APPLE INC");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn historical_data_with_and_without_version_token() {
        let modern = decode(
            IncomingId::HistoricalData,
            &[
                "4", "20260101", "20260102", "1", "20260101", "10", "11", "9", "10.5", "1000",
                "10.2", "42",
            ],
            176,
        );
        let legacy = decode(
            IncomingId::HistoricalData,
            &[
                "3", "4", "20260101", "20260102", "1", "20260101", "10", "11", "9", "10.5",
                "1000", "10.2", "false", "42",
            ],
            123,
        );
        assert_eq!(modern, legacy);
        if let InboundMessage::HistoricalData { bars, .. } = modern {
            assert_eq!(bars.len(), 1);
            assert_eq!(bars[0].bar_count, 42);
        }
    }

    #[test]
    fn error_message_reads_reject_json_only_when_negotiated() {
        let old = decode(IncomingId::ErrorMessage, &["2", "5", "200", "No security"], 165);
        let new = decode(
            IncomingId::ErrorMessage,
            &["2", "5", "200", "No security", "{}"],
            166,
        );
        assert_eq!(old.as_notice().unwrap().code, 200);
        assert_eq!(new.as_notice().unwrap().advanced_order_reject_json, "{}");
    }

    #[test]
    fn tick_price_attribute_bits_follow_version() {
        let pre = decode(IncomingId::TickPrice, &["3", "1", "1", "10.5", "100", "6"], 108);
        let post = decode(IncomingId::TickPrice, &["3", "1", "1", "10.5", "100", "6"], 132);
        match (pre, post) {
            (InboundMessage::TickPrice(a), InboundMessage::TickPrice(b)) => {
                assert_eq!(a.attrib, TickAttrib::default());
                assert!(b.attrib.past_limit && b.attrib.pre_open && !b.attrib.can_auto_execute);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn pnl_missing_fields_are_none() {
        let old = decode(IncomingId::Pnl, &["3", "12.5"], 127);
        let new = decode(IncomingId::Pnl, &["3", "12.5", "", "4"], 135);
        match (old, new) {
            (InboundMessage::Pnl(a), InboundMessage::Pnl(b)) => {
                assert_eq!(a.unrealized_pnl, None);
                assert_eq!(a.realized_pnl, None);
                assert_eq!(b.unrealized_pnl, None);
                assert_eq!(b.realized_pnl, Some(4.0));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn position_of_a_stock_has_no_strike() {
        let msg = decode(
            IncomingId::PositionData,
            &[
                "3", "DU123", "265598", "AAPL", "STK", "", "0", "", "", "NASDAQ", "USD", "AAPL",
                "NMS", "100", "150.25",
            ],
            176,
        );
        match msg {
            InboundMessage::Position(p) => {
                assert_eq!(p.contract.strike, None);
                assert_eq!(p.contract.right, None);
                assert_eq!(p.position, 100.0);
                assert_eq!(p.avg_cost, 150.25);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn option_chain_groups() {
        let msg = decode(
            IncomingId::SecurityDefinitionOptionParameter,
            &[
                "9", "SMART", "265598", "AAPL", "100", "2", "20260116", "20260220", "3", "100",
                "105", "110",
            ],
            176,
        );
        match msg {
            InboundMessage::OptionChain(c) => {
                assert_eq!(c.expirations.len(), 2);
                assert_eq!(c.strikes, vec![100.0, 105.0, 110.0]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn depth_exchanges_before_service_data_type() {
        let msg = decode(
            IncomingId::MktDepthExchanges,
            &["2", "ISLAND", "STK", "1", "ARCA", "STK", "0"],
            119,
        );
        match msg {
            InboundMessage::MktDepthExchanges(v) => {
                assert_eq!(v[0].service_data_type, "Deep2");
                assert_eq!(v[1].service_data_type, "Deep");
                assert!(v[0].agg_group.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn undecoded_ids_have_no_decoder() {
        assert!(decoder_for(IncomingId::OpenOrder).is_none());
        assert!(decoder_for(IncomingId::ExecutionData).is_none());
    }

    /// `contract_data` for AAPL laid out the way a gateway at `v` sends it.
    fn contract_data_tokens(v: i32) -> Vec<&'static str> {
        let mut t = Vec::new();
        if v < sv::SIZE_RULES {
            t.push("8");
        }
        t.extend([
            "9", "AAPL", "STK", "", "0", "", "SMART", "USD", "AAPL", "NMS", "NMS", "265598",
            "0.01",
        ]);
        if (sv::MD_SIZE_MULTIPLIER..sv::SIZE_RULES).contains(&v) {
            t.push("1");
        }
        t.extend([
            "", "ACTIVETIM,AD", "SMART,NASDAQ", "1", "0", "APPLE INC", "NASDAQ", "",
            "Technology", "Computers", "Computers", "US/Eastern", "20261016:0930-1600",
            "20261016:0930-1600", "", "0", "1", "ISIN", "US0378331005",
        ]);
        if v >= sv::AGG_GROUP {
            t.push("1");
        }
        if v >= sv::UNDERLYING_INFO {
            t.extend(["", ""]);
        }
        if v >= sv::MARKET_RULES {
            t.push("26,26");
        }
        if v >= sv::REAL_EXPIRATION_DATE {
            t.push("");
        }
        if v >= sv::STOCK_TYPE {
            t.push("COMMON");
        }
        if v == sv::FRACTIONAL_SIZE_SUPPORT {
            t.push("0.0001");
        }
        if v >= sv::SIZE_RULES {
            t.extend(["1", "0.0001", ""]);
        }
        t
    }

    fn contract_details(v: i32) -> ContractDetails {
        match decode(IncomingId::ContractData, &contract_data_tokens(v), v) {
            InboundMessage::ContractDetails { req_id, details } => {
                assert_eq!(req_id, 9);
                *details
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn contract_data_consumes_exactly_the_negotiated_layout() {
        for v in [100, 110, 121, 126, 134, 152, 163, 164, 176] {
            let d = contract_details(v);
            assert_eq!(d.contract.symbol, "AAPL", "v{v}");
            assert_eq!(d.contract.con_id, 265598, "v{v}");
            assert_eq!(d.contract.multiplier, None, "v{v}");
            assert_eq!(d.contract.primary_exchange, "NASDAQ", "v{v}");
            assert_eq!(d.min_tick, 0.01, "v{v}");
            assert_eq!(d.long_name, "APPLE INC", "v{v}");
            assert_eq!(d.sec_id_list.len(), 1, "v{v}");
            assert_eq!(d.agg_group.is_some(), v >= sv::AGG_GROUP, "v{v}");
        }
    }

    #[test]
    fn contract_data_size_fields_switch_at_size_rules() {
        let before = contract_details(sv::FRACTIONAL_SIZE_SUPPORT);
        assert_eq!(before.stock_type, "COMMON");
        assert_eq!(before.min_size, None);
        assert_eq!(before.size_increment, None);

        let after = contract_details(sv::SIZE_RULES);
        assert_eq!(after.stock_type, "COMMON");
        assert_eq!(after.min_size, Some(1.0));
        assert_eq!(after.size_increment, Some(0.0001));
        assert_eq!(after.suggested_size_increment, None);
    }

    #[test]
    fn contract_data_late_fields_are_gated() {
        let old = contract_details(sv::MARKET_RULES - 1);
        assert_eq!(old.market_rule_ids, "");
        assert_eq!(old.stock_type, "");

        let mid = contract_details(sv::REAL_EXPIRATION_DATE);
        assert_eq!(mid.market_rule_ids, "26,26");
        assert_eq!(mid.stock_type, "");

        assert_eq!(contract_details(sv::STOCK_TYPE).stock_type, "COMMON");
    }
}
