//! Low-level wire types and constants.
//!
//! This module defines:
//! - Message type IDs for outbound (client → gateway) and inbound
//!   (gateway → client) messages. The two keyspaces are independent:
//!   outbound `1` is "request market data", inbound `1` is "tick price".
//! - The negotiated protocol version and the supported client range.
//! - Framing limits.

use std::fmt;

/// Lowest protocol version this client can speak.
pub const MIN_CLIENT_VERSION: i32 = 100;

/// Highest protocol version this client can speak.
pub const MAX_CLIENT_VERSION: i32 = 176;

/// Fixed ASCII prefix written before the version-range frame.
pub const API_PREFIX: &[u8] = b"API\0";

/// Largest frame payload the gateway is allowed to send.
pub const MAX_FRAME_LEN: usize = 0x00FF_FFFF;

/// Size of the big-endian length prefix in front of every frame.
pub const FRAME_HEADER_LEN: usize = 4;

/// Protocol version agreed during the handshake.
///
/// Set once per connection and never changed; encoders and decoders
/// compare it against per-field thresholds to decide which optional
/// fields are present on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(i32);

impl ProtocolVersion {
    pub const fn new(negotiated: i32) -> Self {
        ProtocolVersion(negotiated)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    /// `negotiated >= threshold`.
    pub const fn supports(self, threshold: i32) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `"v<min>..<max>"` string announced during the handshake.
pub fn version_range() -> String {
    format!("v{}..{}", MIN_CLIENT_VERSION, MAX_CLIENT_VERSION)
}

/// Shared shape of the two id enums, so tables can be built generically.
pub trait WireId: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];
    fn id(self) -> i32;
    fn name(self) -> &'static str;
}

macro_rules! wire_ids {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident = $id:literal => $wire_name:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[repr(i32)]
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $id,)*
        }

        impl $name {
            /// Every id in this direction, in ascending order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn from_i32(v: i32) -> Option<Self> {
                match v {
                    $($id => Some($name::$variant),)*
                    _ => None,
                }
            }

            pub fn id(self) -> i32 {
                self as i32
            }

            /// Symbolic snake_case name.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $wire_name,)*
                }
            }
        }

        impl WireId for $name {
            const ALL: &'static [$name] = $name::ALL;

            fn id(self) -> i32 {
                $name::id(self)
            }

            fn name(self) -> &'static str {
                $name::name(self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", self.name(), self.id())
            }
        }
    };
}

wire_ids! {
    /// Outbound message ids (client → gateway).
    pub enum OutgoingId {
        ReqMktData = 1 => "req_mkt_data",
        CancelMktData = 2 => "cancel_mkt_data",
        PlaceOrder = 3 => "place_order",
        CancelOrder = 4 => "cancel_order",
        ReqOpenOrders = 5 => "req_open_orders",
        ReqAcctData = 6 => "req_acct_data",
        ReqExecutions = 7 => "req_executions",
        ReqIds = 8 => "req_ids",
        ReqContractData = 9 => "req_contract_data",
        ReqMktDepth = 10 => "req_mkt_depth",
        CancelMktDepth = 11 => "cancel_mkt_depth",
        ReqNewsBulletins = 12 => "req_news_bulletins",
        CancelNewsBulletins = 13 => "cancel_news_bulletins",
        SetServerLogLevel = 14 => "set_server_loglevel",
        ReqAutoOpenOrders = 15 => "req_auto_open_orders",
        ReqAllOpenOrders = 16 => "req_all_open_orders",
        ReqManagedAccts = 17 => "req_managed_accts",
        ReqFa = 18 => "req_fa",
        ReplaceFa = 19 => "replace_fa",
        ReqHistoricalData = 20 => "req_historical_data",
        ExerciseOptions = 21 => "exercise_options",
        ReqScannerSubscription = 22 => "req_scanner_subscription",
        CancelScannerSubscription = 23 => "cancel_scanner_subscription",
        ReqScannerParameters = 24 => "req_scanner_parameters",
        CancelHistoricalData = 25 => "cancel_historical_data",
        ReqCurrentTime = 49 => "req_current_time",
        ReqRealTimeBars = 50 => "req_real_time_bars",
        CancelRealTimeBars = 51 => "cancel_real_time_bars",
        ReqFundamentalData = 52 => "req_fundamental_data",
        CancelFundamentalData = 53 => "cancel_fundamental_data",
        ReqCalcImpliedVolat = 54 => "req_calc_implied_volat",
        ReqCalcOptionPrice = 55 => "req_calc_option_price",
        CancelCalcImpliedVolat = 56 => "cancel_calc_implied_volat",
        CancelCalcOptionPrice = 57 => "cancel_calc_option_price",
        ReqGlobalCancel = 58 => "req_global_cancel",
        ReqMarketDataType = 59 => "req_market_data_type",
        ReqPositions = 61 => "req_positions",
        ReqAccountSummary = 62 => "req_account_summary",
        CancelAccountSummary = 63 => "cancel_account_summary",
        CancelPositions = 64 => "cancel_positions",
        VerifyRequest = 65 => "verify_request",
        VerifyMessage = 66 => "verify_message",
        QueryDisplayGroups = 67 => "query_display_groups",
        SubscribeToGroupEvents = 68 => "subscribe_to_group_events",
        UpdateDisplayGroup = 69 => "update_display_group",
        UnsubscribeFromGroupEvents = 70 => "unsubscribe_from_group_events",
        StartApi = 71 => "start_api",
        VerifyAndAuthRequest = 72 => "verify_and_auth_request",
        VerifyAndAuthMessage = 73 => "verify_and_auth_message",
        ReqPositionsMulti = 74 => "req_positions_multi",
        CancelPositionsMulti = 75 => "cancel_positions_multi",
        ReqAccountUpdatesMulti = 76 => "req_account_updates_multi",
        CancelAccountUpdatesMulti = 77 => "cancel_account_updates_multi",
        ReqSecDefOptParams = 78 => "req_sec_def_opt_params",
        ReqSoftDollarTiers = 79 => "req_soft_dollar_tiers",
        ReqFamilyCodes = 80 => "req_family_codes",
        ReqMatchingSymbols = 81 => "req_matching_symbols",
        ReqMktDepthExchanges = 82 => "req_mkt_depth_exchanges",
        ReqSmartComponents = 83 => "req_smart_components",
        ReqNewsArticle = 84 => "req_news_article",
        ReqNewsProviders = 85 => "req_news_providers",
        ReqHistoricalNews = 86 => "req_historical_news",
        ReqHeadTimestamp = 87 => "req_head_timestamp",
        ReqHistogramData = 88 => "req_histogram_data",
        CancelHistogramData = 89 => "cancel_histogram_data",
        CancelHeadTimestamp = 90 => "cancel_head_timestamp",
        ReqMarketRule = 91 => "req_market_rule",
        ReqPnl = 92 => "req_pnl",
        CancelPnl = 93 => "cancel_pnl",
        ReqPnlSingle = 94 => "req_pnl_single",
        CancelPnlSingle = 95 => "cancel_pnl_single",
        ReqHistoricalTicks = 96 => "req_historical_ticks",
        ReqTickByTickData = 97 => "req_tick_by_tick_data",
        CancelTickByTickData = 98 => "cancel_tick_by_tick_data",
        ReqCompletedOrders = 99 => "req_completed_orders",
        ReqWshMetaData = 100 => "req_wsh_meta_data",
        CancelWshMetaData = 101 => "cancel_wsh_meta_data",
        ReqWshEventData = 102 => "req_wsh_event_data",
        CancelWshEventData = 103 => "cancel_wsh_event_data",
        ReqUserInfo = 104 => "req_user_info",
    }
}

wire_ids! {
    /// Inbound message ids (gateway → client).
    pub enum IncomingId {
        TickPrice = 1 => "tick_price",
        TickSize = 2 => "tick_size",
        OrderStatus = 3 => "order_status",
        ErrorMessage = 4 => "error_message",
        OpenOrder = 5 => "open_order",
        AccountValue = 6 => "account_value",
        PortfolioValue = 7 => "portfolio_value",
        AccountUpdateTime = 8 => "account_update_time",
        NextValidId = 9 => "next_valid_id",
        ContractData = 10 => "contract_data",
        ExecutionData = 11 => "execution_data",
        MarketDepth = 12 => "market_depth",
        MarketDepthL2 = 13 => "market_depth_l2",
        NewsBulletins = 14 => "news_bulletins",
        ManagedAccounts = 15 => "managed_accounts",
        ReceiveFa = 16 => "receive_fa",
        HistoricalData = 17 => "historical_data",
        BondContractData = 18 => "bond_contract_data",
        ScannerParameters = 19 => "scanner_parameters",
        ScannerData = 20 => "scanner_data",
        TickOptionComputation = 21 => "tick_option_computation",
        TickGeneric = 45 => "tick_generic",
        TickString = 46 => "tick_string",
        TickEfp = 47 => "tick_efp",
        CurrentTime = 49 => "current_time",
        RealTimeBars = 50 => "real_time_bars",
        FundamentalData = 51 => "fundamental_data",
        ContractDataEnd = 52 => "contract_data_end",
        OpenOrderEnd = 53 => "open_order_end",
        AccountDownloadEnd = 54 => "account_download_end",
        ExecutionDataEnd = 55 => "execution_data_end",
        DeltaNeutralValidation = 56 => "delta_neutral_validation",
        TickSnapshotEnd = 57 => "tick_snapshot_end",
        MarketDataType = 58 => "market_data_type",
        CommissionReport = 59 => "commission_report",
        PositionData = 61 => "position_data",
        PositionEnd = 62 => "position_end",
        AccountSummary = 63 => "account_summary",
        AccountSummaryEnd = 64 => "account_summary_end",
        VerifyMessageApi = 65 => "verify_message_api",
        VerifyCompleted = 66 => "verify_completed",
        DisplayGroupList = 67 => "display_group_list",
        DisplayGroupUpdated = 68 => "display_group_updated",
        VerifyAndAuthMessageApi = 69 => "verify_and_auth_message_api",
        VerifyAndAuthCompleted = 70 => "verify_and_auth_completed",
        PositionMulti = 71 => "position_multi",
        PositionMultiEnd = 72 => "position_multi_end",
        AccountUpdateMulti = 73 => "account_update_multi",
        AccountUpdateMultiEnd = 74 => "account_update_multi_end",
        SecurityDefinitionOptionParameter = 75 => "security_definition_option_parameter",
        SecurityDefinitionOptionParameterEnd = 76 => "security_definition_option_parameter_end",
        SoftDollarTiers = 77 => "soft_dollar_tiers",
        FamilyCodes = 78 => "family_codes",
        SymbolSamples = 79 => "symbol_samples",
        MktDepthExchanges = 80 => "mkt_depth_exchanges",
        TickReqParams = 81 => "tick_req_params",
        SmartComponents = 82 => "smart_components",
        NewsArticle = 83 => "news_article",
        TickNews = 84 => "tick_news",
        NewsProviders = 85 => "news_providers",
        HistoricalNews = 86 => "historical_news",
        HistoricalNewsEnd = 87 => "historical_news_end",
        HeadTimestamp = 88 => "head_timestamp",
        HistogramData = 89 => "histogram_data",
        HistoricalDataUpdate = 90 => "historical_data_update",
        RerouteMktDataReq = 91 => "reroute_mkt_data_req",
        RerouteMktDepthReq = 92 => "reroute_mkt_depth_req",
        MarketRule = 93 => "market_rule",
        Pnl = 94 => "pnl",
        PnlSingle = 95 => "pnl_single",
        HistoricalTicks = 96 => "historical_ticks",
        HistoricalTicksBidAsk = 97 => "historical_ticks_bid_ask",
        HistoricalTicksLast = 98 => "historical_ticks_last",
        TickByTick = 99 => "tick_by_tick",
        OrderBound = 100 => "order_bound",
        CompletedOrder = 101 => "completed_order",
        CompletedOrdersEnd = 102 => "completed_orders_end",
        ReplaceFaEnd = 103 => "replace_fa_end",
        WshMetaData = 104 => "wsh_meta_data",
        WshEventData = 105 => "wsh_event_data",
        HistoricalSchedule = 106 => "historical_schedule",
        UserInfo = 107 => "user_info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_are_independent_keyspaces() {
        assert_eq!(OutgoingId::from_i32(1), Some(OutgoingId::ReqMktData));
        assert_eq!(IncomingId::from_i32(1), Some(IncomingId::TickPrice));
        assert_ne!(OutgoingId::ReqMktData.name(), IncomingId::TickPrice.name());
    }

    #[test]
    fn gaps_in_the_id_space_are_unknown() {
        assert_eq!(IncomingId::from_i32(48), None);
        assert_eq!(OutgoingId::from_i32(60), None);
        assert_eq!(IncomingId::from_i32(0), None);
    }

    #[test]
    fn version_range_string() {
        assert_eq!(version_range(), "v100..176");
    }

    #[test]
    fn version_gate_is_inclusive() {
        let v = ProtocolVersion::new(108);
        assert!(v.supports(108));
        assert!(!v.supports(109));
    }
}
