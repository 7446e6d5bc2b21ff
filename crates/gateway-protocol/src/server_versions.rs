//! Minimum negotiated versions at which optional fields, groups or whole
//! messages appear on the wire.
//!
//! These values are part of the gateway's public contract. Fields are
//! positional, so a wrong threshold shifts every later field of the
//! message.

pub const REAL_TIME_BARS: i32 = 34;
pub const SNAPSHOT_MKT_DATA: i32 = 35;
pub const CONTRACT_CONID: i32 = 37;
pub const CONTRACT_DATA_CHAIN: i32 = 40;
pub const FUNDAMENTAL_DATA: i32 = 40;
pub const DELTA_NEUTRAL: i32 = 40;
pub const SEC_ID_TYPE: i32 = 45;
pub const REQ_MKT_DATA_CONID: i32 = 47;
pub const REQ_MARKET_DATA_TYPE: i32 = 55;
pub const POSITIONS: i32 = 67;
pub const ACCOUNT_SUMMARY: i32 = 67;
pub const TRADING_CLASS: i32 = 68;
pub const LINKING: i32 = 70;
pub const OPTIONAL_CAPABILITIES: i32 = 72;
pub const PRIMARYEXCH: i32 = 75;
pub const SEC_DEF_OPT_PARAMS_REQ: i32 = 104;
pub const REQ_FAMILY_CODES: i32 = 107;
pub const REQ_MATCHING_SYMBOLS: i32 = 108;
pub const PAST_LIMIT: i32 = 109;
pub const MD_SIZE_MULTIPLIER: i32 = 110;
pub const REQ_MKT_DEPTH_EXCHANGES: i32 = 112;
pub const REQ_SMART_COMPONENTS: i32 = 114;
pub const REQ_NEWS_PROVIDERS: i32 = 115;
pub const REQ_HEAD_TIMESTAMP: i32 = 118;
pub const REQ_HISTOGRAM: i32 = 119;
pub const SERVICE_DATA_TYPE: i32 = 120;
pub const AGG_GROUP: i32 = 121;
pub const UNDERLYING_INFO: i32 = 122;
pub const CANCEL_HEADTIMESTAMP: i32 = 123;
pub const SYNT_REALTIME_BARS: i32 = 124;
pub const MARKET_RULES: i32 = 126;
pub const PNL: i32 = 127;
pub const UNREALIZED_PNL: i32 = 129;
pub const PRE_OPEN_BID_ASK: i32 = 132;
pub const REAL_EXPIRATION_DATE: i32 = 134;
pub const REALIZED_PNL: i32 = 135;
pub const STOCK_TYPE: i32 = 152;
pub const ENCODE_MSG_ASCII7: i32 = 153;
pub const FRACTIONAL_SIZE_SUPPORT: i32 = 163;
pub const SIZE_RULES: i32 = 164;
pub const ADVANCED_ORDER_REJECT: i32 = 166;
pub const BOND_ISSUERID: i32 = 176;
