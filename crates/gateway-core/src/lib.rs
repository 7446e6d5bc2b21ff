//! gateway-core
//!
//! Transport-agnostic data for the gateway client:
//! - contract model (security type, option right, combo legs)
//! - decoded business records (details, positions, bars, ...)
//! - outbound request catalogue and inbound message union

pub mod sec_type;
pub mod contract;
pub mod records;
pub mod messages;

pub use sec_type::{Right, SecType};

pub use contract::{ComboLeg, Contract, DeltaNeutralContract, TagValue};

pub use records::{
    AccountSummaryEntry,
    Bar,
    ContractDescription,
    ContractDetails,
    DepthMktDataDescription,
    FamilyCode,
    HistogramEntry,
    NewsProvider,
    Notice,
    OptionChain,
    Pnl,
    Position,
    PriceIncrement,
    RealTimeBar,
    TickAttrib,
    TickGeneric,
    TickPrice,
    TickReqParams,
    TickSize,
    TickString,
};

pub use messages::{HistoricalDataRequest, InboundMessage, OutboundRequest};
