//! High-level gateway client.
//!
//! Each correlated call is a thin wrapper: build the request, declare which
//! inbound messages answer it, run the correlator, pull the payload items
//! out of the collected messages.
//!
//! Calls that return lists use [`Reply`]: `None` for no data (or a
//! timeout), a bare item for one, the ordered list for more. Calls that
//! can only ever produce one item return `Option<T>`.

use std::sync::atomic::{AtomicI32, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use gateway_core::{
    AccountSummaryEntry, Bar, Contract, ContractDescription, ContractDetails,
    DepthMktDataDescription, FamilyCode, HistogramEntry, HistoricalDataRequest, InboundMessage,
    NewsProvider, OptionChain, OutboundRequest, Pnl, Position, PriceIncrement, TagValue,
};
use gateway_protocol::{
    encode_request, min_version, IncomingId, MessageRegistry, ProtocolVersion, ServerHello,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::correlation::{Correlated, Correlator, Expectation, Reply, StrayQueue};
use crate::error::{ClientError, ClientResult};
use crate::transport::{ConnectionState, Transport};

/// "No security definition found".
pub const CODE_NO_SECURITY_DEFINITION: i32 = 200;
/// Historical data farm: "query returned no data".
pub const CODE_HISTORICAL_NO_DATA: i32 = 162;
/// Request parameters rejected.
pub const CODE_REQUEST_VALIDATION: i32 = 321;
/// Requested market data is not subscribed.
pub const CODE_NOT_SUBSCRIBED: i32 = 354;
/// Historical data request cancelled by the gateway.
pub const CODE_HISTORICAL_CANCELLED: i32 = 366;
/// Fundamentals unavailable for the contract.
pub const CODE_FUNDAMENTALS_UNAVAILABLE: i32 = 430;

/// Connection to one gateway plus the correlation state around it.
pub struct GatewayClient {
    config: ClientConfig,
    pub(crate) transport: Transport,
    pub(crate) registry: MessageRegistry,
    pub(crate) strays: StrayQueue,
    next_req_id: AtomicI32,
    /// Held from send to finish so only one call is pending at a time.
    call_lock: Mutex<()>,
}

impl GatewayClient {
    /// A client that has not connected yet.
    pub fn new(config: ClientConfig) -> Self {
        GatewayClient {
            transport: Transport::new(config.read_timeout),
            registry: MessageRegistry::standard(),
            strays: StrayQueue::new(),
            next_req_id: AtomicI32::new(1),
            call_lock: Mutex::new(()),
            config,
        }
    }

    /// Builds a client and connects it.
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        let client = Self::new(config);
        client.start().await?;
        Ok(client)
    }

    /// Connects, negotiates the version, then identifies the session with
    /// `start_api`.
    pub async fn start(&self) -> ClientResult<ServerHello> {
        let options = Some(self.config.connect_options.as_str()).filter(|o| !o.is_empty());
        let hello = self
            .transport
            .connect(
                &self.config.socket_addr_string(),
                options,
                self.config.connect_timeout,
            )
            .await?;

        self.send(&OutboundRequest::StartApi {
            client_id: self.config.client_id,
            optional_capabilities: self.config.optional_capabilities.clone(),
        })
        .await?;
        info!(client_id = self.config.client_id, "API session started");

        Ok(hello)
    }

    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn server_version(&self) -> Option<ProtocolVersion> {
        self.transport.version()
    }

    pub fn connection_time(&self) -> Option<&str> {
        self.transport.connection_time()
    }

    /// Messages no call has claimed, oldest first.
    pub fn strays(&self) -> &StrayQueue {
        &self.strays
    }

    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    /// Fresh request id, unique for this client.
    pub fn next_request_id(&self) -> i32 {
        self.next_req_id.fetch_add(1, Ordering::Relaxed)
    }

    fn version(&self) -> ClientResult<ProtocolVersion> {
        self.transport.version().ok_or(ClientError::NotConnected)
    }

    /// Checks the call is supported and encodes it. Nothing is written.
    fn prepare(&self, req: &OutboundRequest) -> ClientResult<gateway_protocol::Frame> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let version = self.version()?;
        if let Some((feature, required)) = min_version(req) {
            if !version.supports(required) {
                return Err(ClientError::FeatureNotSupported {
                    feature,
                    required,
                    negotiated: version.get(),
                });
            }
        }
        Ok(encode_request(req, version)?)
    }

    /// Sends a request without waiting for any reply.
    pub async fn send(&self, req: &OutboundRequest) -> ClientResult<()> {
        let frame = self.prepare(req)?;
        self.transport.send_frame(&frame).await?;
        debug!("Sent request: {:?}", req);
        Ok(())
    }

    /// Sends `req` and collects its replies, reporting whether the call
    /// completed or timed out.
    ///
    /// Concurrent calls on one client queue up: the next request is not
    /// sent until the previous call has finished.
    pub async fn request_detailed(
        &self,
        req: &OutboundRequest,
        expectation: Expectation,
    ) -> ClientResult<Correlated<InboundMessage>> {
        let frame = self.prepare(req)?;
        let _call = self.call_lock.lock().await;
        debug!("Sending correlated request: {:?}", req);
        let correlator = Correlator {
            transport: &self.transport,
            registry: &self.registry,
            strays: &self.strays,
            version: self.version()?,
            request_timeout: self.config.request_timeout,
        };
        correlator.run(&frame, expectation).await
    }

    /// Like [`request_detailed`](Self::request_detailed), with a timeout
    /// reported as "no data".
    pub async fn request(
        &self,
        req: &OutboundRequest,
        expectation: Expectation,
    ) -> ClientResult<Option<Reply<InboundMessage>>> {
        Ok(self.request_detailed(req, expectation).await?.into_reply())
    }

    async fn collect<T, I, F>(
        &self,
        req: &OutboundRequest,
        expectation: Expectation,
        extract: F,
    ) -> ClientResult<Option<Reply<T>>>
    where
        F: FnMut(InboundMessage) -> I,
        I: IntoIterator<Item = T>,
    {
        Ok(self
            .request_detailed(req, expectation)
            .await?
            .flat_map(extract)
            .into_reply())
    }

    async fn collect_one<T, F>(
        &self,
        req: &OutboundRequest,
        expectation: Expectation,
        extract: F,
    ) -> ClientResult<Option<T>>
    where
        F: FnMut(InboundMessage) -> Option<T>,
    {
        let reply = self.collect(req, expectation, extract).await?;
        Ok(reply.and_then(|r| r.into_vec().into_iter().next()))
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Gateway clock.
    pub async fn current_time(&self) -> ClientResult<Option<DateTime<Utc>>> {
        self.collect_one(
            &OutboundRequest::CurrentTime,
            Expectation::single(IncomingId::CurrentTime),
            |m| match m {
                InboundMessage::CurrentTime(secs) => Utc.timestamp_opt(secs, 0).single(),
                _ => None,
            },
        )
        .await
    }

    /// Next order id the gateway will accept.
    pub async fn next_valid_id(&self) -> ClientResult<Option<i32>> {
        self.collect_one(
            &OutboundRequest::Ids { num_ids: 1 },
            Expectation::single(IncomingId::NextValidId),
            |m| match m {
                InboundMessage::NextValidId(id) => Some(id),
                _ => None,
            },
        )
        .await
    }

    pub async fn managed_accounts(&self) -> ClientResult<Option<Reply<String>>> {
        self.collect(
            &OutboundRequest::ManagedAccounts,
            Expectation::single(IncomingId::ManagedAccounts),
            |m| match m {
                InboundMessage::ManagedAccounts(accounts) => accounts,
                _ => Vec::new(),
            },
        )
        .await
    }

    // ========================================================================
    // Contracts
    // ========================================================================

    pub async fn contract_details(
        &self,
        contract: &Contract,
    ) -> ClientResult<Option<Reply<ContractDetails>>> {
        let req_id = self.next_request_id();
        self.collect(
            &OutboundRequest::ContractDetails {
                req_id,
                contract: contract.clone(),
            },
            Expectation::stream([IncomingId::ContractData], IncomingId::ContractDataEnd)
                .for_request(req_id)
                .with_early_codes([CODE_NO_SECURITY_DEFINITION]),
            |m| match m {
                InboundMessage::ContractDetails { details, .. } => Some(*details),
                _ => None,
            },
        )
        .await
    }

    /// Symbol search, e.g. `"AAP"`.
    pub async fn matching_symbols(
        &self,
        pattern: &str,
    ) -> ClientResult<Option<Reply<ContractDescription>>> {
        let req_id = self.next_request_id();
        self.collect(
            &OutboundRequest::MatchingSymbols {
                req_id,
                pattern: pattern.to_string(),
            },
            Expectation::single(IncomingId::SymbolSamples).for_request(req_id),
            |m| match m {
                InboundMessage::SymbolSamples { descriptions, .. } => descriptions,
                _ => Vec::new(),
            },
        )
        .await
    }

    pub async fn sec_def_opt_params(
        &self,
        underlying_symbol: &str,
        fut_fop_exchange: &str,
        underlying_sec_type: &str,
        underlying_con_id: i32,
    ) -> ClientResult<Option<Reply<OptionChain>>> {
        let req_id = self.next_request_id();
        self.collect(
            &OutboundRequest::SecDefOptParams {
                req_id,
                underlying_symbol: underlying_symbol.to_string(),
                fut_fop_exchange: fut_fop_exchange.to_string(),
                underlying_sec_type: underlying_sec_type.to_string(),
                underlying_con_id,
            },
            Expectation::stream(
                [IncomingId::SecurityDefinitionOptionParameter],
                IncomingId::SecurityDefinitionOptionParameterEnd,
            )
            .for_request(req_id)
            .with_early_codes([CODE_NO_SECURITY_DEFINITION, CODE_REQUEST_VALIDATION]),
            |m| match m {
                InboundMessage::OptionChain(chain) => Some(chain),
                _ => None,
            },
        )
        .await
    }

    pub async fn market_rule(
        &self,
        market_rule_id: i32,
    ) -> ClientResult<Option<Reply<PriceIncrement>>> {
        self.collect(
            &OutboundRequest::MarketRule { market_rule_id },
            Expectation::single(IncomingId::MarketRule),
            |m| match m {
                InboundMessage::MarketRule { increments, .. } => increments,
                _ => Vec::new(),
            },
        )
        .await
    }

    // ========================================================================
    // Account
    // ========================================================================

    /// All positions across accounts. The subscription is cancelled once
    /// the snapshot is complete.
    pub async fn positions(&self) -> ClientResult<Option<Reply<Position>>> {
        let reply = self
            .collect(
                &OutboundRequest::Positions,
                Expectation::stream([IncomingId::PositionData], IncomingId::PositionEnd),
                |m| match m {
                    InboundMessage::Position(p) => Some(p),
                    _ => None,
                },
            )
            .await?;
        self.send(&OutboundRequest::CancelPositions).await?;
        Ok(reply)
    }

    /// Account summary for `group` (usually `"All"`); `tags` is a comma
    /// separated list such as `"NetLiquidation,BuyingPower"`.
    pub async fn account_summary(
        &self,
        group: &str,
        tags: &str,
    ) -> ClientResult<Option<Reply<AccountSummaryEntry>>> {
        let req_id = self.next_request_id();
        let reply = self
            .collect(
                &OutboundRequest::AccountSummary {
                    req_id,
                    group: group.to_string(),
                    tags: tags.to_string(),
                },
                Expectation::stream([IncomingId::AccountSummary], IncomingId::AccountSummaryEnd)
                    .for_request(req_id)
                    .with_early_codes([CODE_REQUEST_VALIDATION]),
                |m| match m {
                    InboundMessage::AccountSummary(entry) => Some(entry),
                    _ => None,
                },
            )
            .await?;
        self.send(&OutboundRequest::CancelAccountSummary { req_id })
            .await?;
        Ok(reply)
    }

    /// First daily P&L update for `account`; the subscription is cancelled
    /// afterwards.
    pub async fn pnl(&self, account: &str, model_code: &str) -> ClientResult<Option<Pnl>> {
        let req_id = self.next_request_id();
        let pnl = self
            .collect_one(
                &OutboundRequest::Pnl {
                    req_id,
                    account: account.to_string(),
                    model_code: model_code.to_string(),
                },
                Expectation::single(IncomingId::Pnl)
                    .for_request(req_id)
                    .with_early_codes([CODE_REQUEST_VALIDATION]),
                |m| match m {
                    InboundMessage::Pnl(p) => Some(p),
                    _ => None,
                },
            )
            .await?;
        self.send(&OutboundRequest::CancelPnl { req_id }).await?;
        Ok(pnl)
    }

    pub async fn family_codes(&self) -> ClientResult<Option<Reply<FamilyCode>>> {
        self.collect(
            &OutboundRequest::FamilyCodes,
            Expectation::single(IncomingId::FamilyCodes),
            |m| match m {
                InboundMessage::FamilyCodes(codes) => codes,
                _ => Vec::new(),
            },
        )
        .await
    }

    // ========================================================================
    // Reference and historical data
    // ========================================================================

    /// Fundamentals report (XML) of `report_type`, e.g. `"ReportSnapshot"`.
    pub async fn fundamental_data(
        &self,
        contract: &Contract,
        report_type: &str,
        options: Vec<TagValue>,
    ) -> ClientResult<Option<String>> {
        let req_id = self.next_request_id();
        self.collect_one(
            &OutboundRequest::FundamentalData {
                req_id,
                contract: contract.clone(),
                report_type: report_type.to_string(),
                options,
            },
            Expectation::single(IncomingId::FundamentalData)
                .for_request(req_id)
                .with_early_codes([CODE_FUNDAMENTALS_UNAVAILABLE]),
            |m| match m {
                InboundMessage::FundamentalData { data, .. } => Some(data),
                _ => None,
            },
        )
        .await
    }

    /// Historical bars. `request.req_id` is replaced by a fresh id.
    pub async fn historical_data(
        &self,
        mut request: HistoricalDataRequest,
    ) -> ClientResult<Option<Reply<Bar>>> {
        request.req_id = self.next_request_id();
        let req_id = request.req_id;
        self.collect(
            &OutboundRequest::HistoricalData(request),
            Expectation::single(IncomingId::HistoricalData)
                .for_request(req_id)
                .with_early_codes([
                    CODE_HISTORICAL_NO_DATA,
                    CODE_NO_SECURITY_DEFINITION,
                    CODE_REQUEST_VALIDATION,
                    CODE_HISTORICAL_CANCELLED,
                ]),
            |m| match m {
                InboundMessage::HistoricalData { bars, .. } => bars,
                _ => Vec::new(),
            },
        )
        .await
    }

    /// Earliest available data point for `contract`.
    pub async fn head_timestamp(
        &self,
        contract: &Contract,
        what_to_show: &str,
        use_rth: bool,
    ) -> ClientResult<Option<String>> {
        let req_id = self.next_request_id();
        self.collect_one(
            &OutboundRequest::HeadTimestamp {
                req_id,
                contract: contract.clone(),
                what_to_show: what_to_show.to_string(),
                use_rth,
                format_date: 1,
            },
            Expectation::single(IncomingId::HeadTimestamp)
                .for_request(req_id)
                .with_early_codes([CODE_HISTORICAL_NO_DATA, CODE_NO_SECURITY_DEFINITION]),
            |m| match m {
                InboundMessage::HeadTimestamp { timestamp, .. } => Some(timestamp),
                _ => None,
            },
        )
        .await
    }

    /// Price histogram over `time_period`, e.g. `"3 days"`.
    pub async fn histogram_data(
        &self,
        contract: &Contract,
        use_rth: bool,
        time_period: &str,
    ) -> ClientResult<Option<Reply<HistogramEntry>>> {
        let req_id = self.next_request_id();
        self.collect(
            &OutboundRequest::HistogramData {
                req_id,
                contract: contract.clone(),
                use_rth,
                time_period: time_period.to_string(),
            },
            Expectation::single(IncomingId::HistogramData)
                .for_request(req_id)
                .with_early_codes([CODE_HISTORICAL_NO_DATA, CODE_NO_SECURITY_DEFINITION]),
            |m| match m {
                InboundMessage::HistogramData { entries, .. } => entries,
                _ => Vec::new(),
            },
        )
        .await
    }

    pub async fn mkt_depth_exchanges(
        &self,
    ) -> ClientResult<Option<Reply<DepthMktDataDescription>>> {
        self.collect(
            &OutboundRequest::MktDepthExchanges,
            Expectation::single(IncomingId::MktDepthExchanges),
            |m| match m {
                InboundMessage::MktDepthExchanges(venues) => venues,
                _ => Vec::new(),
            },
        )
        .await
    }

    pub async fn news_providers(&self) -> ClientResult<Option<Reply<NewsProvider>>> {
        self.collect(
            &OutboundRequest::NewsProviders,
            Expectation::single(IncomingId::NewsProviders),
            |m| match m {
                InboundMessage::NewsProviders(providers) => providers,
                _ => Vec::new(),
            },
        )
        .await
    }

    /// Scanner parameter catalogue (XML).
    pub async fn scanner_parameters(&self) -> ClientResult<Option<String>> {
        self.collect_one(
            &OutboundRequest::ScannerParameters,
            Expectation::single(IncomingId::ScannerParameters),
            |m| match m {
                InboundMessage::ScannerParameters(xml) => Some(xml),
                _ => None,
            },
        )
        .await
    }

    // ========================================================================
    // Market data
    // ========================================================================

    /// One-shot quote: every tick up to the gateway's snapshot end marker.
    pub async fn market_data_snapshot(
        &self,
        contract: &Contract,
        regulatory_snapshot: bool,
    ) -> ClientResult<Option<Reply<InboundMessage>>> {
        let req_id = self.next_request_id();
        self.request(
            &OutboundRequest::MarketData {
                req_id,
                contract: contract.clone(),
                generic_tick_list: String::new(),
                snapshot: true,
                regulatory_snapshot,
                options: Vec::new(),
            },
            Expectation::stream(
                [
                    IncomingId::TickPrice,
                    IncomingId::TickSize,
                    IncomingId::TickGeneric,
                    IncomingId::TickString,
                ],
                IncomingId::TickSnapshotEnd,
            )
            .for_request(req_id)
            .with_early_codes([CODE_NO_SECURITY_DEFINITION, CODE_NOT_SUBSCRIBED]),
        )
        .await
    }

    /// Starts a streaming subscription; ticks land in the stray queue.
    /// Returns the request id to cancel with.
    pub async fn req_market_data(
        &self,
        contract: &Contract,
        generic_tick_list: &str,
        options: Vec<TagValue>,
    ) -> ClientResult<i32> {
        let req_id = self.next_request_id();
        self.send(&OutboundRequest::MarketData {
            req_id,
            contract: contract.clone(),
            generic_tick_list: generic_tick_list.to_string(),
            snapshot: false,
            regulatory_snapshot: false,
            options,
        })
        .await?;
        Ok(req_id)
    }

    pub async fn cancel_market_data(&self, req_id: i32) -> ClientResult<()> {
        self.send(&OutboundRequest::CancelMarketData { req_id })
            .await
    }

    /// `1` live, `2` frozen, `3` delayed, `4` delayed frozen.
    pub async fn req_market_data_type(&self, market_data_type: i32) -> ClientResult<()> {
        if !(1..=4).contains(&market_data_type) {
            warn!(market_data_type, "unusual market data type requested");
        }
        self.send(&OutboundRequest::MarketDataType { market_data_type })
            .await
    }

    /// Five-second bars; they land in the stray queue. Returns the
    /// request id to cancel with.
    pub async fn req_real_time_bars(
        &self,
        contract: &Contract,
        what_to_show: &str,
        use_rth: bool,
    ) -> ClientResult<i32> {
        let req_id = self.next_request_id();
        self.send(&OutboundRequest::RealTimeBars {
            req_id,
            contract: contract.clone(),
            bar_size: 5,
            what_to_show: what_to_show.to_string(),
            use_rth,
            options: Vec::new(),
        })
        .await?;
        Ok(req_id)
    }

    pub async fn cancel_real_time_bars(&self, req_id: i32) -> ClientResult<()> {
        self.send(&OutboundRequest::CancelRealTimeBars { req_id })
            .await
    }

    pub async fn cancel_historical_data(&self, req_id: i32) -> ClientResult<()> {
        self.send(&OutboundRequest::CancelHistoricalData { req_id })
            .await
    }

    pub async fn cancel_head_timestamp(&self, req_id: i32) -> ClientResult<()> {
        self.send(&OutboundRequest::CancelHeadTimestamp { req_id })
            .await
    }

    pub async fn cancel_fundamental_data(&self, req_id: i32) -> ClientResult<()> {
        self.send(&OutboundRequest::CancelFundamentalData { req_id })
            .await
    }
}
