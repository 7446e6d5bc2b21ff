//! gateway-client
//!
//! Async TCP client for the gateway protocol.
//!
//! - [`transport`]   : connect + handshake, framed reads and writes
//! - [`correlation`] : turns the multiplexed stream into request/reply calls
//! - [`client`]      : [`GatewayClient`] and its call catalogue
//! - [`dispatch`]    : event pump for asynchronous consumers
//! - [`config`]      : defaults, environment and TOML configuration
//!
//! ```no_run
//! # async fn demo() -> Result<(), gateway_client::ClientError> {
//! use gateway_client::{ClientConfig, GatewayClient};
//!
//! let client = GatewayClient::connect(ClientConfig::from_env()?).await?;
//! if let Some(hits) = client.matching_symbols("AAP").await? {
//!     for hit in hits {
//!         println!("{} {}", hit.contract.symbol, hit.contract.primary_exchange);
//!     }
//! }
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod config;
pub mod transport;
pub mod correlation;
pub mod client;
pub mod dispatch;

pub use error::{ClientError, ClientResult};
pub use config::ClientConfig;
pub use transport::{ConnectionState, Transport};
pub use correlation::{
    Correlated,
    Correlator,
    Expectation,
    Outcome,
    PendingRequest,
    Reply,
    RequestState,
    StrayQueue,
};
pub use client::GatewayClient;
