//! Event pump for asynchronous consumers.
//!
//! Forwards everything the gateway pushes to an mpsc channel, starting with
//! whatever is already waiting in the stray queue. Undecodable messages are
//! forwarded as `InboundMessage::Unrecognized`, exactly as the correlation
//! engine queues them.

use gateway_core::InboundMessage;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::client::GatewayClient;
use crate::correlation::decode_frame;
use crate::error::{ClientError, ClientResult};

impl GatewayClient {
    /// Runs until the receiver is dropped or the gateway closes the
    /// connection; both end the pump with `Ok(())`.
    ///
    /// Do not run correlated calls on the same client while the pump is
    /// active: both would compete for inbound frames.
    pub async fn dispatch_into(&self, tx: UnboundedSender<InboundMessage>) -> ClientResult<()> {
        for msg in self.strays.drain() {
            if tx.send(msg).is_err() {
                return Ok(());
            }
        }

        let version = self
            .server_version()
            .ok_or(ClientError::NotConnected)?;

        loop {
            if tx.is_closed() {
                debug!("event receiver dropped, stopping dispatch");
                return Ok(());
            }

            let frames = match self.transport.receive_frames().await {
                Ok(frames) => frames,
                Err(ClientError::ConnectionClosed) => {
                    info!("gateway closed the connection, stopping dispatch");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            for frame in frames {
                let decoded = decode_frame(&self.registry, &frame, version);
                if tx.send(decoded.message).is_err() {
                    debug!("event receiver dropped, stopping dispatch");
                    return Ok(());
                }
            }
        }
    }
}
