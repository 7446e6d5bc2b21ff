// crates/gateway-client/tests/session.rs
mod common;

use std::time::Duration;

use anyhow::Result;
use common::{config, spawn, spawn_with_greeting, CONNECTION_TIME};
use gateway_client::{ClientError, ConnectionState, GatewayClient};
use gateway_core::{InboundMessage, OutboundRequest};
use tokio::sync::mpsc;

fn tokens(t: &[&str]) -> Vec<String> {
    t.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn handshake_negotiates_version_and_starts_api() -> Result<()> {
    let (port, server) = spawn(176, |gw| async move {
        assert_eq!(gw.announced, "v100..176");
        assert_eq!(gw.start_api, vec!["71", "2", "1", ""]);
        Ok(())
    })
    .await?;

    let client = GatewayClient::connect(config(port)).await?;
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.server_version().map(|v| v.get()), Some(176));
    assert_eq!(client.connection_time(), Some(CONNECTION_TIME));

    server.await??;
    Ok(())
}

#[tokio::test]
async fn connect_options_extend_the_version_range() -> Result<()> {
    let (port, server) = spawn(176, |gw| async move {
        assert_eq!(gw.announced, "v100..176 +PACEAPI");
        Ok(())
    })
    .await?;

    let mut cfg = config(port);
    cfg.connect_options = "+PACEAPI".into();
    let _client = GatewayClient::connect(cfg).await?;

    server.await??;
    Ok(())
}

#[tokio::test]
async fn gateway_below_minimum_version_is_rejected() -> Result<()> {
    let (port, _server) = spawn(99, |gw| async move {
        drop(gw);
        Ok(())
    })
    .await?;

    match GatewayClient::connect(config(port)).await {
        Err(ClientError::UnsupportedServerVersion { server: 99, min: 100 }) => {}
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_gateway_is_a_connection_error() -> Result<()> {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let l = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        l.local_addr()?.port()
    };
    let err = GatewayClient::connect(config(port)).await.err().expect("must fail");
    assert!(matches!(err, ClientError::Connection { .. }), "{err}");
    Ok(())
}

#[tokio::test]
async fn calls_before_connect_and_after_disconnect_fail_fast() -> Result<()> {
    let (port, server) = spawn(176, |mut gw| async move {
        gw.idle(Duration::from_millis(200)).await;
        Ok(())
    })
    .await?;

    let client = GatewayClient::new(config(port));
    assert_eq!(client.state(), ConnectionState::Unknown);
    assert!(matches!(client.current_time().await, Err(ClientError::NotConnected)));

    client.start().await?;
    assert!(client.is_connected());

    client.disconnect().await;
    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(matches!(client.positions().await, Err(ClientError::NotConnected)));
    assert!(matches!(client.start().await, Err(ClientError::ReconnectUnsupported)));

    server.await??;
    Ok(())
}

#[tokio::test]
async fn messages_sent_with_the_handshake_become_strays() -> Result<()> {
    let greeting = vec![
        tokens(&["9", "1", "1000"]),
        tokens(&["15", "1", "DU1,DU2"]),
    ];
    let (port, server) = spawn_with_greeting(176, greeting, |mut gw| async move {
        assert_eq!(gw.read_request().await?, vec!["49", "1"]);
        gw.send(&["49", "1", "1760606400"]).await?;
        Ok(())
    })
    .await?;

    let client = GatewayClient::connect(config(port)).await?;
    assert!(client.current_time().await?.is_some());
    assert_eq!(
        client.strays().snapshot(),
        vec![
            InboundMessage::NextValidId(1000),
            InboundMessage::ManagedAccounts(vec!["DU1".into(), "DU2".into()]),
        ]
    );

    server.await??;
    Ok(())
}

#[tokio::test]
async fn feature_newer_than_gateway_is_refused_locally() -> Result<()> {
    let (port, server) = spawn(107, |mut gw| async move {
        // Nothing was sent for the refused call.
        assert_eq!(gw.read_request().await?, vec!["49", "1"]);
        gw.send(&["49", "1", "1"]).await?;
        Ok(())
    })
    .await?;

    let client = GatewayClient::connect(config(port)).await?;
    match client.matching_symbols("AAP").await {
        Err(ClientError::FeatureNotSupported {
            required: 108,
            negotiated: 107,
            ..
        }) => {}
        other => panic!("unexpected: {other:?}"),
    }
    assert!(client.current_time().await?.is_some());

    server.await??;
    Ok(())
}

#[tokio::test]
async fn gateway_closing_mid_call_is_reported() -> Result<()> {
    let (port, server) = spawn(176, |mut gw| async move {
        gw.read_request().await?;
        drop(gw);
        Ok(())
    })
    .await?;

    let client = GatewayClient::connect(config(port)).await?;
    assert!(matches!(
        client.current_time().await,
        Err(ClientError::ConnectionClosed)
    ));
    assert!(!client.is_connected());

    server.await??;
    Ok(())
}

#[tokio::test]
async fn dispatch_forwards_queued_then_live_messages() -> Result<()> {
    let greeting = vec![tokens(&["9", "1", "1000"])];
    let (port, server) = spawn_with_greeting(176, greeting, |mut gw| async move {
        gw.idle(Duration::from_millis(100)).await;
        gw.send(&["1", "6", "5", "1", "189.5", "300", "0"]).await?;
        gw.send(&["999", "opaque"]).await?;
        gw.send(&["9", "1"]).await?; // truncated next_valid_id
        Ok(())
    })
    .await?;

    let client = GatewayClient::connect(config(port)).await?;
    client.strays().push(InboundMessage::CurrentTime(1));

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.dispatch_into(tx).await?;

    let mut events = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        events.push(msg);
    }

    assert_eq!(events.len(), 5, "{events:?}");
    assert_eq!(events[0], InboundMessage::CurrentTime(1));
    assert_eq!(events[1], InboundMessage::NextValidId(1000));
    assert!(matches!(&events[2], InboundMessage::TickPrice(t) if t.req_id == 5));
    assert!(matches!(&events[3], InboundMessage::Unrecognized { wire_id: 999, name: None, .. }));
    assert!(matches!(
        &events[4],
        InboundMessage::Unrecognized { wire_id: 9, name: Some("next_valid_id"), .. }
    ));

    server.await??;
    Ok(())
}

#[tokio::test]
async fn end_of_stream_releases_the_socket() -> Result<()> {
    let (port, server) = spawn(176, |mut gw| async move {
        gw.read_request().await?;
        gw.shutdown_write().await?;
        // The client never calls disconnect: its socket must close anyway.
        gw.wait_for_close(Duration::from_secs(2)).await
    })
    .await?;

    let client = GatewayClient::connect(config(port)).await?;
    assert!(matches!(
        client.current_time().await,
        Err(ClientError::ConnectionClosed)
    ));
    assert_eq!(client.state(), ConnectionState::Disconnected);

    server.await??;
    assert!(matches!(
        client.send(&OutboundRequest::CurrentTime).await,
        Err(ClientError::NotConnected)
    ));
    Ok(())
}
