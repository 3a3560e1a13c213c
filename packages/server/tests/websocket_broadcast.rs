//! WebSocket integration tests.
//!
//! Connection acknowledgement, token check, subscription routing and the
//! order of events produced by queue mutations.

mod fixtures;
use fixtures::{TestServer, WsClient};

use navbat_server::ServerConfig;
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite};

#[tokio::test]
async fn test_connection_ack_on_connect() {
    // テスト項目: 接続直後に CONNECTION_ACK を受け取る
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let (_client, ack) = WsClient::connect(&server.ws_url()).await;

    // then (期待する結果):
    assert_eq!(ack["type"], "CONNECTION_ACK");
    assert!(ack["connectionId"].is_string());
    let health = server.get_json("/api/v1/health").await;
    assert_eq!(health["data"]["connections"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ack_precedes_events_under_concurrent_joins() {
    // テスト項目: 参加イベントが流れ続けていても、最初に届くのは CONNECTION_ACK
    // given (前提条件): 別タスクが購読なしの接続向けに参加を連続で発生させる
    let server = TestServer::start().await;
    let join_url = format!("{}/api/v1/queues/join", server.base_url());
    let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
    let joiner = tokio::spawn(async move {
        let http = reqwest::Client::new();
        for n in 0u32.. {
            if stop_rx.try_recv().is_ok() {
                break;
            }
            let _ = http
                .post(&join_url)
                .json(&json!({
                    "organizationId": "busy-org",
                    "serviceId": "svc1",
                    "userPhone": format!("+99890{n:07}"),
                }))
                .send()
                .await;
        }
    });

    // when (操作):
    let mut clients = Vec::new();
    for _ in 0..20 {
        let (client, first) = WsClient::connect(&server.ws_url()).await;

        // then (期待する結果):
        assert_eq!(first["type"], "CONNECTION_ACK", "got {first}");
        clients.push(client);
    }
    let _ = stop_tx.send(());
    joiner.await.unwrap();
}

#[tokio::test]
async fn test_invalid_token_is_rejected_with_401() {
    // テスト項目: トークンが一致しない接続は 401 で拒否される
    // given (前提条件):
    let server = TestServer::start_with(ServerConfig {
        access_tokens: vec!["secret".to_string()],
        ..ServerConfig::default()
    })
    .await;

    // when (操作):
    let rejected = connect_async(format!("{}?token=wrong", server.ws_url())).await;
    let accepted = connect_async(format!("{}?token=secret", server.ws_url())).await;

    // then (期待する結果):
    match rejected {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
        other => panic!("expected HTTP 401, got {other:?}"),
    }
    assert!(accepted.is_ok());
}

#[tokio::test]
async fn test_ping_pong() {
    // テスト項目: PING に PONG が返る
    let server = TestServer::start().await;
    let (mut client, _) = WsClient::connect(&server.ws_url()).await;

    client.send_json(json!({"type": "PING"})).await;

    let pong = client.next_json().await;
    assert_eq!(pong["type"], "PONG");
    assert!(pong["timestamp"].is_i64());
}

#[tokio::test]
async fn test_third_joiner_and_call_next_event_sequence() {
    // テスト項目: 3 人目の参加で number=3 の QUEUE_JOINED、先頭の呼び出しで
    //             QUEUE_CALLED 1 件 + POSITION_UPDATE 2 件 (2→1, 3→2) が届く
    // given (前提条件):
    let server = TestServer::start().await;
    let (mut client, _) = WsClient::connect(&server.ws_url()).await;
    client.subscribe("org1").await;
    server.join("org1", "+998901111111").await;
    server.join("org1", "+998902222222").await;
    assert_eq!(client.next_json().await["type"], "QUEUE_JOINED");
    assert_eq!(client.next_json().await["type"], "QUEUE_JOINED");

    // when (操作): 3 人目が参加
    server.join("org1", "+998903333333").await;

    // then (期待する結果):
    let joined = client.next_json().await;
    assert_eq!(joined["type"], "QUEUE_JOINED");
    assert_eq!(joined["organizationId"], "org1");
    assert_eq!(joined["data"]["number"], 3);

    // when (操作): 先頭を呼び出す
    server.post("/api/v1/organizations/org1/queue/call-next").await;

    // then (期待する結果):
    let called = client.next_json().await;
    assert_eq!(called["type"], "QUEUE_CALLED");
    assert_eq!(called["data"]["number"], 1);
    let first = client.next_json().await;
    assert_eq!(first["type"], "POSITION_UPDATE");
    assert_eq!(first["data"]["number"], 2);
    assert_eq!(first["data"]["position"], 1);
    let second = client.next_json().await;
    assert_eq!(second["type"], "POSITION_UPDATE");
    assert_eq!(second["data"]["number"], 3);
    assert_eq!(second["data"]["position"], 2);
}

#[tokio::test]
async fn test_events_route_by_subscription() {
    // テスト項目: orgA の購読者と購読なしの接続には届き、orgB の購読者には届かない
    // given (前提条件):
    let server = TestServer::start().await;
    let (mut sub_a, _) = WsClient::connect(&server.ws_url()).await;
    let (mut sub_b, _) = WsClient::connect(&server.ws_url()).await;
    let (mut unfiltered, _) = WsClient::connect(&server.ws_url()).await;
    sub_a.subscribe("orgA").await;
    sub_b.subscribe("orgB").await;

    // when (操作): REST のレスポンス時点でイベントは各接続のキューに入っている
    server.join("orgA", "+998901111111").await;

    // then (期待する結果):
    assert_eq!(sub_a.next_json().await["type"], "QUEUE_JOINED");
    assert_eq!(unfiltered.next_json().await["type"], "QUEUE_JOINED");
    // orgB の購読者は次に PONG を受け取る（イベントは届いていない）
    sub_b.sync().await;
}

#[tokio::test]
async fn test_require_subscription_blocks_unfiltered_connections() {
    // テスト項目: require_subscription=true では購読なしの接続にイベントが届かない
    let server = TestServer::start_with(ServerConfig {
        require_subscription: true,
        ..ServerConfig::default()
    })
    .await;
    let (mut unfiltered, _) = WsClient::connect(&server.ws_url()).await;

    server.join("orgA", "+998901111111").await;

    unfiltered.sync().await;
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    // テスト項目: UNSUBSCRIBE した組織のイベントは届かなくなる
    let server = TestServer::start().await;
    let (mut client, _) = WsClient::connect(&server.ws_url()).await;
    client.subscribe("orgA").await;
    client.subscribe("orgB").await;
    client
        .send_json(json!({"type": "UNSUBSCRIBE", "orgId": "orgA"}))
        .await;
    client.sync().await;

    server.join("orgA", "+998901111111").await;
    server.join("orgB", "+998902222222").await;

    let event = client.next_json().await;
    assert_eq!(event["type"], "QUEUE_JOINED");
    assert_eq!(event["organizationId"], "orgB");
}
