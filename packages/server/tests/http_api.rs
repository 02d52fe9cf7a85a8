//! HTTP API integration tests.

mod fixtures;
use fixtures::TestServer;

#[tokio::test]
async fn test_health_endpoint() {
    // テスト項目: /api/health エンドポイントが正常に動作する
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // when (操作):
    let response = client
        .get(format!("{}/api/health", server.base_url()))
        .send()
        .await
        .expect("Failed to send request");

    // then (期待する結果):
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 0);
}

#[tokio::test]
async fn test_health_endpoint_counts_connections() {
    // テスト項目: /api/health が接続中のクライアント数を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let _alice = server.connect().await;
    let _bob = server.connect().await;

    // when (操作):
    let body: serde_json::Value = reqwest::get(format!("{}/api/health", server.base_url()))
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");

    // then (期待する結果):
    assert_eq!(body["connections"], 2);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    // テスト項目: 存在しないパスには 404 を返す
    let server = TestServer::start().await;

    let response = reqwest::get(format!("{}/api/rooms", server.base_url()))
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}
