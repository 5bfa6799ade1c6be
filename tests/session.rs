#![allow(non_snake_case)]
use cyberflip::{
    app::{
        query_api::SessionView,
        wallet_provider::ProviderNotification,
    },
    records::FlipResult,
    test_helpers::TestContext,
};
use serde_json::Value;
use std::time::Duration;

async fn session_address(ctx: &TestContext) -> Option<String> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/session", ctx.base_url());
    let view = client
        .get(url)
        .send()
        .await
        .unwrap()
        .json::<SessionView>()
        .await
        .unwrap();
    view.address.map(|address| address.as_str().to_string())
}

/// Notifications are applied by the app loop, so observations may lag a poll
/// or two behind the push.
async fn wait_for_session_address(ctx: &TestContext, expected: Option<&str>) {
    for _ in 0..50 {
        let address = session_address(ctx).await;
        if address.as_deref() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session never reported address {expected:?}");
}

#[tokio::test]
async fn session__reports_the_connected_wallet() {
    // given
    let ctx = TestContext::new_with_wallet("0xAbC1").await;

    // when
    let address = session_address(&ctx).await;

    // then the stored address is the normalized form
    assert_eq!(address.as_deref(), Some("0xabc1"));
}

#[tokio::test]
async fn session__reports_none_without_a_wallet() {
    // given
    let ctx = TestContext::new().await;

    // when
    let address = session_address(&ctx).await;

    // then
    assert_eq!(address, None);
}

#[tokio::test]
async fn session__follows_account_change_notifications() {
    // given
    let ctx = TestContext::new_with_wallet("0xabc1").await;

    // when
    ctx.push_notification(ProviderNotification::AccountChanged(
        "0xbbb2".parse().unwrap(),
    ))
    .await;

    // then
    wait_for_session_address(&ctx, Some("0xbbb2")).await;
}

#[tokio::test]
async fn session__accounts_cleared_blocks_future_flips() {
    // given
    let ctx = TestContext::new_with_outcomes("0xabc1", vec![FlipResult::Heads]).await;

    // when
    ctx.push_notification(ProviderNotification::AccountsCleared)
        .await;
    wait_for_session_address(&ctx, None).await;

    // then
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/flip", ctx.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body = response.json::<Value>().await.unwrap();
    assert_eq!(body["error"], "connect your wallet before flipping");
}

#[tokio::test]
async fn session__network_change_rebuilds_from_a_silent_probe() {
    // given a session tracking an account switch away from the authorized one
    let ctx = TestContext::new_with_wallet("0xabc1").await;
    ctx.push_notification(ProviderNotification::AccountChanged(
        "0xbbb2".parse().unwrap(),
    ))
    .await;
    wait_for_session_address(&ctx, Some("0xbbb2")).await;

    // when
    ctx.push_notification(ProviderNotification::NetworkChanged {
        chain_id: "0x5".to_string(),
    })
    .await;

    // then the rebuilt session probes the provider's authorized account again
    wait_for_session_address(&ctx, Some("0xabc1")).await;

    // and pushes are ignored until the next connect
    ctx.push_notification(ProviderNotification::AccountChanged(
        "0xbbb2".parse().unwrap(),
    ))
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session_address(&ctx).await.as_deref(), Some("0xabc1"));
}
