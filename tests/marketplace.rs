#![allow(non_snake_case)]
use cyberflip::{
    records::NftEntry,
    test_helpers::TestContext,
};
use serde_json::{
    Value,
    json,
};

const BURNED: &str = "0x000000000000000000000000000000000000dead";

#[tokio::test]
async fn init__seeds_the_sample_catalog_exactly_once() {
    // given
    let ctx = TestContext::new().await;
    let client = reqwest::Client::new();
    let init_url = format!("{}/api/nfts/init", ctx.base_url());
    let global_url = format!("{}/api/nfts/global", ctx.base_url());

    // when
    let first = client.get(&init_url).send().await.unwrap();
    let second = client.get(&init_url).send().await.unwrap();

    // then both calls acknowledge with the same message
    let first = first.json::<Value>().await.unwrap();
    let second = second.json::<Value>().await.unwrap();
    assert_eq!(first["message"], "Sample NFTs initialized");
    assert_eq!(second["message"], "Sample NFTs initialized");

    // and the catalog was inserted once, owned by the burn address
    let entries = client
        .get(&global_url)
        .send()
        .await
        .unwrap()
        .json::<Vec<NftEntry>>()
        .await
        .unwrap();
    assert_eq!(entries.len(), 5);
    let names: Vec<_> = entries.iter().map(|e| e.metadata.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Cyber Samurai",
            "Digital Dragon",
            "Neon Ninja",
            "Quantum Queen",
            "Cyber Phoenix",
        ]
    );
    assert!(entries.iter().all(|e| e.owner.as_str() == BURNED));
}

#[tokio::test]
async fn mint__creates_an_entry_for_the_given_owner() {
    // given
    let ctx = TestContext::new().await;
    let client = reqwest::Client::new();
    let mint_url = format!("{}/api/nfts", ctx.base_url());

    // when
    let response = client
        .post(&mint_url)
        .json(&json!({
            "name": "Holo Howl",
            "description": "a hand-minted test piece",
            "price": "0.25",
            "image": "data:image/png;base64,aGk=",
            "owner": "0xAbC1",
        }))
        .send()
        .await
        .unwrap();

    // then
    assert_eq!(response.status().as_u16(), 200);
    let entry = response.json::<NftEntry>().await.unwrap();
    assert_eq!(entry.owner.as_str(), "0xabc1");
    assert_eq!(entry.token_id, "1");
    assert_eq!(entry.metadata.name, "Holo Howl");

    // and the owned view matches case-insensitively
    let owned_url = format!("{}/api/nfts/owned/0xABC1", ctx.base_url());
    let owned = client
        .get(&owned_url)
        .send()
        .await
        .unwrap()
        .json::<Vec<NftEntry>>()
        .await
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].metadata.name, "Holo Howl");
}

#[tokio::test]
async fn mint__with_a_missing_field_changes_nothing() {
    // given
    let ctx = TestContext::new().await;
    let client = reqwest::Client::new();
    let mint_url = format!("{}/api/nfts", ctx.base_url());
    let global_url = format!("{}/api/nfts/global", ctx.base_url());

    // when the price is absent
    let response = client
        .post(&mint_url)
        .json(&json!({
            "name": "Holo Howl",
            "description": "a hand-minted test piece",
            "image": "data:image/png;base64,aGk=",
            "owner": "0xabc1",
        }))
        .send()
        .await
        .unwrap();

    // then
    assert_eq!(response.status().as_u16(), 400);
    let body = response.json::<Value>().await.unwrap();
    assert_eq!(body["error"], "missing required field: price");

    let entries = client
        .get(&global_url)
        .send()
        .await
        .unwrap()
        .json::<Vec<NftEntry>>()
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn purchased__view_stays_empty() {
    // given a seeded catalog and a manual mint
    let ctx = TestContext::new().await;
    let client = reqwest::Client::new();
    client
        .get(format!("{}/api/nfts/init", ctx.base_url()))
        .send()
        .await
        .unwrap();
    client
        .post(format!("{}/api/nfts", ctx.base_url()))
        .json(&json!({
            "name": "Holo Howl",
            "description": "a hand-minted test piece",
            "price": "0.25",
            "image": "img",
            "owner": "0xabc1",
        }))
        .send()
        .await
        .unwrap();

    // when
    let purchased = client
        .get(format!("{}/api/nfts/purchased/0xabc1", ctx.base_url()))
        .send()
        .await
        .unwrap()
        .json::<Vec<NftEntry>>()
        .await
        .unwrap();

    // then no write path marks entries purchased
    assert!(purchased.is_empty());
}

#[tokio::test]
async fn games__recorded_results_show_up_in_the_player_history() {
    // given
    let ctx = TestContext::new().await;
    let client = reqwest::Client::new();
    let games_url = format!("{}/api/games", ctx.base_url());

    // when
    let recorded = client
        .post(&games_url)
        .json(&json!({ "player": "0xAbC1", "result": "tails" }))
        .send()
        .await
        .unwrap();

    // then
    assert_eq!(recorded.status().as_u16(), 200);
    let recorded = recorded.json::<Value>().await.unwrap();
    assert_eq!(recorded["player"], "0xabc1");
    assert_eq!(recorded["result"], "tails");
    assert_eq!(recorded["reward"], Value::Null);

    let history = client
        .get(format!("{}/api/games/0xabc1", ctx.base_url()))
        .send()
        .await
        .unwrap()
        .json::<Vec<Value>>()
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["result"], "tails");

    // and other players see nothing
    let other = client
        .get(format!("{}/api/games/0xother", ctx.base_url()))
        .send()
        .await
        .unwrap()
        .json::<Vec<Value>>()
        .await
        .unwrap();
    assert!(other.is_empty());
}
