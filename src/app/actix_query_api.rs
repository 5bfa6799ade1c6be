use crate::{
    Result,
    app::{
        ledger_storage::LedgerError,
        query_api::{
            Query,
            QueryAPI,
            SessionView,
        },
        wager::{
            FlipRecord,
            FlipResolution,
            RewardOutcome,
            WagerError,
        },
    },
    records::{
        Address,
        FlipResult,
        GameEntry,
        MintRequest,
        NftEntry,
    },
};
use actix_cors::Cors;
use actix_web::{
    App,
    HttpResponse,
    HttpServer,
    dev::ServerHandle,
    error::ErrorInternalServerError,
    web,
};
use anyhow::{
    Context,
    anyhow,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    net::TcpListener,
    thread::JoinHandle,
};
use tokio::sync::{
    mpsc,
    oneshot,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct RecordGameDto {
    #[serde(default)]
    player: Option<String>,
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct FlipReportDto {
    result: FlipResult,
    win: bool,
    stake: String,
    game: GameEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reward: Option<NftEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reward_error: Option<String>,
}

impl From<FlipRecord> for FlipReportDto {
    fn from(record: FlipRecord) -> Self {
        let (reward, reward_error) = match record.reward {
            RewardOutcome::None => (None, None),
            RewardOutcome::Minted(entry) => (Some(entry), None),
            RewardOutcome::Failed { reason } => (None, Some(reason)),
        };
        Self {
            result: record.result,
            win: record.result.is_win(),
            stake: record.stake,
            game: record.game,
            reward,
            reward_error,
        }
    }
}

pub struct ActixQueryApi {
    receiver: mpsc::Receiver<Query>,
    base_url: String,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl ActixQueryApi {
    pub async fn new(port: Option<u16>) -> Result<Self> {
        let (sender, receiver) = mpsc::channel(16);

        let listener = TcpListener::bind(("127.0.0.1", port.unwrap_or(0)))
            .context("failed to bind HTTP listener for query API")?;
        let address = listener
            .local_addr()
            .context("failed to read listener address")?;
        let base_url = format!("http://{}", address);

        tracing::info!("query API listening on {}", base_url);

        let server_sender = sender.clone();
        let server = HttpServer::new(move || {
            let sender = server_sender.clone();

            // The browser client is served from another origin.
            App::new()
                .app_data(web::Data::new(sender))
                .wrap(Cors::permissive())
                .route("/api/nfts/init", web::get().to(handle_init_nfts))
                .route("/api/nfts/global", web::get().to(handle_global_nfts))
                .route(
                    "/api/nfts/owned/{address}",
                    web::get().to(handle_owned_nfts),
                )
                .route(
                    "/api/nfts/purchased/{address}",
                    web::get().to(handle_purchased_nfts),
                )
                .route("/api/nfts", web::post().to(handle_mint_nft))
                .route("/api/games/{address}", web::get().to(handle_game_history))
                .route("/api/games", web::post().to(handle_record_game))
                .route("/api/flip", web::post().to(handle_flip))
                .route("/api/session", web::get().to(handle_session))
        })
        .listen(listener)
        .context("failed to start Actix server")?
        .run();

        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            let _ = sys.block_on(server);
        });

        Ok(Self {
            receiver,
            base_url,
            server_handle,
            server_thread: Some(server_thread),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl QueryAPI for ActixQueryApi {
    async fn query(&mut self) -> Result<Query> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| anyhow!("query server closed"))
    }
}

impl Drop for ActixQueryApi {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(true);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorBody {
        error: message.into(),
    })
}

fn ledger_error_response(error: LedgerError) -> HttpResponse {
    match error {
        LedgerError::Validation(_) => bad_request(error.to_string()),
        LedgerError::Storage(error) => {
            tracing::error!("ledger storage failure: {error:#}");
            HttpResponse::InternalServerError().json(ErrorBody {
                error: "internal server error".to_string(),
            })
        }
    }
}

async fn handle_init_nfts(
    sender: web::Data<mpsc::Sender<Query>>,
) -> actix_web::Result<HttpResponse> {
    tracing::info!("received catalog seed request");
    let (response_sender, response_receiver) = oneshot::channel();
    let query = Query::SeedCatalog(response_sender);

    sender
        .get_ref()
        .clone()
        .send(query)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward catalog seed query"))?;

    let outcome = response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("catalog seed responder dropped"))?;

    // The message does not depend on whether anything was inserted.
    Ok(match outcome {
        Ok(_) => HttpResponse::Ok().json(MessageBody {
            message: "Sample NFTs initialized".to_string(),
        }),
        Err(error) => ledger_error_response(error),
    })
}

async fn handle_global_nfts(
    sender: web::Data<mpsc::Sender<Query>>,
) -> actix_web::Result<HttpResponse> {
    tracing::info!("received global nft listing request");
    let (response_sender, response_receiver) = oneshot::channel();
    let query = Query::GlobalNfts(response_sender);

    sender
        .get_ref()
        .clone()
        .send(query)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward nft listing query"))?;

    let outcome = response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("nft listing responder dropped"))?;

    Ok(match outcome {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(error) => ledger_error_response(error),
    })
}

async fn handle_owned_nfts(
    sender: web::Data<mpsc::Sender<Query>>,
    owner: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    tracing::info!("received owned nft listing request");
    let owner = match owner.into_inner().parse::<Address>() {
        Ok(owner) => owner,
        Err(error) => return Ok(bad_request(error.to_string())),
    };
    let (response_sender, response_receiver) = oneshot::channel();
    let query = Query::owned_nfts(owner, response_sender);

    sender
        .get_ref()
        .clone()
        .send(query)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward owned nft query"))?;

    let outcome = response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("owned nft responder dropped"))?;

    Ok(match outcome {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(error) => ledger_error_response(error),
    })
}

async fn handle_purchased_nfts(
    sender: web::Data<mpsc::Sender<Query>>,
    owner: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    tracing::info!("received purchased nft listing request");
    let owner = match owner.into_inner().parse::<Address>() {
        Ok(owner) => owner,
        Err(error) => return Ok(bad_request(error.to_string())),
    };
    let (response_sender, response_receiver) = oneshot::channel();
    let query = Query::purchased_nfts(owner, response_sender);

    sender
        .get_ref()
        .clone()
        .send(query)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward purchased nft query"))?;

    let outcome = response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("purchased nft responder dropped"))?;

    Ok(match outcome {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(error) => ledger_error_response(error),
    })
}

async fn handle_mint_nft(
    sender: web::Data<mpsc::Sender<Query>>,
    request: web::Json<MintRequest>,
) -> actix_web::Result<HttpResponse> {
    tracing::info!("received mint request");
    let (response_sender, response_receiver) = oneshot::channel();
    let query = Query::mint_nft(request.into_inner(), response_sender);

    sender
        .get_ref()
        .clone()
        .send(query)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward mint query"))?;

    let outcome = response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("mint responder dropped"))?;

    Ok(match outcome {
        Ok(entry) => HttpResponse::Ok().json(entry),
        Err(error) => ledger_error_response(error),
    })
}

async fn handle_game_history(
    sender: web::Data<mpsc::Sender<Query>>,
    player: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    tracing::info!("received game history request");
    let player = match player.into_inner().parse::<Address>() {
        Ok(player) => player,
        Err(error) => return Ok(bad_request(error.to_string())),
    };
    let (response_sender, response_receiver) = oneshot::channel();
    let query = Query::game_history(player, response_sender);

    sender
        .get_ref()
        .clone()
        .send(query)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward game history query"))?;

    let outcome = response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("game history responder dropped"))?;

    Ok(match outcome {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(error) => ledger_error_response(error),
    })
}

async fn handle_record_game(
    sender: web::Data<mpsc::Sender<Query>>,
    body: web::Json<RecordGameDto>,
) -> actix_web::Result<HttpResponse> {
    tracing::info!("received game record request");
    let body = body.into_inner();
    let player = match body.player.unwrap_or_default().parse::<Address>() {
        Ok(player) => player,
        Err(error) => return Ok(bad_request(error.to_string())),
    };
    let result = match body.result.unwrap_or_default().parse::<FlipResult>() {
        Ok(result) => result,
        Err(error) => return Ok(bad_request(error.to_string())),
    };
    let (response_sender, response_receiver) = oneshot::channel();
    let query = Query::record_game(player, result, response_sender);

    sender
        .get_ref()
        .clone()
        .send(query)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward game record query"))?;

    let outcome = response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("game record responder dropped"))?;

    Ok(match outcome {
        Ok(entry) => HttpResponse::Ok().json(entry),
        Err(error) => ledger_error_response(error),
    })
}

async fn handle_flip(
    sender: web::Data<mpsc::Sender<Query>>,
) -> actix_web::Result<HttpResponse> {
    tracing::info!("received flip request");
    let (response_sender, response_receiver) = oneshot::channel();
    let query = Query::Flip(response_sender);

    sender
        .get_ref()
        .clone()
        .send(query)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward flip query"))?;

    let outcome = response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("flip responder dropped"))?;

    Ok(match outcome {
        Ok(FlipResolution::Settled(record)) => {
            HttpResponse::Ok().json(FlipReportDto::from(record))
        }
        Ok(FlipResolution::Ignored) => HttpResponse::Conflict().json(ErrorBody {
            error: "a flip is already in flight".to_string(),
        }),
        Err(WagerError::WalletRequired) => bad_request(WagerError::WalletRequired.to_string()),
        Err(WagerError::Storage(error)) => ledger_error_response(error),
    })
}

async fn handle_session(
    sender: web::Data<mpsc::Sender<Query>>,
) -> actix_web::Result<HttpResponse> {
    tracing::info!("received session request");
    let (response_sender, response_receiver) = oneshot::channel();
    let query = Query::Session(response_sender);

    sender
        .get_ref()
        .clone()
        .send(query)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward session query"))?;

    let view = response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("session responder dropped"))?;

    Ok(HttpResponse::Ok().json(view))
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::NftMetadata;
    use chrono::Utc;

    fn nft_entry(id: u64, owner: &str, name: &str) -> NftEntry {
        NftEntry {
            id,
            token_id: id.to_string(),
            owner: owner.parse().unwrap(),
            metadata: NftMetadata::new(name, "a test entry", "0.5", "img"),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn query__can_get_and_respond_to_the_global_listing() {
        // given
        let mut api = ActixQueryApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/api/nfts/global", api.base_url());
        let expected = vec![nft_entry(1, "0xaaa1", "Cyber Samurai")];
        let response_entries = expected.clone();

        let client_task = tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            response.json::<Vec<NftEntry>>().await.unwrap()
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::GlobalNfts(sender) = query {
            sender.send(Ok(response_entries)).unwrap();
        } else {
            panic!("expected global nft query got {:?}", query);
        }

        // then
        let response = client_task.await.unwrap();
        assert_eq!(response, expected);
    }

    #[tokio::test]
    async fn query__owned_listing_carries_the_normalized_owner() {
        // given
        let mut api = ActixQueryApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/api/nfts/owned/0xAbC1", api.base_url());

        let client_task = tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            response.json::<Vec<NftEntry>>().await.unwrap()
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::OwnedNfts(inner) = query {
            assert_eq!(inner.owner.as_str(), "0xabc1");
            inner.sender.send(Ok(Vec::new())).unwrap();
        } else {
            panic!("expected owned nft query got {:?}", query);
        }

        // then
        let response = client_task.await.unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn query__mint_round_trips_the_request_body() {
        // given
        let mut api = ActixQueryApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/api/nfts", api.base_url());
        let expected = nft_entry(7, "0xaaa1", "Neon Ninja");
        let response_entry = expected.clone();

        let client_task = tokio::spawn(async move {
            let response = client
                .post(url)
                .json(&serde_json::json!({
                    "name": "Neon Ninja",
                    "description": "a test entry",
                    "price": "0.5",
                    "image": "img",
                    "owner": "0xAAA1",
                }))
                .send()
                .await
                .unwrap();
            response.json::<NftEntry>().await.unwrap()
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::MintNft(inner) = query {
            assert_eq!(inner.request.name.as_deref(), Some("Neon Ninja"));
            assert_eq!(inner.request.owner.as_deref(), Some("0xAAA1"));
            inner.sender.send(Ok(response_entry)).unwrap();
        } else {
            panic!("expected mint query got {:?}", query);
        }

        // then
        let response = client_task.await.unwrap();
        assert_eq!(response, expected);
    }

    #[tokio::test]
    async fn query__validation_failures_are_bad_requests_with_an_error_body() {
        // given
        let api = ActixQueryApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/api/games", api.base_url());

        // when
        let response = client
            .post(url)
            .json(&serde_json::json!({ "player": "0xaaa1", "result": "sideways" }))
            .send()
            .await
            .unwrap();

        // then
        assert_eq!(response.status().as_u16(), 400);
        let body = response.json::<ErrorBody>().await.unwrap();
        assert_eq!(body.error, "flip result must be \"heads\" or \"tails\"");
        drop(api);
    }

    #[tokio::test]
    async fn query__storage_failures_are_internal_errors_with_a_generic_body() {
        // given
        let mut api = ActixQueryApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/api/nfts/global", api.base_url());

        let client_task = tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            (
                response.status().as_u16(),
                response.json::<ErrorBody>().await.unwrap(),
            )
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::GlobalNfts(sender) = query {
            sender
                .send(Err(LedgerError::Storage(anyhow!("disk full"))))
                .unwrap();
        } else {
            panic!("expected global nft query got {:?}", query);
        }

        // then
        let (status, body) = client_task.await.unwrap();
        assert_eq!(status, 500);
        assert_eq!(body.error, "internal server error");
    }

    #[tokio::test]
    async fn query__seeding_always_reports_the_fixed_message() {
        // given
        let mut api = ActixQueryApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/api/nfts/init", api.base_url());

        let client_task = tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            response.json::<MessageBody>().await.unwrap()
        });

        // when a second seed inserts nothing
        let query = api.query().await.unwrap();
        if let Query::SeedCatalog(sender) = query {
            sender.send(Ok(0)).unwrap();
        } else {
            panic!("expected seed query got {:?}", query);
        }

        // then
        let response = client_task.await.unwrap();
        assert_eq!(response.message, "Sample NFTs initialized");
    }

    #[tokio::test]
    async fn query__flip_without_a_wallet_is_a_bad_request() {
        // given
        let mut api = ActixQueryApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/api/flip", api.base_url());

        let client_task = tokio::spawn(async move {
            let response = client.post(url).send().await.unwrap();
            (
                response.status().as_u16(),
                response.json::<ErrorBody>().await.unwrap(),
            )
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::Flip(sender) = query {
            sender.send(Err(WagerError::WalletRequired)).unwrap();
        } else {
            panic!("expected flip query got {:?}", query);
        }

        // then
        let (status, body) = client_task.await.unwrap();
        assert_eq!(status, 400);
        assert_eq!(body.error, "connect your wallet before flipping");
    }

    #[tokio::test]
    async fn query__concurrent_flip_is_a_conflict() {
        // given
        let mut api = ActixQueryApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/api/flip", api.base_url());

        let client_task = tokio::spawn(async move {
            let response = client.post(url).send().await.unwrap();
            response.status().as_u16()
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::Flip(sender) = query {
            sender.send(Ok(FlipResolution::Ignored)).unwrap();
        } else {
            panic!("expected flip query got {:?}", query);
        }

        // then
        assert_eq!(client_task.await.unwrap(), 409);
    }

    #[tokio::test]
    async fn query__session_reports_the_active_address() {
        // given
        let mut api = ActixQueryApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/api/session", api.base_url());

        let client_task = tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            response.json::<SessionView>().await.unwrap()
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::Session(sender) = query {
            sender
                .send(SessionView {
                    address: Some("0xaaa1".parse().unwrap()),
                })
                .unwrap();
        } else {
            panic!("expected session query got {:?}", query);
        }

        // then
        let view = client_task.await.unwrap();
        assert_eq!(view.address.unwrap().as_str(), "0xaaa1");
    }
}
