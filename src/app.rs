use crate::{
    Result,
    app::{
        ledger_storage::{
            GameLedger,
            NftLedger,
        },
        query_api::{
            Query,
            QueryAPI,
            SessionView,
        },
        session::{
            SessionError,
            SessionUpdate,
            WalletSession,
        },
        wager::{
            FlipOracle,
            WagerEngine,
        },
        wallet_provider::WalletProvider,
    },
    catalog,
    records::Address,
};
use std::sync::Arc;

pub mod actix_query_api;
pub mod in_memory_ledger;
pub mod ledger_storage;
pub mod query_api;
pub mod session;
pub mod sled_ledger;
pub mod wager;
pub mod wallet_provider;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Continue,
    /// The wallet context is stale (network change); rebuild the session.
    Restart,
    Exit,
}

pub struct App<Provider, API, Nfts, Games, Oracle> {
    provider: Provider,
    api: API,
    nfts: Nfts,
    games: Games,
    session: WalletSession,
    wager: Arc<WagerEngine<Oracle>>,
}

impl<Provider, API, Nfts, Games, Oracle> App<Provider, API, Nfts, Games, Oracle> {
    pub fn new(
        provider: Provider,
        api: API,
        nfts: Nfts,
        games: Games,
        wager: WagerEngine<Oracle>,
    ) -> Self {
        Self {
            provider,
            api,
            nfts,
            games,
            session: WalletSession::new(),
            wager: Arc::new(wager),
        }
    }
}

impl<
    Provider: WalletProvider,
    API: QueryAPI,
    Nfts: NftLedger + Clone + Send + 'static,
    Games: GameLedger + Clone + Send + 'static,
    Oracle: FlipOracle + Send + 'static,
> App<Provider, API, Nfts, Games, Oracle>
{
    /// Adopts an already-authorized account without prompting.
    pub async fn probe_wallet(&mut self) -> Option<Address> {
        self.session.probe(&mut self.provider).await
    }

    /// Requests wallet authorization and subscribes to its notifications.
    pub async fn connect_wallet(&mut self) -> Result<Address, SessionError> {
        self.session.connect(&mut self.provider).await
    }

    /// Ends the session and drops its notification subscription.
    pub async fn disconnect_wallet(&mut self) -> Result<(), SessionError> {
        self.session.disconnect(&mut self.provider).await
    }

    /// A network change invalidates the session context, the way a page
    /// reload would. Start over from a silent probe.
    pub async fn reload_session(&mut self) {
        self.session = WalletSession::new();
        self.session.probe(&mut self.provider).await;
    }

    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> Result<RunState> {
        tokio::select! {
            notification = self.provider.next_notification() => {
                match notification {
                    Ok(notification) => {
                        match self.session.apply(notification) {
                            SessionUpdate::ReloadRequired => Ok(RunState::Restart),
                            SessionUpdate::Ignored
                            | SessionUpdate::AccountChanged(_)
                            | SessionUpdate::SessionEnded => Ok(RunState::Continue),
                        }
                    }
                    Err(error) => {
                        tracing::warn!("wallet notification stream failed: {error}");
                        Ok(RunState::Continue)
                    }
                }
            }
            query = self.api.query() => {
                match query {
                    Ok(query) => {
                        self.answer(query);
                        Ok(RunState::Continue)
                    }
                    Err(error) => Err(error),
                }
            }
            _ = shutdown => {
                Ok(RunState::Exit)
            }
        }
    }

    fn answer(&mut self, query: Query) {
        match query {
            Query::SeedCatalog(sender) => {
                let outcome = self
                    .nfts
                    .seed_if_empty(&catalog::sample_catalog(), &catalog::burn_address());
                if let Ok(inserted) = &outcome {
                    if *inserted > 0 {
                        tracing::info!("seeded {inserted} sample nft entries");
                    }
                }
                let _ = sender.send(outcome);
            }
            Query::GlobalNfts(sender) => {
                let _ = sender.send(self.nfts.list_all());
            }
            Query::OwnedNfts(query) => {
                let _ = query.sender.send(self.nfts.list_owned_by(&query.owner));
            }
            Query::PurchasedNfts(query) => {
                let _ = query.sender.send(self.nfts.list_purchased_by(&query.owner));
            }
            Query::MintNft(query) => {
                let _ = query.sender.send(self.nfts.mint(&query.request));
            }
            Query::GameHistory(query) => {
                let _ = query.sender.send(self.games.history(&query.player));
            }
            Query::RecordGame(query) => {
                let _ = query
                    .sender
                    .send(self.games.record(&query.player, query.result));
            }
            Query::Flip(sender) => {
                // Settlement takes a while; answer from a task so the loop
                // keeps serving notifications and reads in the meantime.
                let engine = Arc::clone(&self.wager);
                let player = self.session.active().cloned();
                let mut nfts = self.nfts.clone();
                let mut games = self.games.clone();
                tokio::spawn(async move {
                    let outcome = engine.flip(player, &mut nfts, &mut games).await;
                    let _ = sender.send(outcome);
                });
            }
            Query::Session(sender) => {
                let _ = sender.send(SessionView {
                    address: self.session.active().cloned(),
                });
            }
        }
    }
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
