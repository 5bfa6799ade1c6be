//! Wiring for integration tests: a full app over in-memory ledgers, a
//! scripted wallet provider, and a live HTTP query API.
use crate::app::{
    App,
    RunState,
    actix_query_api::ActixQueryApi,
    in_memory_ledger::{
        InMemoryGameLedger,
        InMemoryNftLedger,
    },
    wager::{
        ScriptedOracle,
        WagerEngine,
    },
    wallet_provider::{
        ProviderNotification,
        ScriptedProvider,
    },
};
use crate::records::FlipResult;
use std::time::Duration;
use tokio::sync::{
    mpsc,
    oneshot,
};

pub struct TestContext {
    base_url: String,
    notifications: mpsc::Sender<ProviderNotification>,
    nfts: InMemoryNftLedger,
    games: InMemoryGameLedger,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestContext {
    /// No wallet, no scripted outcomes. Flips fail `WalletRequired`.
    pub async fn new() -> Self {
        Self::build(None, Vec::new(), Duration::ZERO).await
    }

    /// Connected wallet, subscribed to provider notifications.
    pub async fn new_with_wallet(account: &str) -> Self {
        Self::build(Some(account), Vec::new(), Duration::ZERO).await
    }

    /// Connected wallet plus a fixed script of flip outcomes.
    pub async fn new_with_outcomes(account: &str, outcomes: Vec<FlipResult>) -> Self {
        Self::build(Some(account), outcomes, Duration::ZERO).await
    }

    /// As `new_with_outcomes`, with a visible settlement delay.
    pub async fn new_with_settle_delay(
        account: &str,
        outcomes: Vec<FlipResult>,
        delay: Duration,
    ) -> Self {
        Self::build(Some(account), outcomes, delay).await
    }

    async fn build(
        account: Option<&str>,
        outcomes: Vec<FlipResult>,
        delay: Duration,
    ) -> Self {
        let account = account.map(|raw| raw.parse().expect("test account address"));
        let connect = account.is_some();
        let (provider, notifications) = ScriptedProvider::new(account);
        let api = ActixQueryApi::new(None).await.expect("start query api");
        let base_url = api.base_url().to_string();
        let nfts = InMemoryNftLedger::new();
        let games = InMemoryGameLedger::new();
        let wager = WagerEngine::new(ScriptedOracle::new(outcomes), delay);
        let mut app = App::new(provider, api, nfts.clone(), games.clone(), wager);
        if connect {
            app.connect_wallet().await.expect("connect test wallet");
        }

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        tokio::spawn(async move {
            let mut shutdown_receiver = shutdown_receiver;
            loop {
                let stop = async {
                    let _ = (&mut shutdown_receiver).await;
                };
                match app.run(stop).await {
                    Ok(RunState::Continue) => continue,
                    Ok(RunState::Restart) => {
                        app.reload_session().await;
                        continue;
                    }
                    Ok(RunState::Exit) | Err(_) => break,
                }
            }
        });

        Self {
            base_url,
            notifications,
            nfts,
            games,
            shutdown: Some(shutdown_sender),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn nfts(&self) -> InMemoryNftLedger {
        self.nfts.clone()
    }

    pub fn games(&self) -> InMemoryGameLedger {
        self.games.clone()
    }

    pub async fn push_notification(&self, notification: ProviderNotification) {
        self.notifications
            .send(notification)
            .await
            .expect("app loop stopped");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
