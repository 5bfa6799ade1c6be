use crate::records::Address;
use tokio::sync::mpsc;

/// Boundary to the injected wallet backend. The app loop selects on
/// `next_notification`; the session drives the other calls.
pub trait WalletProvider {
    /// True when a wallet backend is injected into this context.
    fn is_available(&self) -> bool;

    /// Accounts the user has already authorized. Never prompts.
    fn authorized_accounts(
        &mut self,
    ) -> impl Future<Output = Result<Vec<Address>, ProviderError>>;

    /// Prompts the user to authorize this application.
    fn request_accounts(
        &mut self,
    ) -> impl Future<Output = Result<Vec<Address>, ProviderError>>;

    /// The next provider-pushed notification. Pends forever on a provider
    /// that never emits.
    fn next_notification(
        &mut self,
    ) -> impl Future<Output = Result<ProviderNotification, ProviderError>>;
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum ProviderNotification {
    /// A different or first-time authorized address.
    AccountChanged(Address),
    /// Zero authorized accounts remain; an external disconnect.
    AccountsCleared,
    /// Chain switch. Not reconciled in place; forces a context reload.
    NetworkChanged { chain_id: String },
}

impl ProviderNotification {
    /// Maps a raw provider account list onto the typed notification kinds.
    pub fn from_accounts(accounts: Vec<Address>) -> Self {
        match accounts.into_iter().next() {
            Some(first) => ProviderNotification::AccountChanged(first),
            None => ProviderNotification::AccountsCleared,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The user declined the authorization prompt.
    #[error("user rejected the connection request")]
    Rejected,
    #[error("wallet provider failure: {0}")]
    Other(String),
}

/// Provider with a fixed account set and no notifications. Backs the
/// binary when an operator supplies `--wallet`, and stands in for an
/// absent or idle browser extension otherwise.
pub struct StaticProvider {
    account: Option<Address>,
    available: bool,
}

impl StaticProvider {
    pub fn new(account: Option<Address>) -> Self {
        Self {
            account,
            available: true,
        }
    }

    /// No wallet backend injected at all.
    pub fn unavailable() -> Self {
        Self {
            account: None,
            available: false,
        }
    }
}

impl WalletProvider for StaticProvider {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn authorized_accounts(&mut self) -> Result<Vec<Address>, ProviderError> {
        Ok(self.account.clone().into_iter().collect())
    }

    async fn request_accounts(&mut self) -> Result<Vec<Address>, ProviderError> {
        match &self.account {
            Some(account) => Ok(vec![account.clone()]),
            None => Err(ProviderError::Rejected),
        }
    }

    async fn next_notification(&mut self) -> Result<ProviderNotification, ProviderError> {
        std::future::pending().await
    }
}

/// Channel-fed provider mirroring how a browser extension pushes events
/// into the page. Used by tests and demo wiring.
pub struct ScriptedProvider {
    account: Option<Address>,
    notifications: mpsc::Receiver<ProviderNotification>,
}

impl ScriptedProvider {
    pub fn new(
        account: Option<Address>,
    ) -> (Self, mpsc::Sender<ProviderNotification>) {
        let (sender, receiver) = mpsc::channel(10);
        let provider = Self {
            account,
            notifications: receiver,
        };
        (provider, sender)
    }
}

impl WalletProvider for ScriptedProvider {
    fn is_available(&self) -> bool {
        true
    }

    async fn authorized_accounts(&mut self) -> Result<Vec<Address>, ProviderError> {
        Ok(self.account.clone().into_iter().collect())
    }

    async fn request_accounts(&mut self) -> Result<Vec<Address>, ProviderError> {
        match &self.account {
            Some(account) => Ok(vec![account.clone()]),
            None => Err(ProviderError::Rejected),
        }
    }

    async fn next_notification(&mut self) -> Result<ProviderNotification, ProviderError> {
        match self.notifications.recv().await {
            Some(notification) => Ok(notification),
            // Script exhausted; go quiet instead of erroring the app loop.
            None => std::future::pending().await,
        }
    }
}
