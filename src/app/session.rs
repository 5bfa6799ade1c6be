use crate::{
    app::wallet_provider::{
        ProviderError,
        ProviderNotification,
        WalletProvider,
    },
    records::Address,
};
use tokio::sync::mpsc;

const LISTENER_QUEUE_SIZE: usize = 16;

/// The single connected address for this client context. Owns the
/// subscription state toward the wallet provider and fans session events
/// out to local listeners.
pub struct WalletSession {
    active: Option<Address>,
    subscribed: bool,
    listeners: Vec<mpsc::Sender<SessionEvent>>,
}

/// Events delivered to local listeners registered via `subscribe_events`.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum SessionEvent {
    AccountChanged(Address),
    Disconnected,
}

/// What applying a provider notification did to the session.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum SessionUpdate {
    /// No standing subscription; the notification was dropped.
    Ignored,
    AccountChanged(Address),
    SessionEnded,
    /// Chain switched. The embedding context must rebuild rather than
    /// reconcile in place.
    ReloadRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no wallet provider detected")]
    ProviderMissing,
    #[error("user rejected the connection request")]
    UserRejected,
    #[error("failed to connect wallet: {0}")]
    ConnectionFailed(String),
}

impl WalletSession {
    pub fn new() -> Self {
        Self {
            active: None,
            subscribed: false,
            listeners: Vec::new(),
        }
    }

    pub fn active(&self) -> Option<&Address> {
        self.active.as_ref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Queries the provider for already-authorized accounts without
    /// prompting. Adopts the first one as the active address but does not
    /// register a notification subscription. Provider failures are logged
    /// and read as "nothing authorized".
    pub async fn probe<P: WalletProvider>(&mut self, provider: &mut P) -> Option<Address> {
        if !provider.is_available() {
            return None;
        }
        match provider.authorized_accounts().await {
            Ok(accounts) => {
                self.active = accounts.into_iter().next();
                self.active.clone()
            }
            Err(error) => {
                tracing::warn!("probing wallet provider failed: {error}");
                None
            }
        }
    }

    /// Requests authorization from the provider, adopts the first
    /// authorized address, and registers the standing notification
    /// subscription.
    pub async fn connect<P: WalletProvider>(
        &mut self,
        provider: &mut P,
    ) -> Result<Address, SessionError> {
        if !provider.is_available() {
            return Err(SessionError::ProviderMissing);
        }
        let accounts = provider.request_accounts().await.map_err(|error| match error {
            ProviderError::Rejected => SessionError::UserRejected,
            ProviderError::Other(message) => SessionError::ConnectionFailed(message),
        })?;
        let first = accounts.into_iter().next().ok_or_else(|| {
            SessionError::ConnectionFailed("provider authorized no accounts".to_string())
        })?;
        self.subscribed = true;
        self.active = Some(first.clone());
        tracing::info!("wallet connected: {first}");
        Ok(first)
    }

    /// Tears down the notification subscription, clears the active
    /// address, and tells local listeners the session ended.
    pub async fn disconnect<P: WalletProvider>(
        &mut self,
        provider: &mut P,
    ) -> Result<(), SessionError> {
        if !provider.is_available() {
            return Err(SessionError::ProviderMissing);
        }
        self.subscribed = false;
        self.active = None;
        self.emit(SessionEvent::Disconnected);
        tracing::info!("wallet disconnected");
        Ok(())
    }

    /// Applies one provider-pushed notification. Notifications are
    /// ignored unless `connect` has registered the subscription.
    pub fn apply(&mut self, notification: ProviderNotification) -> SessionUpdate {
        if !self.subscribed {
            return SessionUpdate::Ignored;
        }
        match notification {
            ProviderNotification::AccountChanged(address) => {
                self.active = Some(address.clone());
                self.emit(SessionEvent::AccountChanged(address.clone()));
                SessionUpdate::AccountChanged(address)
            }
            ProviderNotification::AccountsCleared => {
                self.active = None;
                self.emit(SessionEvent::Disconnected);
                SessionUpdate::SessionEnded
            }
            ProviderNotification::NetworkChanged { chain_id } => {
                tracing::info!("chain changed to {chain_id}; context reload required");
                SessionUpdate::ReloadRequired
            }
        }
    }

    /// Registers a local listener for session events.
    ///
    /// Delivery is best effort: events for a listener whose queue is
    /// full are dropped with a warning, so a consumer that stops
    /// polling can miss updates, including a final `Disconnected`.
    /// Read the current state off the session when it must be exact.
    pub fn subscribe_events(&mut self) -> mpsc::Receiver<SessionEvent> {
        let (sender, receiver) = mpsc::channel(LISTENER_QUEUE_SIZE);
        self.listeners.push(sender);
        receiver
    }

    fn emit(&mut self, event: SessionEvent) {
        self.listeners.retain(|listener| !listener.is_closed());
        for listener in &self.listeners {
            if listener.try_send(event.clone()).is_err() {
                tracing::warn!("session listener queue full, dropping {event:?}");
            }
        }
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new()
    }
}
