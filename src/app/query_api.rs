use crate::{
    app::{
        ledger_storage::LedgerError,
        wager::{
            FlipResolution,
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
use serde::{
    Deserialize,
    Serialize,
};
use tokio::sync::oneshot;

pub trait QueryAPI {
    fn query(&mut self) -> impl Future<Output = crate::Result<Query>>;
}

#[derive(Debug)]
pub enum Query {
    SeedCatalog(oneshot::Sender<Result<usize, LedgerError>>),
    GlobalNfts(oneshot::Sender<Result<Vec<NftEntry>, LedgerError>>),
    OwnedNfts(OwnerQuery),
    PurchasedNfts(OwnerQuery),
    MintNft(MintQuery),
    GameHistory(HistoryQuery),
    RecordGame(RecordGameQuery),
    Flip(oneshot::Sender<Result<FlipResolution, WagerError>>),
    Session(oneshot::Sender<SessionView>),
}

impl Query {
    pub fn owned_nfts(
        owner: Address,
        sender: oneshot::Sender<Result<Vec<NftEntry>, LedgerError>>,
    ) -> Self {
        Self::OwnedNfts(OwnerQuery { owner, sender })
    }

    pub fn purchased_nfts(
        owner: Address,
        sender: oneshot::Sender<Result<Vec<NftEntry>, LedgerError>>,
    ) -> Self {
        Self::PurchasedNfts(OwnerQuery { owner, sender })
    }

    pub fn mint_nft(
        request: MintRequest,
        sender: oneshot::Sender<Result<NftEntry, LedgerError>>,
    ) -> Self {
        Self::MintNft(MintQuery { request, sender })
    }

    pub fn game_history(
        player: Address,
        sender: oneshot::Sender<Result<Vec<GameEntry>, LedgerError>>,
    ) -> Self {
        Self::GameHistory(HistoryQuery { player, sender })
    }

    pub fn record_game(
        player: Address,
        result: FlipResult,
        sender: oneshot::Sender<Result<GameEntry, LedgerError>>,
    ) -> Self {
        Self::RecordGame(RecordGameQuery {
            player,
            result,
            sender,
        })
    }
}

#[derive(Debug)]
pub struct OwnerQuery {
    pub owner: Address,
    pub sender: oneshot::Sender<Result<Vec<NftEntry>, LedgerError>>,
}

#[derive(Debug)]
pub struct MintQuery {
    pub request: MintRequest,
    pub sender: oneshot::Sender<Result<NftEntry, LedgerError>>,
}

#[derive(Debug)]
pub struct HistoryQuery {
    pub player: Address,
    pub sender: oneshot::Sender<Result<Vec<GameEntry>, LedgerError>>,
}

#[derive(Debug)]
pub struct RecordGameQuery {
    pub player: Address,
    pub result: FlipResult,
    pub sender: oneshot::Sender<Result<GameEntry, LedgerError>>,
}

/// Wallet session as reported over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub address: Option<Address>,
}
