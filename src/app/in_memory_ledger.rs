use crate::{
    app::ledger_storage::{
        GameLedger,
        LedgerError,
        NftLedger,
        validated_mint,
    },
    records::{
        Address,
        FlipResult,
        GameEntry,
        MintRequest,
        NftEntry,
        NftMetadata,
    },
};
use chrono::Utc;
use std::sync::{
    Arc,
    Mutex,
};

/// Volatile NFT store. Clones share the same underlying ledger, so a
/// handle can be passed to spawned work while the app keeps its own.
#[derive(Clone)]
pub struct InMemoryNftLedger {
    entries: Arc<Mutex<Vec<NftEntry>>>,
}

impl InMemoryNftLedger {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn entries(&self) -> Arc<Mutex<Vec<NftEntry>>> {
        self.entries.clone()
    }
}

impl NftLedger for InMemoryNftLedger {
    fn list_all(&self) -> Result<Vec<NftEntry>, LedgerError> {
        Ok(self.entries.lock().unwrap().clone())
    }

    fn list_owned_by(&self, owner: &Address) -> Result<Vec<NftEntry>, LedgerError> {
        let owned = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| &entry.owner == owner)
            .cloned()
            .collect();
        Ok(owned)
    }

    fn mint(&mut self, request: &MintRequest) -> Result<NftEntry, LedgerError> {
        let (owner, metadata) = validated_mint(request)?;
        let mut entries = self.entries.lock().unwrap();
        // Append-only, so the length is a monotonic id source.
        let id = entries.len() as u64 + 1;
        let entry = NftEntry {
            id,
            token_id: id.to_string(),
            owner,
            metadata,
            created_at: Utc::now(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn seed_if_empty(
        &mut self,
        catalog: &[NftMetadata],
        owner: &Address,
    ) -> Result<usize, LedgerError> {
        let mut entries = self.entries.lock().unwrap();
        if !entries.is_empty() {
            return Ok(0);
        }
        for metadata in catalog {
            let id = entries.len() as u64 + 1;
            entries.push(NftEntry {
                id,
                token_id: id.to_string(),
                owner: owner.clone(),
                metadata: metadata.clone(),
                created_at: Utc::now(),
            });
        }
        Ok(catalog.len())
    }
}

/// Volatile game store with the same clone-shared layout.
#[derive(Clone)]
pub struct InMemoryGameLedger {
    entries: Arc<Mutex<Vec<GameEntry>>>,
}

impl InMemoryGameLedger {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn entries(&self) -> Arc<Mutex<Vec<GameEntry>>> {
        self.entries.clone()
    }
}

impl GameLedger for InMemoryGameLedger {
    fn record(
        &mut self,
        player: &Address,
        result: FlipResult,
    ) -> Result<GameEntry, LedgerError> {
        let mut entries = self.entries.lock().unwrap();
        let id = entries.len() as u64 + 1;
        let entry = GameEntry {
            id,
            player: player.clone(),
            result,
            reward: None,
            created_at: Utc::now(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn history(&self, player: &Address) -> Result<Vec<GameEntry>, LedgerError> {
        let history = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| &entry.player == player)
            .cloned()
            .collect();
        Ok(history)
    }
}
