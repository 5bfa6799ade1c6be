// Sled-backed ledger implementations for NFT and game persistence.
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
use anyhow::Context;
use chrono::Utc;
use serde::{
    Serialize,
    de::DeserializeOwned,
};
use sled::{
    Config,
    Db,
    Tree,
};
use std::path::Path;

// Cloned handles share the underlying trees, so ids are allocated by an
// atomic bump of this meta-tree key rather than read off the last entry.
const LAST_ID_KEY: &[u8] = b"last_id";

#[derive(Clone)]
pub struct SledNftLedger {
    tree: Tree,
    meta: Tree,
}

#[derive(Clone)]
pub struct SledGameLedger {
    tree: Tree,
    meta: Tree,
}

impl SledNftLedger {
    pub fn new(db: &Db) -> crate::Result<Self> {
        let tree = db
            .open_tree("nft_entries")
            .context("open nft_entries tree")?;
        let meta = db.open_tree("nft_meta").context("open nft_meta tree")?;
        Ok(Self { tree, meta })
    }

    /// Opens both ledgers over one database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<(Self, SledGameLedger)> {
        let config = Config::default().path(path);
        let db = config.open().context("open sled database")?;
        let nfts = Self::new(&db)?;
        let games = SledGameLedger::new(&db)?;
        Ok((nfts, games))
    }

    fn persist(&self, entry: &NftEntry) -> crate::Result<()> {
        let bytes = serialize_record(entry, "nft entry")?;
        self.tree
            .insert(entry.id.to_be_bytes(), bytes)
            .context("persist nft entry")?;
        self.tree.flush().context("flush nft entries")?;
        Ok(())
    }
}

impl NftLedger for SledNftLedger {
    fn list_all(&self) -> Result<Vec<NftEntry>, LedgerError> {
        // Keys are big-endian ids, so iteration follows id order.
        let mut entries = Vec::new();
        for entry in self.tree.iter() {
            let (_, value) = entry.context("iterate nft entries")?;
            entries.push(deserialize::<NftEntry>(value.as_ref())?);
        }
        Ok(entries)
    }

    fn list_owned_by(&self, owner: &Address) -> Result<Vec<NftEntry>, LedgerError> {
        let owned = self
            .list_all()?
            .into_iter()
            .filter(|entry| &entry.owner == owner)
            .collect();
        Ok(owned)
    }

    fn mint(&mut self, request: &MintRequest) -> Result<NftEntry, LedgerError> {
        let (owner, metadata) = validated_mint(request)?;
        let id = allocate_id(&self.meta, "nft entry")?;
        let entry = NftEntry {
            id,
            token_id: id.to_string(),
            owner,
            metadata,
            created_at: Utc::now(),
        };
        self.persist(&entry)?;
        Ok(entry)
    }

    fn seed_if_empty(
        &mut self,
        catalog: &[NftMetadata],
        owner: &Address,
    ) -> Result<usize, LedgerError> {
        // Installing the counter claims ids 1..=len. A counter that is
        // already set means ids were handed out before, so the ledger
        // is not empty.
        let claimed = (catalog.len() as u64).to_be_bytes();
        let claim = self
            .meta
            .compare_and_swap(LAST_ID_KEY, None::<&[u8]>, Some(&claimed[..]))
            .context("claim catalog id range")?;
        if claim.is_err() {
            return Ok(0);
        }
        for (offset, metadata) in catalog.iter().enumerate() {
            let id = offset as u64 + 1;
            let entry = NftEntry {
                id,
                token_id: id.to_string(),
                owner: owner.clone(),
                metadata: metadata.clone(),
                created_at: Utc::now(),
            };
            self.persist(&entry)?;
        }
        Ok(catalog.len())
    }
}

impl SledGameLedger {
    pub fn new(db: &Db) -> crate::Result<Self> {
        let tree = db
            .open_tree("game_entries")
            .context("open game_entries tree")?;
        let meta = db.open_tree("game_meta").context("open game_meta tree")?;
        Ok(Self { tree, meta })
    }
}

impl GameLedger for SledGameLedger {
    fn record(
        &mut self,
        player: &Address,
        result: FlipResult,
    ) -> Result<GameEntry, LedgerError> {
        let id = allocate_id(&self.meta, "game entry")?;
        let entry = GameEntry {
            id,
            player: player.clone(),
            result,
            reward: None,
            created_at: Utc::now(),
        };
        let bytes = serialize_record(&entry, "game entry")?;
        self.tree
            .insert(entry.id.to_be_bytes(), bytes)
            .context("persist game entry")?;
        self.tree.flush().context("flush game entries")?;
        Ok(entry)
    }

    fn history(&self, player: &Address) -> Result<Vec<GameEntry>, LedgerError> {
        let mut history = Vec::new();
        for entry in self.tree.iter() {
            let (_, value) = entry.context("iterate game entries")?;
            let record = deserialize::<GameEntry>(value.as_ref())?;
            if &record.player == player {
                history.push(record);
            }
        }
        Ok(history)
    }
}

fn allocate_id(meta: &Tree, label: &str) -> crate::Result<u64> {
    let bytes = meta
        .update_and_fetch(LAST_ID_KEY, bump_id)
        .with_context(|| format!("allocate {label} id"))?
        .with_context(|| format!("{label} id counter missing after bump"))?;
    decode_id(bytes.as_ref())
}

// Runs inside a CAS retry loop; must stay pure.
fn bump_id(last: Option<&[u8]>) -> Option<Vec<u8>> {
    let last = last
        .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
        .map_or(0, u64::from_be_bytes);
    Some((last + 1).to_be_bytes().to_vec())
}

fn decode_id(bytes: &[u8]) -> crate::Result<u64> {
    let arr: [u8; 8] = bytes.try_into().context("id bytes must be 8 bytes")?;
    Ok(u64::from_be_bytes(arr))
}

fn serialize_record<T: Serialize>(value: &T, label: &str) -> crate::Result<Vec<u8>> {
    serde_json::to_vec(value).with_context(|| format!("serialize {label}"))
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> crate::Result<T> {
    serde_json::from_slice(bytes).context("deserialize sled record")
}
