use crate::records::{
    Address,
    FlipResult,
    GameEntry,
    MintRequest,
    NftEntry,
    NftMetadata,
};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The request arrived without a usable value for this field.
    #[error("missing required field: {0}")]
    Validation(&'static str),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Outcome of the purchase stub. Purchasing is declared but not wired up;
/// callers surface this as a "coming soon" notice, never as an error.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum PurchaseStatus {
    ComingSoon,
}

pub trait NftLedger {
    /// full marketplace view, insertion order
    fn list_all(&self) -> Result<Vec<NftEntry>, LedgerError>;

    /// entries owned by the given address (addresses are stored
    /// normalized, so the match is case-insensitive)
    fn list_owned_by(&self, owner: &Address) -> Result<Vec<NftEntry>, LedgerError>;

    /// entries owned by the given address and flagged purchased in their
    /// metadata
    fn list_purchased_by(&self, owner: &Address) -> Result<Vec<NftEntry>, LedgerError> {
        let purchased = self
            .list_owned_by(owner)?
            .into_iter()
            .filter(|entry| entry.metadata.is_purchased())
            .collect();
        Ok(purchased)
    }

    /// validates the request, assigns id and token id, appends the entry
    fn mint(&mut self, request: &MintRequest) -> Result<NftEntry, LedgerError>;

    /// inserts the catalog under the given owner if the ledger holds zero
    /// entries; returns how many entries were written (0 on the no-op)
    fn seed_if_empty(
        &mut self,
        catalog: &[NftMetadata],
        owner: &Address,
    ) -> Result<usize, LedgerError>;

    /// deliberate stub: acknowledges without touching any entry
    fn purchase(&mut self, _entry: &NftEntry, _buyer: &Address) -> PurchaseStatus {
        PurchaseStatus::ComingSoon
    }
}

pub trait GameLedger {
    /// appends one resolved wager outcome
    fn record(
        &mut self,
        player: &Address,
        result: FlipResult,
    ) -> Result<GameEntry, LedgerError>;

    /// wager history for the player, insertion order
    fn history(&self, player: &Address) -> Result<Vec<GameEntry>, LedgerError>;
}

/// Checks a mint request for the required fields and a parseable owner.
/// Blank-after-trim counts as missing; whitespace padding does not make
/// a field present.
pub(crate) fn validated_mint(
    request: &MintRequest,
) -> Result<(Address, NftMetadata), LedgerError> {
    let name = required(request.name.as_deref(), "name")?;
    let description = required(request.description.as_deref(), "description")?;
    let price = required(request.price.as_deref(), "price")?;
    let image = required(request.image.as_deref(), "image")?;
    let owner = required(request.owner.as_deref(), "owner")?
        .parse()
        .map_err(|_| LedgerError::Validation("owner"))?;
    Ok((owner, NftMetadata::new(name, description, price, image)))
}

fn required<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, LedgerError> {
    match value {
        Some(raw) if !raw.trim().is_empty() => Ok(raw),
        _ => Err(LedgerError::Validation(field)),
    }
}
