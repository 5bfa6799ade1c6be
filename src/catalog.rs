use crate::records::{
    Address,
    MintRequest,
    NftMetadata,
};

/// Burn address owning the seeded marketplace entries.
pub const BURN_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";

pub fn burn_address() -> Address {
    BURN_ADDRESS
        .parse()
        .expect("burn address constant is non-empty")
}

/// The fixed marketplace catalog inserted by `seed_if_empty` on first run.
pub fn sample_catalog() -> Vec<NftMetadata> {
    vec![
        NftMetadata::new(
            "Cyber Samurai",
            "A legendary cyber warrior",
            "0.5",
            "https://picsum.photos/400/400",
        ),
        NftMetadata::new(
            "Digital Dragon",
            "A mythical digital beast",
            "0.8",
            "https://picsum.photos/401/400",
        ),
        NftMetadata::new(
            "Neon Ninja",
            "Silent but deadly cyber assassin",
            "0.3",
            "https://picsum.photos/402/400",
        ),
        NftMetadata::new(
            "Quantum Queen",
            "Ruler of the digital realm",
            "1.2",
            "https://picsum.photos/403/400",
        ),
        NftMetadata::new(
            "Cyber Phoenix",
            "Reborn in the digital flames",
            "0.9",
            "https://picsum.photos/404/400",
        ),
    ]
}

/// Mint request for the NFT awarded on a winning flip, owned by the player.
pub fn reward_nft(winner: &Address) -> MintRequest {
    MintRequest::new(
        "CyberFlip Reward",
        "Reward for a winning coin flip",
        "0.01",
        "https://picsum.photos/405/400",
        winner,
    )
}
