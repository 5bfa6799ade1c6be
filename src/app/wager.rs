// Coin flip settlement: one wager at a time, fixed advisory stake.
use crate::{
    app::ledger_storage::{
        GameLedger,
        LedgerError,
        NftLedger,
    },
    catalog,
    records::{
        Address,
        FlipResult,
        GameEntry,
        NftEntry,
    },
};
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use std::{
    sync::{
        Mutex,
        atomic::{
            AtomicBool,
            Ordering,
        },
    },
    time::Duration,
};

/// Advisory stake attached to every flip. Nothing is escrowed.
pub const STAKE: &str = "0.01 ETH";

pub trait FlipOracle {
    fn draw(&mut self) -> FlipResult;
}

/// Fair coin backed by a seedable RNG.
pub struct UniformOracle {
    rng: StdRng,
}

impl UniformOracle {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl FlipOracle for UniformOracle {
    fn draw(&mut self) -> FlipResult {
        if self.rng.random_bool(0.5) {
            FlipResult::Heads
        } else {
            FlipResult::Tails
        }
    }
}

/// Replays a fixed script of outcomes, cycling when it runs out.
pub struct ScriptedOracle {
    script: Vec<FlipResult>,
    cursor: usize,
}

impl ScriptedOracle {
    pub fn new(script: Vec<FlipResult>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl FlipOracle for ScriptedOracle {
    fn draw(&mut self) -> FlipResult {
        // An empty script always lands tails.
        if self.script.is_empty() {
            return FlipResult::Tails;
        }
        let result = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        result
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WagerError {
    #[error("connect your wallet before flipping")]
    WalletRequired,
    #[error(transparent)]
    Storage(#[from] LedgerError),
}

/// How a winning flip was (or was not) rewarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardOutcome {
    None,
    Minted(NftEntry),
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlipRecord {
    pub result: FlipResult,
    pub stake: String,
    pub game: GameEntry,
    pub reward: RewardOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlipResolution {
    Settled(FlipRecord),
    Ignored,
}

pub struct WagerEngine<O> {
    delay: Duration,
    oracle: Mutex<O>,
    in_flight: AtomicBool,
}

impl<O: FlipOracle> WagerEngine<O> {
    pub fn new(oracle: O, delay: Duration) -> Self {
        Self {
            delay,
            oracle: Mutex::new(oracle),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Settles one flip for the connected player.
    ///
    /// A flip started while another is settling is ignored rather than
    /// queued. Without a connected wallet nothing is drawn or written.
    pub async fn flip<N, G>(
        &self,
        player: Option<Address>,
        nfts: &mut N,
        games: &mut G,
    ) -> Result<FlipResolution, WagerError>
    where
        N: NftLedger,
        G: GameLedger,
    {
        let Some(player) = player else {
            return Err(WagerError::WalletRequired);
        };
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("flip already in flight, ignoring request from {player}");
            return Ok(FlipResolution::Ignored);
        }
        let outcome = self.settle(&player, nfts, games).await;
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(FlipResolution::Settled(outcome?))
    }

    async fn settle<N, G>(
        &self,
        player: &Address,
        nfts: &mut N,
        games: &mut G,
    ) -> Result<FlipRecord, WagerError>
    where
        N: NftLedger,
        G: GameLedger,
    {
        tokio::time::sleep(self.delay).await;
        let result = self.oracle.lock().unwrap().draw();
        tracing::info!("coin flip for {player} settled {result}");
        let reward = if result.is_win() {
            match nfts.mint(&catalog::reward_nft(player)) {
                Ok(entry) => RewardOutcome::Minted(entry),
                Err(error) => {
                    tracing::warn!("reward mint for {player} failed: {error}");
                    RewardOutcome::Failed {
                        reason: error.to_string(),
                    }
                }
            }
        } else {
            RewardOutcome::None
        };
        // The game is recorded even when the reward mint failed.
        let game = games.record(player, result)?;
        Ok(FlipRecord {
            result,
            stake: STAKE.to_string(),
            game,
            reward,
        })
    }
}
