use anyhow::Context;
use clap::Parser;
use cyberflip::{
    app::{
        App,
        RunState,
        actix_query_api::ActixQueryApi,
        in_memory_ledger::{
            InMemoryGameLedger,
            InMemoryNftLedger,
        },
        init_tracing,
        ledger_storage::{
            GameLedger,
            NftLedger,
        },
        session::SessionError,
        sled_ledger::SledNftLedger,
        wager::{
            UniformOracle,
            WagerEngine,
        },
        wallet_provider::StaticProvider,
    },
    records::Address,
};
use std::{
    env::current_dir,
    fs,
    path::PathBuf,
    time::Duration,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    port: Option<u16>,

    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,

    #[arg(long, default_value = "false")]
    in_memory: bool,

    #[arg(short, long)]
    wallet: Option<String>,

    #[arg(long = "settle-ms", default_value = "2000")]
    settle_ms: u64,

    #[arg(short, long, default_value = "false")]
    tracing: bool,
}

async fn handle_interupt() {
    let res = tokio::signal::ctrl_c().await;
    match res {
        Ok(_) => {
            tracing::info!("Received interrupt, exiting");
        }
        Err(_) => {
            tracing::warn!("Received interrupt error, exiting anyway");
        }
    }
}

async fn run_service<Nfts, Games>(
    args: &Args,
    nfts: Nfts,
    games: Games,
) -> anyhow::Result<()>
where
    Nfts: NftLedger + Clone + Send + 'static,
    Games: GameLedger + Clone + Send + 'static,
{
    let wallet = args
        .wallet
        .as_deref()
        .map(|raw| raw.parse::<Address>().context("parsing --wallet address"))
        .transpose()?;
    let provider = match wallet.clone() {
        Some(account) => StaticProvider::new(Some(account)),
        None => StaticProvider::unavailable(),
    };
    let api = ActixQueryApi::new(args.port).await?;
    let wager = WagerEngine::new(
        UniformOracle::new(),
        Duration::from_millis(args.settle_ms),
    );
    let mut app = App::new(provider, api, nfts, games, wager);

    if wallet.is_some() {
        match app.connect_wallet().await {
            Ok(address) => tracing::info!("Serving with connected wallet {address}"),
            Err(error) => tracing::warn!("Wallet connection failed: {error}"),
        }
    } else {
        app.probe_wallet().await;
    }

    tracing::info!("Starting cyberflip service");
    loop {
        let interrupt = handle_interupt();
        match app.run(interrupt).await? {
            RunState::Continue => continue,
            RunState::Restart => {
                tracing::info!("Network changed; rebuilding wallet session");
                app.reload_session().await;
                continue;
            }
            RunState::Exit => {
                match app.disconnect_wallet().await {
                    Ok(()) => tracing::info!("Wallet session closed"),
                    // No provider means there was no session to close.
                    Err(SessionError::ProviderMissing) => {}
                    Err(error) => tracing::warn!("Wallet disconnect failed: {error}"),
                }
                tracing::info!("Exiting cyberflip service");
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.tracing {
        init_tracing();
    }

    if args.in_memory {
        tracing::info!("Using in-memory ledgers; state will not survive a restart");
        let nfts = InMemoryNftLedger::new();
        let games = InMemoryGameLedger::new();
        run_service(&args, nfts, games).await
    } else {
        let data_root = match &args.data_dir {
            Some(path) => path.clone(),
            None => current_dir()
                .context("determine process working directory")?
                .join("cyberflip_data"),
        };
        fs::create_dir_all(&data_root)?;
        tracing::info!("Using sled ledger directory: {}", data_root.display());
        let (nfts, games) = SledNftLedger::open(&data_root)?;
        run_service(&args, nfts, games).await
    }
}
