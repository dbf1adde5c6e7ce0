//! `swapd`: a small CLI around the swap coordinator core. It has no real
//! chain-client or peer transport to connect to (§1 Non-goals), so `demo`
//! wires up the in-memory stubs and drives one swap end to end to exercise
//! the whole protocol; `check-config` validates a config file offline.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::info;
use swap_coordinator::clients::ChainClientRegistry;
use swap_coordinator::config::CoordinatorConfig;
use swap_coordinator::coordinator::Coordinator;
use swap_coordinator::deal::SwapOutcome;
use swap_coordinator::history::SwapHistory;
use swap_coordinator::initiator;
use swap_coordinator::orders::{AcceptedOrder, MakerOrderRef, TakerOrderRef};
use swap_coordinator::packets::SwapPacket;
use swap_coordinator::responder;
use swap_coordinator::stub::{stub_pair, StubPeer};

#[derive(Parser)]
#[command(name = "swapd", about = "Cross-chain atomic swap coordinator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs one simulated LTC/BTC swap against in-memory stub chain clients
    /// and prints the resulting outcome.
    Demo {
        #[arg(long, default_value = "1")]
        quantity: String,
        #[arg(long, default_value = "0.01")]
        price: String,
        #[arg(long)]
        sell: bool,
        /// Appends one JSON line per terminal swap outcome to this file.
        #[arg(long)]
        history_path: Option<String>,
    },
    /// Parses and validates a coordinator config file without starting
    /// anything.
    CheckConfig {
        #[arg(long)]
        path: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Demo { quantity, price, sell, history_path } => run_demo(&quantity, &price, !sell, history_path).await,
        Command::CheckConfig { path } => check_config(&path).await,
    }
}

async fn check_config(path: &str) {
    match CoordinatorConfig::load(path).await {
        Ok(config) => println!("ok: {} currencies configured", config.currencies.len()),
        Err(e) => {
            eprintln!("invalid config: {e}");
            std::process::exit(1);
        },
    }
}

async fn run_demo(quantity: &str, price: &str, is_buy: bool, history_path: Option<String>) {
    let quantity: bigdecimal::BigDecimal = quantity.parse().expect("valid decimal quantity");
    let price: bigdecimal::BigDecimal = price.parse().expect("valid decimal price");

    let (taker_btc, taker_ltc) = stub_pair();
    let mut taker_clients = ChainClientRegistry::new();
    taker_clients.register(taker_btc.clone());
    taker_clients.register(taker_ltc.clone());
    let mut taker_coordinator = Coordinator::new(taker_clients);

    let (maker_btc, maker_ltc) = stub_pair();
    let mut maker_clients = ChainClientRegistry::new();
    maker_clients.register(maker_btc);
    maker_clients.register(maker_ltc);
    let mut maker_coordinator = Coordinator::new(maker_clients);

    if let Some(path) = history_path {
        let history = Arc::new(SwapHistory::new(path));
        taker_coordinator = taker_coordinator.with_history(history.clone());
        maker_coordinator = maker_coordinator.with_history(history);
    }

    let taker_peer = Arc::new(StubPeer::new("taker-node").with_pub_key("BTC", "maker-btc-key").with_pub_key("LTC", "maker-ltc-key"));
    let maker_peer = Arc::new(StubPeer::new("maker-node").with_pub_key("BTC", "taker-btc-key").with_pub_key("LTC", "taker-ltc-key"));

    let maker_order = MakerOrderRef {
        id: "order-1".into(),
        peer_pub_key: "maker-node".into(),
        pair_id: "LTC/BTC".into(),
        price: price.clone(),
    };
    let taker_order = TakerOrderRef {
        local_id: "local-1".into(),
        quantity: quantity.clone(),
        is_buy,
    };

    let (r_hash, completion) = initiator::begin_swap(&taker_coordinator, taker_peer.clone(), &maker_order, &taker_order)
        .await
        .expect("begin_swap");
    info!("taker began swap {r_hash}");

    {
        let handle = taker_coordinator.registry.get(&r_hash).expect("deal just created");
        let deal = handle.lock().await;
        let preimage = deal.r_preimage.clone().expect("taker deal always carries a preimage");
        let maker_currency_client = if deal.maker_currency == "BTC" { &taker_btc } else { &taker_ltc };
        maker_currency_client.set_known_preimage(r_hash.clone(), preimage);
    }

    let request = match taker_peer.sent_packets().into_iter().next() {
        Some(SwapPacket::Request(req)) => req,
        _ => {
            eprintln!("taker never sent a SwapRequest");
            std::process::exit(1);
        },
    };

    let accepted = AcceptedOrder {
        quantity_to_accept: quantity,
        price,
        local_id: "maker-local-1".into(),
    };
    responder::accept_deal(&maker_coordinator, maker_peer.clone(), request, accepted)
        .await
        .expect("accept_deal");

    let response = match maker_peer.sent_packets().into_iter().next() {
        Some(SwapPacket::Response(resp)) => resp,
        _ => {
            eprintln!("maker never sent a SwapResponse");
            std::process::exit(1);
        },
    };
    initiator::handle_swap_response(&taker_coordinator, taker_peer, response)
        .await
        .expect("handle_swap_response");

    match completion.await {
        Ok(SwapOutcome::Paid(result)) => println!("swap paid: {result:?}"),
        Ok(SwapOutcome::Failed { r_hash, reason }) => println!("swap {r_hash} failed: {reason}"),
        Err(_) => println!("swap outcome channel dropped without resolving"),
    }
}
