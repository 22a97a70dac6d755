//! Listen-server binary.
//!
//! Usage:
//!   cargo run -p chasm_client -- [--config game.json] [--tick-hz 30] [--map demo]
//!                                [--data-dir data] [--name Player]
//!
//! Runs the authoritative server and one client in the same process,
//! connected through a loopback channel, at a fixed tick rate.
//!
//! Console commands:
//!   status               - Show client status
//!   cmd <server command> - Run a server command as this client
//!                          (noclip, givekeys, give, hurt, activate, status)
//!   sv <server command>  - Run a server command as the host, cvars included
//!   quit                 - Exit

use std::env;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chasm_client::client::{ClientState, GameClient};
use chasm_client::input::InputState;
use chasm_server::GameServer;
use chasm_shared::{
    config::EngineConfig, map::MapData, net::loopback_pair, resources::GameResources,
    time::GameTime,
};
use tokio::sync::mpsc;
use tracing::info;

fn parse_args() -> anyhow::Result<EngineConfig> {
    let args: Vec<String> = env::args().collect();

    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => EngineConfig::from_file(&args[i + 1])?,
        _ => EngineConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1].parse().context("parse --tick-hz")?;
                i += 2;
            }
            "--map" if i + 1 < args.len() => {
                cfg.start_map = args[i + 1].clone();
                i += 2;
            }
            "--data-dir" if i + 1 < args.len() => {
                cfg.data_dir = args[i + 1].clone();
                i += 2;
            }
            "--name" if i + 1 < args.len() => {
                cfg.player_name = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(
        tick_hz = cfg.tick_hz,
        map = %cfg.start_map,
        data_dir = %cfg.data_dir,
        "Starting listen server"
    );

    let resources = Arc::new(
        GameResources::load(cfg.resources_path()).context("load game resources")?,
    );
    let map = Arc::new(MapData::load(cfg.map_path(&cfg.start_map)).context("load start map")?);

    let mut server = GameServer::new(cfg.clone(), resources, Arc::clone(&map));
    let (server_end, client_end) = loopback_pair();

    let mut client = GameClient::new(cfg.clone(), Box::new(client_end));
    client.preload_map(map);
    client.hello().await?;
    server.connect(Box::new(server_end)).await?;

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                break;
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!(
        "Listen server running. Type 'status' for info, 'cmd <command>' for the server, \
         'quit' to exit."
    );
    println!();

    let dt = GameTime::from_tick_rate(cfg.tick_hz);
    let tick_interval = Duration::from_micros(dt.as_micros().max(0) as u64);
    let mut next_tick = tokio::time::Instant::now();

    loop {
        while let Ok(line) = console_rx.try_recv() {
            let output = match line.strip_prefix("sv ") {
                Some(command) => server.exec_console(command),
                None => client.exec_console(&line).await,
            };
            match output {
                Ok(output) => {
                    for line in output {
                        println!("{}", line);
                    }
                }
                Err(e) => println!("Error: {:#}", e),
            }
        }

        client.poll()?;
        for message in client.server_messages.drain(..) {
            println!("{}", message);
        }

        if client.state == ClientState::Disconnected {
            println!("Disconnected.");
            break;
        }

        // Idle input; keyboard/mouse sampling belongs to the windowing layer.
        client.tick(InputState::default()).await?;
        server.step(dt).await?;

        next_tick += tick_interval;
        tokio::time::sleep_until(next_tick).await;
    }

    Ok(())
}
