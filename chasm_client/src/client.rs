//! Client implementation.
//!
//! The client maintains:
//! - One message channel to the server
//! - The replicated `MapState` of the current map
//! - The last `PlayerState` / `PlayerPosition` received
//! - Per-tick movement message generation
//! - Console for user commands

use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use chasm_shared::{
    config::EngineConfig,
    console::{parse_command_line, Console, CvarFlags, CvarValue},
    map::MapData,
    net::{
        ClientId, MessageChannel, NetMsg, PlayerMove, PlayerPosition, PlayerState,
        PROTOCOL_VERSION,
    },
};
use tracing::{debug, info, warn};

use crate::{
    input::{build_move, InputState},
    map_state::MapState,
};

/// Client connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    /// Not connected to any server.
    Disconnected,
    /// Hello sent, waiting for welcome.
    Connecting,
    /// Connected, waiting for map change.
    Connected,
    /// Map loaded, ready to play.
    Ready,
}

/// High-level game client.
pub struct GameClient {
    pub client_id: Option<ClientId>,
    pub state: ClientState,
    pub console: Console,

    cfg: EngineConfig,
    channel: Box<dyn MessageChannel>,
    tick: u32,

    /// Maps available without touching disk.
    maps: HashMap<String, Arc<MapData>>,
    pub map_state: Option<MapState>,

    pub player_state: Option<PlayerState>,
    pub player_position: Option<PlayerPosition>,

    /// Server messages to display.
    pub server_messages: Vec<String>,
}

impl GameClient {
    pub fn new(cfg: EngineConfig, channel: Box<dyn MessageChannel>) -> Self {
        let mut console = Console::new();
        Self::register_cvars(&mut console, &cfg);

        Self {
            client_id: None,
            state: ClientState::Connecting,
            console,
            cfg,
            channel,
            tick: 0,
            maps: HashMap::new(),
            map_state: None,
            player_state: None,
            player_position: None,
            server_messages: Vec::new(),
        }
    }

    fn register_cvars(console: &mut Console, cfg: &EngineConfig) {
        console.register_cvar(
            "cl_showpos",
            CvarValue::Bool(false),
            "Log own position",
            CvarFlags::ARCHIVE,
        );
        console.register_cvar(
            "name",
            CvarValue::String(cfg.player_name.clone()),
            "Player name",
            CvarFlags::ARCHIVE,
        );
    }

    /// Makes a map available without reading it from `maps_dir`.
    pub fn preload_map(&mut self, map: Arc<MapData>) {
        self.maps.insert(map.name.clone(), map);
    }

    pub async fn hello(&mut self) -> anyhow::Result<()> {
        self.channel
            .send(&NetMsg::Hello {
                protocol: PROTOCOL_VERSION,
            })
            .await
    }

    /// Applies every message that has arrived.
    pub fn poll(&mut self) -> anyhow::Result<()> {
        loop {
            match self.channel.try_recv() {
                Ok(Some(msg)) => self.handle_message(msg)?,
                Ok(None) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "Connection error");
                    self.state = ClientState::Disconnected;
                    return Ok(());
                }
            }
        }
    }

    fn handle_message(&mut self, msg: NetMsg) -> anyhow::Result<()> {
        match msg {
            NetMsg::Welcome { client_id } => {
                info!(client_id = ?client_id, "Connected to server");
                self.client_id = Some(client_id);
                self.state = ClientState::Connected;
            }
            NetMsg::MapChange { map_name } => {
                info!(map = %map_name, "Server changed map");
                self.load_map(&map_name)?;
            }
            NetMsg::PlayerState(state) => self.player_state = Some(state),
            NetMsg::PlayerPosition(position) => self.player_position = Some(position),
            NetMsg::ServerPrint { message } => {
                info!(message = %message, "Server message");
                self.server_messages.push(message);
            }
            NetMsg::Disconnect { reason } => {
                info!(reason = %reason, "Disconnected from server");
                self.state = ClientState::Disconnected;
            }
            other => match self.map_state.as_mut() {
                Some(map_state) => {
                    if !map_state.process_message(&other) {
                        debug!(?other, "Unhandled message");
                    }
                }
                None => debug!(?other, "Message before map load"),
            },
        }
        Ok(())
    }

    /// Loads a map by name, replacing all replicated state.
    pub fn load_map(&mut self, map_name: &str) -> anyhow::Result<()> {
        let map = match self.maps.get(map_name) {
            Some(map) => Arc::clone(map),
            None => {
                let path = self.cfg.map_path(map_name);
                let map = Arc::new(
                    MapData::load(&path).with_context(|| format!("load map {}", path.display()))?,
                );
                self.maps.insert(map_name.to_string(), Arc::clone(&map));
                map
            }
        };

        info!(
            map = %map.name,
            dynamic_walls = map.dynamic_walls.len(),
            "Map loaded on client"
        );

        self.map_state = Some(MapState::new(map));
        self.state = ClientState::Ready;
        Ok(())
    }

    /// Advances one client tick: builds the movement message and sends it.
    pub async fn tick(&mut self, input: InputState) -> anyhow::Result<PlayerMove> {
        let mv = build_move(input);
        if self.state == ClientState::Ready {
            self.channel.send(&NetMsg::PlayerMove(mv)).await?;
        }
        self.tick += 1;

        if self.console.cvar_bool("cl_showpos") && self.tick % 30 == 0 {
            if let Some(p) = self.player_position {
                info!(tick = self.tick, position = ?p.position, "Position");
            }
        }
        Ok(mv)
    }

    /// Executes a console command.
    pub async fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let tokens = parse_command_line(line);
        let Some((name, args)) = tokens.split_first() else {
            return Ok(Vec::new());
        };

        match name.as_str() {
            "status" => {
                let mut out = vec![
                    format!("State: {:?}", self.state),
                    format!("Client ID: {:?}", self.client_id),
                    format!("Tick: {}", self.tick),
                ];
                if let Some(ref map_state) = self.map_state {
                    out.push(format!(
                        "Map: {} ({} dynamic walls, {} entities)",
                        map_state.map_data().name,
                        map_state.dynamic_walls().len(),
                        map_state.entities().count()
                    ));
                }
                if let Some(state) = self.player_state {
                    out.push(format!(
                        "Health: {} Armor: {} Keys: {:?}",
                        state.health,
                        state.armor,
                        state.keys()
                    ));
                }
                Ok(out)
            }
            "cmd" => {
                if args.is_empty() {
                    return Ok(vec!["Usage: cmd <server command>".to_string()]);
                }
                self.channel
                    .send(&NetMsg::ClientCommand {
                        command: args.join(" "),
                    })
                    .await?;
                Ok(Vec::new())
            }
            "disconnect" | "quit" => {
                if self.state != ClientState::Disconnected {
                    // The peer may already be gone; leaving anyway.
                    let _ = self
                        .channel
                        .send(&NetMsg::Disconnect {
                            reason: "client quit".to_string(),
                        })
                        .await;
                }
                self.state = ClientState::Disconnected;
                Ok(vec!["Disconnected".to_string()])
            }
            _ => self.console.exec(line),
        }
    }
}
