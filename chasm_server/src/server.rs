//! Server implementation.
//!
//! Authoritative tick loop. Each connection owns one [`Player`]; every
//! fixed step the server:
//! - drains each connection's inbound messages (movement input is
//!   last-wins, commands go through the console),
//! - integrates every player and resolves it against the world floor,
//! - sends each client its `PlayerState` and `PlayerPosition`.
//!
//! Outbound messages inside a step are queued with `try_send`; a client whose
//! queue is full is dropped instead of stalling the tick for everyone.
//!
//! Determinism notes:
//! - Keep simulation in a fixed timestep; game time advances by `dt` only.
//! - Clients are kept in a `BTreeMap` so iteration order is stable.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use chasm_shared::{
    config::EngineConfig,
    console::{parse_command_line, Console, CvarFlags, CvarValue},
    map::MapData,
    math::Vec3,
    net::{ClientId, MessageChannel, NetMsg, PROTOCOL_VERSION},
    resources::GameResources,
    time::GameTime,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::player::Player;

/// Connected client state.
struct ConnectedClient {
    channel: Box<dyn MessageChannel>,
    player: Player,
}

/// Game server.
pub struct GameServer {
    pub cfg: EngineConfig,
    pub console: Console,
    resources: Arc<GameResources>,
    map: Arc<MapData>,
    clients: BTreeMap<ClientId, ConnectedClient>,

    tick: u32,
    time: GameTime,
}

impl GameServer {
    pub fn new(cfg: EngineConfig, resources: Arc<GameResources>, map: Arc<MapData>) -> Self {
        let mut console = Console::new();
        Self::register_cvars(&mut console, &cfg);

        info!(
            map = %map.name,
            dynamic_walls = map.dynamic_walls.len(),
            items = resources.items.len(),
            "Server created"
        );

        Self {
            cfg,
            console,
            resources,
            map,
            clients: BTreeMap::new(),
            tick: 0,
            time: GameTime::ZERO,
        }
    }

    fn register_cvars(console: &mut Console, cfg: &EngineConfig) {
        console.register_cvar(
            "sv_tickrate",
            CvarValue::Int(i64::from(cfg.tick_hz)),
            "Server tick rate",
            CvarFlags::NONE,
        );
        console.register_cvar(
            "sv_maxclients",
            CvarValue::Int(16),
            "Max connected clients",
            CvarFlags::NONE,
        );
        console.register_cvar(
            "sv_cheats",
            CvarValue::Bool(false),
            "Allow cheat commands",
            CvarFlags::REPLICATED,
        );
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn time(&self) -> GameTime {
        self.time
    }

    pub fn map(&self) -> &Arc<MapData> {
        &self.map
    }

    pub fn resources(&self) -> &Arc<GameResources> {
        &self.resources
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn player(&self, id: ClientId) -> Option<&Player> {
        self.clients.get(&id).map(|c| &c.player)
    }

    pub fn player_mut(&mut self, id: ClientId) -> Option<&mut Player> {
        self.clients.get_mut(&id).map(|c| &mut c.player)
    }

    /// Attaches a new connection, spawns its player and tells it which map
    /// to load.
    pub async fn connect(
        &mut self,
        mut channel: Box<dyn MessageChannel>,
    ) -> anyhow::Result<ClientId> {
        let max_clients = self
            .console
            .get_cvar("sv_maxclients")
            .and_then(CvarValue::as_int)
            .unwrap_or(16);
        if self.clients.len() as i64 >= max_clients {
            channel
                .send(&NetMsg::Disconnect {
                    reason: "server is full".to_string(),
                })
                .await?;
            bail!("server is full ({max_clients} clients)");
        }

        let id = ClientId::new_unique();
        channel.send(&NetMsg::Welcome { client_id: id }).await?;
        channel
            .send(&NetMsg::MapChange {
                map_name: self.map.name.clone(),
            })
            .await?;

        let mut player = Player::new(Arc::clone(&self.resources));
        player.set_position(self.map.spawn_point());

        self.clients.insert(id, ConnectedClient { channel, player });
        info!(client_id = ?id, spawn = ?self.map.spawn_point(), "Client connected");
        Ok(id)
    }

    /// Drops a connection and its player.
    pub fn disconnect(&mut self, id: ClientId) -> bool {
        let removed = self.clients.remove(&id).is_some();
        if removed {
            info!(client_id = ?id, "Client disconnected");
        }
        removed
    }

    /// Runs the server for a number of ticks at the configured rate.
    pub async fn run_for_ticks(&mut self, ticks: u32) -> anyhow::Result<()> {
        let dt = GameTime::from_tick_rate(self.cfg.tick_hz);
        let interval = Duration::from_micros(dt.as_micros().max(0) as u64);
        let mut next = Instant::now();

        for _ in 0..ticks {
            next += interval;
            self.step(dt).await?;
            tokio::time::sleep_until(next).await;
        }
        Ok(())
    }

    /// Executes one fixed simulation step.
    pub async fn step(&mut self, dt: GameTime) -> anyhow::Result<()> {
        self.recv_messages();
        self.simulate(dt);
        self.send_player_updates();
        self.tick += 1;
        self.time += dt;
        Ok(())
    }

    fn recv_messages(&mut self) {
        let mut commands = Vec::new();
        let mut dropped = Vec::new();

        for (&id, client) in self.clients.iter_mut() {
            loop {
                let msg = match client.channel.try_recv() {
                    Ok(Some(msg)) => msg,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(client_id = ?id, error = %e, "Connection lost");
                        dropped.push(id);
                        break;
                    }
                };

                match msg {
                    NetMsg::PlayerMove(mv) => client.player.update_movement(&mv),
                    NetMsg::ClientCommand { command } => commands.push((id, command)),
                    NetMsg::Hello { protocol } if protocol != PROTOCOL_VERSION => {
                        warn!(client_id = ?id, protocol, "Protocol mismatch");
                        dropped.push(id);
                        break;
                    }
                    NetMsg::Hello { .. } => {}
                    NetMsg::Disconnect { reason } => {
                        info!(client_id = ?id, reason = %reason, "Client left");
                        dropped.push(id);
                        break;
                    }
                    other => debug!(client_id = ?id, ?other, "Unexpected client message"),
                }
            }
        }

        for id in dropped {
            self.disconnect(id);
        }

        for (id, command) in commands {
            let output = match self.exec_command(Some(id), &command) {
                Ok(output) => output,
                Err(e) => vec![format!("Error: {e:#}")],
            };
            let Some(client) = self.clients.get_mut(&id) else {
                continue;
            };
            let sent = output
                .into_iter()
                .try_for_each(|message| client.channel.try_send(&NetMsg::ServerPrint { message }));
            if let Err(e) = sent {
                warn!(client_id = ?id, error = %e, "Failed to send console reply");
                self.disconnect(id);
            }
        }
    }

    fn simulate(&mut self, dt: GameTime) {
        for client in self.clients.values_mut() {
            client.player.move_step(dt);
            resolve_world_floor(&mut client.player);
        }
    }

    fn send_player_updates(&mut self) {
        let mut dropped = Vec::new();
        for (&id, client) in self.clients.iter_mut() {
            let state = NetMsg::PlayerState(client.player.build_state_message());
            let position = NetMsg::PlayerPosition(client.player.build_position_message());
            let sent = client
                .channel
                .try_send(&state)
                .and_then(|()| client.channel.try_send(&position));
            if let Err(e) = sent {
                warn!(client_id = ?id, error = %e, "Failed to send player update");
                dropped.push(id);
            }
        }
        for id in dropped {
            self.disconnect(id);
        }
    }

    /// Picks up an item for a player. The caller decides what touching an
    /// item means; this only applies the inventory rules.
    pub fn pickup_item(&mut self, id: ClientId, item_id: u32) -> bool {
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        let picked = player.try_pickup_item(item_id);
        debug!(client_id = ?id, item_id, picked, "Item pickup");
        picked
    }

    /// Activates a map procedure for a player at the current game time.
    ///
    /// # Panics
    /// If `proc_number` is zero.
    pub fn activate_procedure(&mut self, id: ClientId, proc_number: u32) -> bool {
        let now = self.time;
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        let activated = player.try_activate_procedure(proc_number, now);
        debug!(client_id = ?id, proc_number, activated, "Procedure activation");
        activated
    }

    /// Executes a console command typed on the server.
    pub fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        self.exec_command(None, line)
    }

    /// Executes a console command. Player commands target `issuer` unless a
    /// client id is given as the last argument.
    pub fn exec_command(
        &mut self,
        issuer: Option<ClientId>,
        line: &str,
    ) -> anyhow::Result<Vec<String>> {
        let tokens = parse_command_line(line);
        let Some((name, args)) = tokens.split_first() else {
            return Ok(Vec::new());
        };

        match name.as_str() {
            "status" => Ok(self.status()),
            "noclip" => {
                let id = self.cheat_target(issuer, args, 0)?;
                let player = self.player_mut(id).context("no such client")?;
                let noclip = !player.is_noclip();
                player.set_noclip(noclip);
                Ok(vec![format!("noclip {}", if noclip { "ON" } else { "OFF" })])
            }
            "givekeys" => {
                let id = self.cheat_target(issuer, args, 0)?;
                self.player_mut(id).context("no such client")?.give_all_keys();
                Ok(vec!["all keys given".to_string()])
            }
            "give" => {
                let item_id: u32 = parse_arg(args, 0, "give <item_id> [client]")?;
                let id = self.cheat_target(issuer, args, 1)?;
                if self.player(id).is_none() {
                    bail!("no such client");
                }
                let picked = self.pickup_item(id, item_id);
                Ok(vec![format!(
                    "item {} {}",
                    item_id,
                    if picked { "picked up" } else { "rejected" }
                )])
            }
            "hurt" => {
                let amount: i32 = parse_arg(args, 0, "hurt <amount> [client]")?;
                let id = self.cheat_target(issuer, args, 1)?;
                let player = self.player_mut(id).context("no such client")?;
                player.set_health(player.health().saturating_sub(amount));
                Ok(vec![format!("health {}", player.health())])
            }
            "activate" => {
                let proc_number: u32 = parse_arg(args, 0, "activate <procedure> [client]")?;
                if proc_number == 0 {
                    bail!("procedure number must be nonzero");
                }
                let id = self.cheat_target(issuer, args, 1)?;
                if self.player(id).is_none() {
                    bail!("no such client");
                }
                let activated = self.activate_procedure(id, proc_number);
                Ok(vec![format!(
                    "procedure {} {}",
                    proc_number,
                    if activated { "activated" } else { "not ready" }
                )])
            }
            // Clients may read cvars but never change them.
            _ if issuer.is_some() => match self.console.describe_cvar(name) {
                Some(description) if args.is_empty() => Ok(vec![description]),
                Some(_) => bail!("{name} can only be changed on the server"),
                None => Ok(vec![format!("Unknown command: {name}")]),
            },
            _ => self.console.exec(line),
        }
    }

    /// Resolves the target of a cheat command; fails unless `sv_cheats` is
    /// on.
    fn cheat_target(
        &self,
        issuer: Option<ClientId>,
        args: &[String],
        client_arg: usize,
    ) -> anyhow::Result<ClientId> {
        if !self.console.cvar_bool("sv_cheats") {
            bail!("cheats are disabled (sv_cheats 0)");
        }
        match args.get(client_arg) {
            Some(arg) => {
                let raw: u32 = arg.parse().with_context(|| format!("bad client id '{arg}'"))?;
                Ok(ClientId(raw))
            }
            None => issuer.context("no target client given"),
        }
    }

    fn status(&self) -> Vec<String> {
        let mut out = vec![
            format!("Map: {}", self.map.name),
            format!("Tick: {}", self.tick),
            format!("Time: {:.2}s", self.time.to_seconds()),
            format!("Clients: {}", self.clients.len()),
        ];
        for (id, client) in &self.clients {
            let p = &client.player;
            let pos = p.position();
            out.push(format!(
                "  {:?}: pos=({:.2}, {:.2}, {:.2}) health={} armor={} noclip={}",
                id,
                pos.x,
                pos.y,
                pos.z,
                p.health(),
                p.armor(),
                p.is_noclip()
            ));
        }
        out
    }
}

fn parse_arg<T: std::str::FromStr>(
    args: &[String],
    index: usize,
    usage: &str,
) -> anyhow::Result<T> {
    args.get(index)
        .and_then(|a| a.parse().ok())
        .with_context(|| format!("usage: {usage}"))
}

/// Stands in for map collision: a solid floor plane at z = 0.
fn resolve_world_floor(player: &mut Player) {
    let mut pos = player.position();
    if pos.z <= 0.0 {
        pos.z = 0.0;
        player.set_position(pos);
        player.clamp_speed(Vec3::UNIT_Z);
        player.set_on_floor(true);
    } else {
        player.set_on_floor(false);
    }
}
