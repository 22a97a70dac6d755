//! `chasm_server`
//!
//! Server-side systems:
//! - Authoritative per-connection `Player` state machine
//! - Fixed timestep simulation loop
//! - Receives `PlayerMove`s and console commands
//! - Sends `PlayerState` / `PlayerPosition` every tick
//!
//! The transport is supplied by the caller as a `MessageChannel` per
//! connection.

pub mod player;
pub mod server;

pub use player::Player;
pub use server::GameServer;
