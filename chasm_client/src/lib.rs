//! `chasm_client`
//!
//! Client-side systems:
//! - Replicated map state (dynamic walls, entities)
//! - Input capture and `PlayerMove` generation
//! - Connection handling over a `MessageChannel`

pub mod client;
pub mod input;
pub mod map_state;

pub use client::GameClient;
pub use map_state::MapState;
