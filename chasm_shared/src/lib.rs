//! `chasm_shared`
//!
//! Shared libraries used by both client and server.
//!
//! Design goals:
//! - Deterministic: no wall clock, no randomness in simulation types.
//! - Clear separation of concerns (net, math, time, resources, map data).
//! - Traits at the transport seam.
//! - No `unsafe`.

pub mod angle;
pub mod config;
pub mod console;
pub mod items;
pub mod map;
pub mod math;
pub mod net;
pub mod physics;
pub mod resources;
pub mod time;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::angle::*;
    pub use crate::config::*;
    pub use crate::items::*;
    pub use crate::map::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::resources::*;
    pub use crate::time::*;
}
