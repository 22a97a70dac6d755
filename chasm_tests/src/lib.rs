//! Fixtures shared by the integration tests.

use std::{path::PathBuf, sync::Arc};

use chasm_shared::{
    items::ACode,
    map::{MapData, MapWall},
    math::{Vec2, Vec3},
    resources::{GameResources, ItemDescription, WeaponDescription},
};

/// Item ids in [`resources`].
pub mod item {
    pub const LIFE: u32 = 0;
    pub const HELMET: u32 = 1;
    pub const SHOTGUN: u32 = 2;
    pub const SHOTGUN_AMMO: u32 = 3;
}

pub fn resources() -> Arc<GameResources> {
    Arc::new(GameResources {
        weapons: vec![
            WeaponDescription {
                limit: 1,
                start: 1,
                d_am: 0,
            },
            WeaponDescription {
                limit: 40,
                start: 10,
                d_am: 5,
            },
        ],
        items: vec![
            ItemDescription {
                a_code: ACode(ACode::LIFE),
            },
            ItemDescription {
                a_code: ACode(ACode::HELMET),
            },
            ItemDescription {
                a_code: ACode::weapon(1),
            },
            ItemDescription {
                a_code: ACode::ammo(1, 2),
            },
        ],
    })
}

/// A map with one spawn point at (1, 1, 0) and `walls` unit-length walls.
pub fn map(walls: usize) -> Arc<MapData> {
    Arc::new(MapData {
        name: "arena".to_string(),
        dynamic_walls: (0..walls)
            .map(|i| MapWall {
                vert_pos: [Vec2::new(i as f32, 0.0), Vec2::new(i as f32 + 1.0, 0.0)],
            })
            .collect(),
        spawn_points: vec![Vec3::new(1.0, 1.0, 0.0)],
    })
}

/// The `data/` directory at the workspace root.
pub fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("data")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}
