//! Item category codes.
//!
//! Item descriptors in the resource catalog carry a numeric category code.
//! Weapons occupy a contiguous range. Ammo codes pack the weapon code and the
//! number of portions into decimal digits: `weapon_code * 10 + portions`, so
//! code `1034` is four portions of ammo for weapon code `103`.
//!
//! The packed form is decoded only in [`ACode::kind`].

use serde::{Deserialize, Serialize};

/// Number of weapon slots a player has.
pub const WEAPON_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ACode(pub u32);

impl ACode {
    pub const WEAPON_FIRST: u32 = 101;
    pub const WEAPON_LAST: u32 = Self::WEAPON_FIRST + WEAPON_COUNT as u32 - 1;
    pub const AMMO_FIRST: u32 = Self::WEAPON_FIRST * 10 + 1;
    pub const AMMO_LAST: u32 = Self::WEAPON_LAST * 10 + 9;
    pub const LIFE: u32 = 214;
    pub const BIG_LIFE: u32 = 215;
    pub const ARMOR: u32 = 216;
    pub const HELMET: u32 = 217;

    /// Decodes the category.
    pub fn kind(self) -> ItemKind {
        let code = self.0;
        match code {
            Self::WEAPON_FIRST..=Self::WEAPON_LAST => ItemKind::Weapon {
                weapon_index: (code - Self::WEAPON_FIRST) as usize,
            },
            Self::AMMO_FIRST..=Self::AMMO_LAST => ItemKind::Ammo {
                weapon_index: (code / 10 - Self::WEAPON_FIRST) as usize,
                portions: code % 10,
            },
            Self::LIFE => ItemKind::Life,
            Self::BIG_LIFE => ItemKind::BigLife,
            Self::ARMOR => ItemKind::Armor,
            Self::HELMET => ItemKind::Helmet,
            _ => ItemKind::Other,
        }
    }

    /// Code of a weapon pickup.
    pub fn weapon(weapon_index: usize) -> Self {
        Self(Self::WEAPON_FIRST + weapon_index as u32)
    }

    /// Code of an ammo pickup holding `portions` portions (0..=9).
    pub fn ammo(weapon_index: usize, portions: u32) -> Self {
        Self((Self::WEAPON_FIRST + weapon_index as u32) * 10 + portions % 10)
    }
}

/// Decoded item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Weapon { weapon_index: usize },
    Ammo { weapon_index: usize, portions: u32 },
    /// Small health pack.
    Life,
    /// Large health pack.
    BigLife,
    /// Full armor.
    Armor,
    /// Half armor.
    Helmet,
    /// Keys, decorations and anything the player cannot pick up here.
    Other,
}
