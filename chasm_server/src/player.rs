//! Authoritative player state.
//!
//! One `Player` exists per connected client. It is mutated only by the
//! server tick: buffered input is applied with [`Player::update_movement`],
//! integrated by [`Player::move_step`], and published through
//! [`Player::build_state_message`].
//!
//! Rejected operations (`try_pickup_item`, `try_activate_procedure`
//! returning `false`) leave the player untouched.

use std::sync::Arc;

use chasm_shared::{
    items::{ItemKind, WEAPON_COUNT},
    math::Vec3,
    net::{KeysMask, PlayerMove, PlayerPosition, PlayerState},
    physics::MovementConfig,
    resources::{GameResources, WeaponDescription},
    time::GameTime,
};

/// Window in which the same procedure can't be re-triggered by one player.
const PROCEDURE_REACTIVATION_DELAY_S: f64 = 2.0;

const START_HEALTH: i32 = 100;
const LIFE_HEALTH_BONUS: i32 = 20;
const LIFE_HEALTH_LIMIT: i32 = 100;
const BIG_LIFE_HEALTH_BONUS: i32 = 100;
const BIG_LIFE_HEALTH_LIMIT: i32 = 200;
const ARMOR_BONUS: i32 = 200;
const HELMET_ARMOR_BONUS: i32 = 100;
const ARMOR_LIMIT: i32 = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    resources: Arc<GameResources>,
    movement: MovementConfig,

    pos: Vec3,
    speed: Vec3,
    on_floor: bool,
    noclip: bool,

    /// May drop below zero after heavy damage; never reported that way.
    health: i32,
    armor: i32,

    ammo: [u32; WEAPON_COUNT],
    have_weapon: [bool; WEAPON_COUNT],
    keys: KeysMask,

    /// 0 means none.
    last_activated_procedure: u32,
    last_activated_procedure_time: GameTime,

    // Last received input, consumed by the next `move_step`.
    movement_acceleration: f32,
    movement_direction: f32,
    jump_pressed: bool,
}

impl Player {
    pub fn new(resources: Arc<GameResources>) -> Self {
        Self::with_movement(resources, MovementConfig::default())
    }

    pub fn with_movement(resources: Arc<GameResources>, movement: MovementConfig) -> Self {
        let mut have_weapon = [false; WEAPON_COUNT];
        have_weapon[0] = true;

        Self {
            resources,
            movement,
            pos: Vec3::ZERO,
            speed: Vec3::ZERO,
            on_floor: false,
            noclip: false,
            health: START_HEALTH,
            armor: 0,
            ammo: [0; WEAPON_COUNT],
            have_weapon,
            keys: KeysMask::empty(),
            last_activated_procedure: 0,
            last_activated_procedure_time: GameTime::ZERO,
            movement_acceleration: 0.0,
            movement_direction: 0.0,
            jump_pressed: false,
        }
    }

    /// Teleport/spawn.
    pub fn set_position(&mut self, pos: Vec3) {
        self.pos = pos;
    }

    pub fn position(&self) -> Vec3 {
        self.pos
    }

    pub fn speed(&self) -> Vec3 {
        self.speed
    }

    /// Removes the part of the velocity that points into a surface.
    pub fn clamp_speed(&mut self, surface_normal: Vec3) {
        let projection = surface_normal.dot(self.speed);
        if projection < 0.0 {
            self.speed -= surface_normal * projection;
        }
    }

    pub fn set_on_floor(&mut self, on_floor: bool) {
        self.on_floor = on_floor;
    }

    pub fn on_floor(&self) -> bool {
        self.on_floor
    }

    /// Debounces map procedure triggers.
    ///
    /// Returns `false` when the same procedure was activated by this player
    /// less than two seconds ago.
    ///
    /// # Panics
    /// If `proc_number` is zero.
    pub fn try_activate_procedure(&mut self, proc_number: u32, current_time: GameTime) -> bool {
        assert!(proc_number != 0, "procedure number must be nonzero");

        if proc_number == self.last_activated_procedure
            && current_time - self.last_activated_procedure_time
                <= GameTime::from_seconds(PROCEDURE_REACTIVATION_DELAY_S)
        {
            return false;
        }

        self.last_activated_procedure = proc_number;
        self.last_activated_procedure_time = current_time;
        true
    }

    pub fn reset_activated_procedure(&mut self) {
        self.last_activated_procedure = 0;
        self.last_activated_procedure_time = GameTime::ZERO;
    }

    /// Applies an item pickup. Returns `false` if the item is unknown or the
    /// player can't carry any more of it.
    pub fn try_pickup_item(&mut self, item_id: u32) -> bool {
        let Some(a_code) = self.resources.item(item_id).map(|item| item.a_code) else {
            return false;
        };

        match a_code.kind() {
            ItemKind::Weapon { weapon_index } => {
                let Some(weapon) = self.weapon_description(weapon_index) else {
                    return false;
                };
                if self.have_weapon[weapon_index] && self.ammo[weapon_index] >= weapon.limit {
                    return false;
                }

                self.have_weapon[weapon_index] = true;
                self.ammo[weapon_index] = self.ammo[weapon_index]
                    .saturating_add(weapon.start)
                    .min(weapon.limit);
                true
            }
            ItemKind::Ammo {
                weapon_index,
                portions,
            } => {
                let Some(weapon) = self.weapon_description(weapon_index) else {
                    return false;
                };
                if self.ammo[weapon_index] >= weapon.limit {
                    return false;
                }

                self.ammo[weapon_index] = self.ammo[weapon_index]
                    .saturating_add(weapon.d_am.saturating_mul(portions))
                    .min(weapon.limit);
                true
            }
            ItemKind::Life => {
                Self::raise(&mut self.health, LIFE_HEALTH_BONUS, LIFE_HEALTH_LIMIT)
            }
            ItemKind::BigLife => {
                Self::raise(&mut self.health, BIG_LIFE_HEALTH_BONUS, BIG_LIFE_HEALTH_LIMIT)
            }
            ItemKind::Armor => Self::raise(&mut self.armor, ARMOR_BONUS, ARMOR_LIMIT),
            ItemKind::Helmet => Self::raise(&mut self.armor, HELMET_ARMOR_BONUS, ARMOR_LIMIT),
            ItemKind::Other => false,
        }
    }

    fn raise(value: &mut i32, bonus: i32, limit: i32) -> bool {
        if *value >= limit {
            return false;
        }
        *value = (*value + bonus).min(limit);
        true
    }

    fn weapon_description(&self, weapon_index: usize) -> Option<WeaponDescription> {
        if weapon_index >= WEAPON_COUNT {
            return None;
        }
        self.resources.weapon(weapon_index).copied()
    }

    pub fn build_state_message(&self) -> PlayerState {
        PlayerState {
            ammo: self.ammo,
            health: self.health.max(0) as u32,
            armor: self.armor.max(0) as u32,
            keys_mask: self.keys.bits(),
        }
    }

    pub fn build_position_message(&self) -> PlayerPosition {
        PlayerPosition {
            position: self.pos,
            speed: self.speed,
        }
    }

    /// Stores the latest input. Calls between two `move_step`s overwrite
    /// each other.
    pub fn update_movement(&mut self, move_message: &PlayerMove) {
        self.movement_acceleration = f32::from(move_message.acceleration) / 255.0;
        self.movement_direction = move_message.angle.to_radians();
        self.jump_pressed = move_message.jump_pressed;
    }

    /// Integrates one tick of movement. The step order is part of the
    /// behaviour clients predict against; don't reorder.
    pub fn move_step(&mut self, time_delta: GameTime) {
        let dt = time_delta.to_seconds_f32();
        let c = self.movement;

        let speed_delta = dt * self.movement_acceleration * c.acceleration;
        let deceleration_speed_delta = dt * c.deceleration;

        // Accelerate
        self.speed.x += self.movement_direction.cos() * speed_delta;
        self.speed.y += self.movement_direction.sin() * speed_delta;

        // Decelerate
        let speed_length = self.speed.xy_len();
        if speed_length > 0.0 && speed_length >= deceleration_speed_delta {
            let k = (speed_length - deceleration_speed_delta) / speed_length;
            self.speed.x *= k;
            self.speed.y *= k;
        } else {
            self.speed.x = 0.0;
            self.speed.y = 0.0;
        }

        // Clamp horizontal speed
        let speed_square_length = self.speed.xy_len_sq();
        if speed_square_length > c.max_speed * c.max_speed {
            let k = c.max_speed / speed_square_length.sqrt();
            self.speed.x *= k;
            self.speed.y *= k;
        }

        // Fall down
        self.speed.z += c.vertical_acceleration * dt;

        // Jump
        if self.jump_pressed && self.noclip {
            self.speed.z -= 2.0 * c.vertical_acceleration * dt;
        } else if self.jump_pressed && self.on_floor && self.speed.z <= 0.0 {
            self.speed.z += c.jump_speed_delta;
        }

        // Clamp vertical speed
        if self.speed.z.abs() > c.max_vertical_speed {
            self.speed.z *= c.max_vertical_speed / self.speed.z.abs();
        }

        self.pos += self.speed * dt;

        if self.noclip && self.pos.z < 0.0 {
            self.pos.z = 0.0;
            self.speed.z = 0.0;
        }
    }

    pub fn set_noclip(&mut self, noclip: bool) {
        self.noclip = noclip;
    }

    pub fn is_noclip(&self) -> bool {
        self.noclip
    }

    pub fn give_red_key(&mut self) {
        self.keys |= KeysMask::RED;
    }

    pub fn give_green_key(&mut self) {
        self.keys |= KeysMask::GREEN;
    }

    pub fn give_blue_key(&mut self) {
        self.keys |= KeysMask::BLUE;
    }

    pub fn give_all_keys(&mut self) {
        self.give_red_key();
        self.give_green_key();
        self.give_blue_key();
    }

    pub fn have_red_key(&self) -> bool {
        self.keys.contains(KeysMask::RED)
    }

    pub fn have_green_key(&self) -> bool {
        self.keys.contains(KeysMask::GREEN)
    }

    pub fn have_blue_key(&self) -> bool {
        self.keys.contains(KeysMask::BLUE)
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    /// Damage is resolved elsewhere; this is its way in.
    pub fn set_health(&mut self, health: i32) {
        self.health = health;
    }

    pub fn armor(&self) -> i32 {
        self.armor
    }

    /// Panics on an index outside `0..WEAPON_COUNT`.
    pub fn ammo(&self, weapon_index: usize) -> u32 {
        self.ammo[weapon_index]
    }

    /// Panics on an index outside `0..WEAPON_COUNT`.
    pub fn have_weapon(&self, weapon_index: usize) -> bool {
        self.have_weapon[weapon_index]
    }
}

#[cfg(test)]
mod tests {
    use chasm_shared::{
        angle::MessageAngle,
        items::ACode,
        resources::{ItemDescription, WeaponDescription},
    };

    use super::*;

    const TICK: GameTime = GameTime::from_micros(33_333);

    // Item ids in the test catalog.
    const PISTOL: u32 = 0;
    const SHOTGUN: u32 = 1;
    const SHOTGUN_AMMO_X3: u32 = 2;
    const LIFE: u32 = 3;
    const BIG_LIFE: u32 = 4;
    const ARMOR: u32 = 5;
    const HELMET: u32 = 6;
    const DECORATION: u32 = 7;
    const MISSING_WEAPON: u32 = 8;
    const MISSING_WEAPON_AMMO: u32 = 9;
    const SHOTGUN_AMMO_EMPTY: u32 = 10;
    const PISTOL_AMMO_EMPTY: u32 = 11;

    fn resources() -> Arc<GameResources> {
        let weapon = |limit, start, d_am| WeaponDescription { limit, start, d_am };
        let item = |code| ItemDescription { a_code: ACode(code) };
        Arc::new(GameResources {
            weapons: vec![weapon(100, 20, 10), weapon(50, 10, 8)],
            items: vec![
                item(ACode::weapon(0).0),
                item(ACode::weapon(1).0),
                item(ACode::ammo(1, 3).0),
                item(ACode::LIFE),
                item(ACode::BIG_LIFE),
                item(ACode::ARMOR),
                item(ACode::HELMET),
                item(300),
                item(ACode::weapon(5).0),
                item(ACode::ammo(5, 1).0),
                item(ACode::ammo(1, 0).0),
                item(ACode::ammo(0, 0).0),
            ],
        })
    }

    fn input(acceleration: u8, radians: f32, jump_pressed: bool) -> PlayerMove {
        PlayerMove {
            acceleration,
            angle: MessageAngle::from_radians(radians),
            jump_pressed,
        }
    }

    #[test]
    fn new_player_defaults() {
        let player = Player::new(resources());
        assert_eq!(player.position(), Vec3::ZERO);
        assert_eq!(player.speed(), Vec3::ZERO);
        assert_eq!(player.health(), 100);
        assert_eq!(player.armor(), 0);
        assert!(player.have_weapon(0));
        assert!((1..WEAPON_COUNT).all(|i| !player.have_weapon(i) && player.ammo(i) == 0));
        assert!(!player.have_red_key() && !player.have_green_key() && !player.have_blue_key());
        assert!(!player.is_noclip());
    }

    #[test]
    fn weapon_pickup_grants_start_ammo_until_full() {
        let mut player = Player::new(resources());
        for _ in 0..5 {
            assert!(player.try_pickup_item(SHOTGUN));
        }
        assert!(player.have_weapon(1));
        assert_eq!(player.ammo(1), 50);

        let before = player.clone();
        assert!(!player.try_pickup_item(SHOTGUN));
        assert_eq!(player, before);
    }

    #[test]
    fn owned_weapon_without_full_ammo_can_be_picked_up() {
        let mut player = Player::new(resources());
        assert!(player.try_pickup_item(PISTOL));
        assert_eq!(player.ammo(0), 20);
    }

    #[test]
    fn ammo_pickup_uses_portion_count() {
        let mut player = Player::new(resources());
        assert!(player.try_pickup_item(SHOTGUN_AMMO_X3));
        assert_eq!(player.ammo(1), 24);
        assert!(!player.have_weapon(1), "ammo doesn't grant the weapon");

        assert!(player.try_pickup_item(SHOTGUN_AMMO_X3));
        assert!(player.try_pickup_item(SHOTGUN_AMMO_X3));
        assert_eq!(player.ammo(1), 50);

        let before = player.clone();
        assert!(!player.try_pickup_item(SHOTGUN_AMMO_X3));
        assert_eq!(player, before);
    }

    #[test]
    fn health_items() {
        let mut player = Player::new(resources());
        assert!(!player.try_pickup_item(LIFE), "full health");

        player.set_health(90);
        assert!(player.try_pickup_item(LIFE));
        assert_eq!(player.health(), 100);

        assert!(player.try_pickup_item(BIG_LIFE));
        assert_eq!(player.health(), 200);
        assert!(!player.try_pickup_item(BIG_LIFE));

        player.set_health(150);
        assert!(!player.try_pickup_item(LIFE));
        assert_eq!(player.health(), 150);
    }

    #[test]
    fn armor_items_cap_at_200() {
        let mut player = Player::new(resources());
        assert!(player.try_pickup_item(HELMET));
        assert_eq!(player.armor(), 100);
        assert!(player.try_pickup_item(HELMET));
        assert_eq!(player.armor(), 200);
        assert!(!player.try_pickup_item(HELMET));
        assert!(!player.try_pickup_item(ARMOR));

        let mut player = Player::new(resources());
        assert!(player.try_pickup_item(HELMET));
        assert!(player.try_pickup_item(ARMOR));
        assert_eq!(player.armor(), 200);
    }

    #[test]
    fn unknown_items_are_rejected_without_side_effects() {
        let mut player = Player::new(resources());
        player.set_health(10);
        let before = player.clone();
        assert!(!player.try_pickup_item(DECORATION));
        assert!(!player.try_pickup_item(MISSING_WEAPON));
        assert!(!player.try_pickup_item(MISSING_WEAPON_AMMO));
        // 1010 sits below the first ammo code.
        assert!(!player.try_pickup_item(PISTOL_AMMO_EMPTY));
        assert!(!player.try_pickup_item(999));
        assert_eq!(player, before);
    }

    #[test]
    fn zero_portion_ammo_is_taken_but_adds_nothing() {
        let mut player = Player::new(resources());
        assert!(player.try_pickup_item(SHOTGUN_AMMO_EMPTY));
        assert_eq!(player.ammo(1), 0);

        while player.try_pickup_item(SHOTGUN_AMMO_X3) {}
        assert_eq!(player.ammo(1), 50);
        assert!(!player.try_pickup_item(SHOTGUN_AMMO_EMPTY));
    }

    #[test]
    fn caps_hold_for_any_pickup_sequence() {
        let mut player = Player::new(resources());
        let res = resources();
        for round in 0..200u32 {
            player.try_pickup_item(round % 9);
            assert!(player.armor() <= 200);
            for (i, weapon) in res.weapons.iter().enumerate() {
                assert!(player.ammo(i) <= weapon.limit);
            }
        }
    }

    #[test]
    fn procedure_debounce() {
        let mut player = Player::new(resources());
        let t = GameTime::from_seconds(10.0);
        assert!(player.try_activate_procedure(5, t));
        assert!(!player.try_activate_procedure(5, t + GameTime::from_seconds(1.9)));
        assert!(player.try_activate_procedure(5, t + GameTime::from_seconds(2.1)));
    }

    #[test]
    fn other_procedure_and_reset_bypass_debounce() {
        let mut player = Player::new(resources());
        let t = GameTime::from_seconds(1.0);
        assert!(player.try_activate_procedure(5, t));
        assert!(player.try_activate_procedure(6, t));
        assert!(player.try_activate_procedure(5, t));

        player.reset_activated_procedure();
        assert!(player.try_activate_procedure(5, t));
    }

    #[test]
    #[should_panic(expected = "nonzero")]
    fn procedure_zero_is_a_contract_violation() {
        Player::new(resources()).try_activate_procedure(0, GameTime::ZERO);
    }

    #[test]
    fn state_message_never_reports_negative_health() {
        let mut player = Player::new(resources());
        player.set_health(-30);
        player.give_red_key();
        player.give_blue_key();
        player.try_pickup_item(SHOTGUN);

        let state = player.build_state_message();
        assert_eq!(state.health, 0);
        assert_eq!(state.keys_mask, 0b101);
        assert_eq!(state.ammo[1], 10);
        assert_eq!(player.health(), -30);
    }

    #[test]
    fn give_all_keys() {
        let mut player = Player::new(resources());
        player.give_all_keys();
        assert!(player.have_red_key() && player.have_green_key() && player.have_blue_key());
        assert_eq!(player.build_state_message().keys_mask, 0b111);
    }

    #[test]
    fn clamp_speed_is_idempotent() {
        let mut player = Player::new(resources());
        player.update_movement(&input(255, 0.0, false));
        player.move_step(TICK);
        player.move_step(TICK);

        let wall_normal = Vec3::new(-1.0, 0.0, 0.0);
        player.clamp_speed(wall_normal);
        let once = player.speed();
        assert_eq!(once.x, 0.0);
        player.clamp_speed(wall_normal);
        assert_eq!(player.speed(), once);

        // Falling into the floor loses the downward part only.
        let before = player.speed();
        assert!(before.z < 0.0);
        player.clamp_speed(Vec3::UNIT_Z);
        let on_floor = Vec3::new(before.x, before.y, 0.0);
        assert_eq!(player.speed(), on_floor);

        // Tangent to the ceiling: untouched.
        player.clamp_speed(-Vec3::UNIT_Z);
        assert_eq!(player.speed(), on_floor);

        // Moving away from a surface: untouched.
        player.set_position(Vec3::ZERO);
        player.update_movement(&input(255, std::f32::consts::PI, false));
        player.move_step(TICK);
        let away = player.speed();
        player.clamp_speed(Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(player.speed(), away);
    }

    #[test]
    fn accelerates_up_to_max_speed_then_stops_without_oscillating() {
        let mut player = Player::new(resources());
        player.set_on_floor(true);
        player.update_movement(&input(255, 0.0, false));

        for _ in 0..120 {
            player.move_step(TICK);
            assert!(player.speed().x > 0.0);
            assert!(player.speed().xy_len() <= 5.0 + 1e-4);
        }
        assert!((player.speed().x - 5.0).abs() < 1e-3);
        assert_eq!(player.speed().y, 0.0);

        player.update_movement(&input(0, 0.0, false));
        let mut ticks = 0;
        while player.speed().x != 0.0 {
            let before = player.speed().x;
            player.move_step(TICK);
            assert!(player.speed().x >= 0.0 && player.speed().x < before);
            ticks += 1;
            assert!(ticks < 30, "deceleration must finish in bounded time");
        }
        assert_eq!(player.speed().y, 0.0);
    }

    #[test]
    fn latest_input_wins() {
        let mut player = Player::new(resources());
        player.update_movement(&input(255, 0.0, false));
        player.update_movement(&input(0, 0.0, false));
        player.move_step(TICK);
        assert_eq!(player.speed().x, 0.0);
    }

    #[test]
    fn jump_triggers_once_per_floor_contact() {
        let mut player = Player::new(resources());
        let dt = TICK.to_seconds_f32();
        player.set_on_floor(true);
        player.update_movement(&input(0, 0.0, true));

        player.move_step(TICK);
        let takeoff = player.speed().z;
        assert!((takeoff - (3.3 - 9.8 * dt)).abs() < 1e-4);

        // Still flagged on floor, but rising: no second impulse.
        player.move_step(TICK);
        assert!((player.speed().z - (takeoff - 9.8 * dt)).abs() < 1e-4);

        player.set_on_floor(false);
        while player.speed().z > 0.0 {
            player.move_step(TICK);
        }
        let falling = player.speed().z;

        player.set_on_floor(true);
        player.move_step(TICK);
        assert!((player.speed().z - (falling - 9.8 * dt + 3.3)).abs() < 1e-4);
    }

    #[test]
    fn vertical_speed_is_clamped() {
        let mut player = Player::new(resources());
        for _ in 0..100 {
            player.move_step(TICK);
        }
        assert!((player.speed().z + 5.0).abs() < 1e-4);
    }

    #[test]
    fn noclip_flies_and_stops_at_world_floor() {
        let mut player = Player::new(resources());
        player.set_noclip(true);
        player.update_movement(&input(0, 0.0, true));
        for _ in 0..10 {
            player.move_step(TICK);
        }
        assert!(player.speed().z > 0.0);
        assert!(player.position().z > 0.0);

        player.update_movement(&input(0, 0.0, false));
        for _ in 0..200 {
            player.move_step(TICK);
        }
        assert_eq!(player.position().z, 0.0);
        assert_eq!(player.speed().z, 0.0);
    }
}
