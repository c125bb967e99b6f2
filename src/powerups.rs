use crate::session::Playfield;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Letters closer to screen center than this get no magnet pull,
/// preventing runaway oscillation at the center.
const MAGNET_MIN_DISTANCE: f64 = 50.0;

/// Magnet acceleration in px/s^2 (0.5 px/frame of added velocity at the
/// original 60 Hz).
const MAGNET_ACCEL: f64 = 30.0;

/// Bomb fuse in seconds
const TIME_BOMB_FUSE_SECS: f64 = 3.0;

/// Bonus per letter on screen when the bomb goes off
const BOMB_POINTS_PER_LETTER: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PowerUpKind {
    Freezer,
    Magnet,
    Multiplier,
    ExtraLife,
    TimeBomb,
    Shield,
    DoubleScore,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 7] = [
        PowerUpKind::Freezer,
        PowerUpKind::Magnet,
        PowerUpKind::Multiplier,
        PowerUpKind::ExtraLife,
        PowerUpKind::TimeBomb,
        PowerUpKind::Shield,
        PowerUpKind::DoubleScore,
    ];

    /// The enhanced set counted by the collector achievement
    pub const ENHANCED: [PowerUpKind; 5] = [
        PowerUpKind::Freezer,
        PowerUpKind::Magnet,
        PowerUpKind::Multiplier,
        PowerUpKind::ExtraLife,
        PowerUpKind::TimeBomb,
    ];

    pub fn color(self) -> (u8, u8, u8) {
        match self {
            PowerUpKind::Freezer => (150, 200, 255),
            PowerUpKind::Magnet => (255, 100, 255),
            PowerUpKind::Multiplier => (255, 215, 0),
            PowerUpKind::ExtraLife => (255, 100, 100),
            PowerUpKind::TimeBomb => (255, 50, 50),
            PowerUpKind::Shield => (100, 255, 200),
            PowerUpKind::DoubleScore => (255, 215, 100),
        }
    }

    pub fn duration(self) -> f64 {
        match self {
            PowerUpKind::Freezer => 8.0,
            PowerUpKind::Magnet => 6.0,
            PowerUpKind::Multiplier => 10.0,
            PowerUpKind::ExtraLife => 0.1,
            PowerUpKind::TimeBomb => TIME_BOMB_FUSE_SECS,
            PowerUpKind::Shield => 5.0,
            PowerUpKind::DoubleScore => 10.0,
        }
    }
}

/// Kind-specific effect state. All behavior dispatches over this closed
/// set; adding a kind is a compile error until every match arm exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    Freezer,
    Magnet { center: (f64, f64), accel: f64 },
    Multiplier { factor: i64 },
    ExtraLife { lives: u32 },
    TimeBomb { countdown: f64, warning: bool },
    Shield,
    DoubleScore,
}

impl Effect {
    fn for_kind(kind: PowerUpKind) -> Self {
        match kind {
            PowerUpKind::Freezer => Effect::Freezer,
            PowerUpKind::Magnet => Effect::Magnet {
                center: (0.0, 0.0),
                accel: MAGNET_ACCEL,
            },
            PowerUpKind::Multiplier => Effect::Multiplier { factor: 3 },
            PowerUpKind::ExtraLife => Effect::ExtraLife { lives: 1 },
            PowerUpKind::TimeBomb => Effect::TimeBomb {
                countdown: TIME_BOMB_FUSE_SECS,
                warning: false,
            },
            PowerUpKind::Shield => Effect::Shield,
            PowerUpKind::DoubleScore => Effect::DoubleScore,
        }
    }
}

/// A spawned power-up: inert until activated on pickup, then a time-boxed
/// (or instantaneous) modifier of the shared playfield.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    pub x: f64,
    pub y: f64,
    pub color: (u8, u8, u8),
    pub duration: f64,
    pub remaining: f64,
    pub active: bool,
    pub effect: Effect,
}

impl PowerUp {
    pub fn new(kind: PowerUpKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            x,
            y,
            color: kind.color(),
            duration: kind.duration(),
            remaining: kind.duration(),
            active: false,
            effect: Effect::for_kind(kind),
        }
    }

    /// One-time side effect on pickup. Instantaneous kinds apply and
    /// deactivate in the same call.
    pub fn activate(&mut self, field: &mut Playfield) {
        self.active = true;
        self.remaining = self.duration;

        match &mut self.effect {
            Effect::Freezer => {
                for letter in &mut field.letters {
                    letter.freeze();
                }
            }
            Effect::Magnet { center, .. } => {
                *center = field.center();
            }
            Effect::Multiplier { factor } => {
                field.score_multiplier = *factor;
            }
            Effect::ExtraLife { lives } => {
                field.grant_extra_life(*lives);
                self.active = false;
            }
            Effect::TimeBomb { countdown, warning } => {
                *countdown = TIME_BOMB_FUSE_SECS;
                *warning = false;
            }
            Effect::Shield => {
                field.shielded = true;
            }
            Effect::DoubleScore => {
                field.score_multiplier = 2;
            }
        }
    }

    /// Per-frame continuation while active; `dt` is wall-clock seconds so
    /// effect durations hold at any frame rate.
    pub fn update(&mut self, field: &mut Playfield, dt: f64) {
        if !self.active {
            return;
        }

        if let Effect::TimeBomb { countdown, warning } = &mut self.effect {
            *countdown -= dt;
            if *countdown <= 1.0 {
                *warning = true;
            }
            // Tolerance absorbs float drift from repeated fixed-step ticks
            if *countdown <= 1e-9 {
                let destroyed = field.letters.len() as i64;
                field.add_score_all(destroyed * BOMB_POINTS_PER_LETTER);
                field.letters.clear();
                self.active = false;
            }
            return;
        }

        if let Effect::Magnet { center, accel } = self.effect {
            for letter in &mut field.letters {
                let dx = center.0 - letter.x;
                let dy = center.1 - letter.y;
                let distance = (dx * dx + dy * dy).sqrt();
                if distance > MAGNET_MIN_DISTANCE {
                    letter.vx += dx / distance * accel * dt;
                    letter.vy += dy / distance * accel * dt;
                }
            }
        }

        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.expire(field);
            self.active = false;
        }
    }

    /// Reverse the effect when its duration runs out
    fn expire(&mut self, field: &mut Playfield) {
        match self.effect {
            Effect::Freezer => {
                for letter in &mut field.letters {
                    letter.thaw();
                }
            }
            Effect::Multiplier { .. } | Effect::DoubleScore => {
                field.score_multiplier = 1;
            }
            Effect::Shield => {
                field.shielded = false;
            }
            _ => {}
        }
    }

    /// Seconds left; the bomb reports its fuse
    pub fn remaining_secs(&self) -> f64 {
        match self.effect {
            Effect::TimeBomb { countdown, .. } => countdown.max(0.0),
            _ => self.remaining.max(0.0),
        }
    }
}

/// Display info for the active-effects HUD
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUpInfo {
    pub kind: PowerUpKind,
    pub remaining: f64,
    pub color: (u8, u8, u8),
    pub active: bool,
}

/// Spawn weights, walked cumulatively against a uniform draw in 1..=100.
/// The legacy shield/double-score kinds take the remaining 25 so the
/// table totals 100 and the fallback below stays unreachable.
const SPAWN_WEIGHTS: [(PowerUpKind, u32); 7] = [
    (PowerUpKind::Freezer, 20),
    (PowerUpKind::Magnet, 20),
    (PowerUpKind::Multiplier, 15),
    (PowerUpKind::ExtraLife, 10),
    (PowerUpKind::TimeBomb, 10),
    (PowerUpKind::Shield, 13),
    (PowerUpKind::DoubleScore, 12),
];

/// Tracks every live power-up effect for a session
#[derive(Debug, Default)]
pub struct PowerUpManager {
    pub active_powerups: Vec<PowerUp>,
}

impl PowerUpManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a weighted random kind and place it at the given coordinates
    pub fn create_random<R: Rng>(rng: &mut R, x: f64, y: f64) -> PowerUp {
        let draw = rng.gen_range(1..=100);
        Self::from_draw(draw, x, y)
    }

    /// Walk the cumulative weight table for a draw in 1..=100
    pub fn from_draw(draw: u32, x: f64, y: f64) -> PowerUp {
        let mut cumulative = 0;
        for (kind, weight) in SPAWN_WEIGHTS {
            cumulative += weight;
            if draw <= cumulative {
                return PowerUp::new(kind, x, y);
            }
        }

        // Unreachable while the table totals 100; kept as a safe default
        PowerUp::new(PowerUpKind::Freezer, x, y)
    }

    pub fn add(&mut self, powerup: PowerUp) {
        self.active_powerups.push(powerup);
    }

    /// Update every tracked effect in insertion order, then drop the
    /// ones that finished this frame.
    pub fn update_all(&mut self, field: &mut Playfield, dt: f64) {
        for powerup in &mut self.active_powerups {
            powerup.update(field, dt);
        }
        self.active_powerups.retain(|p| p.active);
    }

    pub fn has_active(&self, kind: PowerUpKind) -> bool {
        self.active_powerups
            .iter()
            .any(|p| p.kind == kind && p.active)
    }

    pub fn active_info(&self) -> Vec<PowerUpInfo> {
        self.active_powerups
            .iter()
            .map(|p| PowerUpInfo {
                kind: p.kind,
                remaining: p.remaining_secs(),
                color: p.color,
                active: p.active,
            })
            .collect()
    }

    pub fn clear_all(&mut self) {
        self.active_powerups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{FallingLetter, Playfield};

    fn field_with_letters(count: usize) -> Playfield {
        let mut field = Playfield::new(800.0, 600.0, 1, 10);
        for i in 0..count {
            field
                .letters
                .push(FallingLetter::new('a', 100.0 * i as f64, 50.0, 0.0, 120.0, 0.0));
        }
        field
    }

    #[test]
    fn draw_buckets_match_weight_table() {
        for draw in 1..=100 {
            let powerup = PowerUpManager::from_draw(draw, 0.0, 0.0);
            let expected = match draw {
                1..=20 => PowerUpKind::Freezer,
                21..=40 => PowerUpKind::Magnet,
                41..=55 => PowerUpKind::Multiplier,
                56..=65 => PowerUpKind::ExtraLife,
                66..=75 => PowerUpKind::TimeBomb,
                76..=88 => PowerUpKind::Shield,
                _ => PowerUpKind::DoubleScore,
            };
            assert_eq!(powerup.kind, expected, "draw {draw}");
        }
    }

    #[test]
    fn create_random_stays_in_table() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let powerup = PowerUpManager::create_random(&mut rng, 1.0, 2.0);
            assert!(PowerUpKind::ALL.contains(&powerup.kind));
            assert_eq!((powerup.x, powerup.y), (1.0, 2.0));
            assert!(!powerup.active);
        }
    }

    #[test]
    fn freezer_freezes_and_restores_velocities() {
        let mut field = field_with_letters(2);
        let mut freezer = PowerUp::new(PowerUpKind::Freezer, 0.0, 0.0);

        freezer.activate(&mut field);
        for letter in &field.letters {
            assert!(letter.is_frozen());
            assert_eq!(letter.vy, 0.0);
        }

        // Run past the 8 second duration
        for _ in 0..((8 * 60) + 1) {
            freezer.update(&mut field, 1.0 / 60.0);
        }

        assert!(!freezer.active);
        for letter in &field.letters {
            assert!(!letter.is_frozen());
            assert_eq!(letter.vy, 120.0);
        }
    }

    #[test]
    fn magnet_pulls_only_distant_letters() {
        let mut field = Playfield::new(800.0, 600.0, 1, 10);
        // Far from the (400, 300) center
        field
            .letters
            .push(FallingLetter::new('f', 100.0, 100.0, 0.0, 0.0, 0.0));
        // Within the dead zone
        field
            .letters
            .push(FallingLetter::new('n', 410.0, 300.0, 0.0, 0.0, 0.0));

        let mut magnet = PowerUp::new(PowerUpKind::Magnet, 0.0, 0.0);
        magnet.activate(&mut field);
        magnet.update(&mut field, 1.0 / 60.0);

        let far = &field.letters[0];
        assert!(far.vx > 0.0);
        assert!(far.vy > 0.0);

        let near = &field.letters[1];
        assert_eq!(near.vx, 0.0);
        assert_eq!(near.vy, 0.0);
    }

    #[test]
    fn magnet_expires_after_duration() {
        let mut field = field_with_letters(1);
        let mut magnet = PowerUp::new(PowerUpKind::Magnet, 0.0, 0.0);

        magnet.activate(&mut field);
        for _ in 0..((6 * 60) + 1) {
            magnet.update(&mut field, 1.0 / 60.0);
        }

        assert!(!magnet.active);
    }

    #[test]
    fn multiplier_triples_then_restores() {
        let mut field = field_with_letters(0);
        let mut multiplier = PowerUp::new(PowerUpKind::Multiplier, 0.0, 0.0);

        multiplier.activate(&mut field);
        assert_eq!(field.score_multiplier, 3);

        for _ in 0..((10 * 60) + 1) {
            multiplier.update(&mut field, 1.0 / 60.0);
        }

        assert!(!multiplier.active);
        assert_eq!(field.score_multiplier, 1);
    }

    #[test]
    fn double_score_doubles_then_restores() {
        let mut field = field_with_letters(0);
        let mut double = PowerUp::new(PowerUpKind::DoubleScore, 0.0, 0.0);

        double.activate(&mut field);
        assert_eq!(field.score_multiplier, 2);

        for _ in 0..((10 * 60) + 1) {
            double.update(&mut field, 1.0 / 60.0);
        }

        assert_eq!(field.score_multiplier, 1);
    }

    #[test]
    fn extra_life_is_instantaneous() {
        let mut field = field_with_letters(0);
        let mut life = PowerUp::new(PowerUpKind::ExtraLife, 0.0, 0.0);

        life.activate(&mut field);

        assert_eq!(field.fault_limit, 11);
        assert!(!life.active);
    }

    #[test]
    fn time_bomb_explodes_after_180_ticks() {
        let mut field = field_with_letters(4);
        let mut bomb = PowerUp::new(PowerUpKind::TimeBomb, 0.0, 0.0);

        bomb.activate(&mut field);
        for tick in 0..179 {
            bomb.update(&mut field, 1.0 / 60.0);
            assert!(bomb.active, "bomb went off early at tick {tick}");
        }
        assert_eq!(field.letters.len(), 4);

        bomb.update(&mut field, 1.0 / 60.0);

        assert!(!bomb.active);
        assert!(field.letters.is_empty());
        assert_eq!(field.scores[0], 40);

        // A further update must not award again
        bomb.update(&mut field, 1.0 / 60.0);
        assert_eq!(field.scores[0], 40);
    }

    #[test]
    fn time_bomb_awards_every_player() {
        let mut field = Playfield::new(800.0, 600.0, 2, 10);
        field
            .letters
            .push(FallingLetter::new('a', 10.0, 10.0, 0.0, 120.0, 0.0));

        let mut bomb = PowerUp::new(PowerUpKind::TimeBomb, 0.0, 0.0);
        bomb.activate(&mut field);
        bomb.update(&mut field, 3.5);

        assert_eq!(field.scores, vec![10, 10]);
    }

    #[test]
    fn time_bomb_warning_at_one_second() {
        let mut field = field_with_letters(1);
        let mut bomb = PowerUp::new(PowerUpKind::TimeBomb, 0.0, 0.0);

        bomb.activate(&mut field);
        bomb.update(&mut field, 1.5);
        assert!(matches!(
            bomb.effect,
            Effect::TimeBomb { warning: false, .. }
        ));

        bomb.update(&mut field, 0.6);
        assert!(matches!(bomb.effect, Effect::TimeBomb { warning: true, .. }));
        assert!(bomb.active);
    }

    #[test]
    fn shield_sets_and_clears_flag() {
        let mut field = field_with_letters(0);
        let mut shield = PowerUp::new(PowerUpKind::Shield, 0.0, 0.0);

        shield.activate(&mut field);
        assert!(field.shielded);

        for _ in 0..((5 * 60) + 1) {
            shield.update(&mut field, 1.0 / 60.0);
        }

        assert!(!shield.active);
        assert!(!field.shielded);
    }

    #[test]
    fn update_all_prunes_finished_effects() {
        let mut field = field_with_letters(1);
        let mut manager = PowerUpManager::new();

        let mut magnet = PowerUp::new(PowerUpKind::Magnet, 0.0, 0.0);
        magnet.activate(&mut field);
        manager.add(magnet);

        let mut freezer = PowerUp::new(PowerUpKind::Freezer, 0.0, 0.0);
        freezer.activate(&mut field);
        manager.add(freezer);

        assert!(manager.has_active(PowerUpKind::Magnet));
        assert!(manager.has_active(PowerUpKind::Freezer));

        // 6s magnet runs out; 8s freezer survives
        for _ in 0..((7 * 60) as usize) {
            manager.update_all(&mut field, 1.0 / 60.0);
        }

        assert!(!manager.has_active(PowerUpKind::Magnet));
        assert!(manager.has_active(PowerUpKind::Freezer));
        assert_eq!(manager.active_powerups.len(), 1);
    }

    #[test]
    fn active_info_reports_remaining_time() {
        let mut field = field_with_letters(0);
        let mut manager = PowerUpManager::new();

        let mut shield = PowerUp::new(PowerUpKind::Shield, 0.0, 0.0);
        shield.activate(&mut field);
        manager.add(shield);

        manager.update_all(&mut field, 1.0);

        let info = manager.active_info();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].kind, PowerUpKind::Shield);
        assert!(info[0].active);
        assert!((info[0].remaining - 4.0).abs() < 1e-9);
    }

    #[test]
    fn clear_all_empties_the_list() {
        let mut field = field_with_letters(0);
        let mut manager = PowerUpManager::new();
        let mut shield = PowerUp::new(PowerUpKind::Shield, 0.0, 0.0);
        shield.activate(&mut field);
        manager.add(shield);

        manager.clear_all();
        assert!(manager.active_powerups.is_empty());
        assert!(!manager.has_active(PowerUpKind::Shield));
    }
}
