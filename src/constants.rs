// Voxel Sandbox Constants - SINGLE SOURCE OF TRUTH
//
// Tuning values shared by the block rules, the player physics and the room
// server. Config structs take their defaults from here.

/// World extent constants
pub mod world {
    /// Number of voxel layers. Valid Y is `0..WORLD_HEIGHT`.
    pub const WORLD_HEIGHT: i32 = 128;

    /// Longest distance a raycast will walk, whatever the caller asks for
    pub const MAX_RAY_DISTANCE: f32 = 1024.0;
}

/// Mining constants
pub mod mining {
    /// Hardness used for block ids that have no registry entry
    pub const DEFAULT_HARDNESS: i32 = 15;

    /// Divisor applied when the tool fails the block's requirement
    pub const WRONG_TOOL_PENALTY: f64 = 3.333;

    /// Divisor applied while submerged, and again while airborne
    pub const SUBMERGED_PENALTY: f64 = 5.0;
    pub const AIRBORNE_PENALTY: f64 = 5.0;

    /// Haste adds this fraction per level
    pub const HASTE_PER_LEVEL: f64 = 0.2;

    /// Mining fatigue multiplies by this per level
    pub const FATIGUE_BASE: f64 = 0.3;
}

/// Physics constants - all in blocks and seconds
pub mod physics {
    pub const PLAYER_WIDTH: f32 = 0.6;
    pub const PLAYER_HEIGHT: f32 = 1.8;
    pub const EYE_HEIGHT: f32 = 1.62;
    pub const STEP_HEIGHT: f32 = 0.6;

    pub const GRAVITY: f32 = 32.0;
    pub const TERMINAL_VELOCITY: f32 = 78.4;
    pub const JUMP_VELOCITY: f32 = 9.0;
    pub const SPRINT_JUMP_BOOST: f32 = 2.0;

    pub const WALK_SPEED: f32 = 4.317;
    pub const SPRINT_SPEED: f32 = 5.612;
    pub const SNEAK_SPEED: f32 = 1.31;
    pub const FLY_SPEED: f32 = 10.9;
    pub const FLY_VERTICAL_SPEED: f32 = 7.5;

    /// Horizontal acceleration on ground with default slipperiness (1/s)
    pub const GROUND_ACCEL: f32 = 14.0;
    /// Horizontal acceleration while airborne (1/s)
    pub const AIR_CONTROL: f32 = 2.5;
    /// Vertical drag in air, per second
    pub const AIR_DRAG: f32 = 0.4;
    /// Slipperiness every other block is measured against
    pub const DEFAULT_SLIPPERINESS: f32 = 0.6;

    pub const WATER_GRAVITY: f32 = 8.0;
    pub const WATER_BUOYANCY: f32 = 5.0;
    pub const WATER_DRAG: f32 = 4.0;
    pub const WATER_SWIM_ACCEL: f32 = 20.0;
    pub const WATER_MAX_RISE: f32 = 4.0;
    pub const WATER_MAX_SINK: f32 = 3.0;

    pub const LAVA_SPEED_FACTOR: f32 = 0.5;
    pub const LAVA_GRAVITY: f32 = 6.0;
    pub const LAVA_BUOYANCY: f32 = 3.0;
    pub const LAVA_DRAG: f32 = 2.0;
    pub const LAVA_SWIM_ACCEL: f32 = 10.0;
    pub const LAVA_MAX_RISE: f32 = 2.0;
    pub const LAVA_MAX_SINK: f32 = 1.5;

    pub const CLIMB_SPEED: f32 = 2.35;
    pub const CLING_FALL_SPEED: f32 = 0.05;
    pub const MAX_LADDER_FALL: f32 = 3.0;

    pub const COBWEB_SPEED_FACTOR: f32 = 0.05;
    pub const COBWEB_MAX_FALL: f32 = 0.25;
    pub const COBWEB_DRAG: f32 = 20.0;

    /// Per-second decay of vertical velocity while flying with no input
    pub const FLY_VERTICAL_DECAY: f32 = 12.0;

    pub const GROUND_PROBE: f32 = 0.06;
    pub const COLLISION_EPSILON: f32 = 1e-4;

    pub const FALL_DAMAGE_THRESHOLD: f32 = 3.0;
    pub const FALL_DAMAGE_PER_BLOCK: f32 = 1.0;
    /// Fall distance multiplier when landing on hay bales or honey
    pub const SOFT_LANDING_FACTOR: f32 = 0.2;
    pub const SLIME_BOUNCE: f32 = 0.8;
    /// Slime landings slower than this just stop
    pub const MIN_BOUNCE_SPEED: f32 = 1.0;

    pub const MAX_AIR: i32 = 300;
    pub const AIR_REGEN_PER_TICK: i32 = 5;

    pub const KNOCKBACK_VERTICAL: f32 = 6.0;
    /// Horizontal speed cap, also the strongest knockback accepted
    pub const MAX_HORIZONTAL_SPEED: f32 = 60.0;

    /// Window for the double-tap-jump flight toggle (seconds)
    pub const FLY_DOUBLE_TAP_WINDOW: f32 = 0.3;

    /// Longest step a single update will integrate (seconds)
    pub const MAX_TICK_DT: f32 = 0.1;
}

/// Room server constants
pub mod rooms {
    /// Alphabet for room codes: no I, O, 0 or 1
    pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    pub const ROOM_CODE_LENGTH: usize = 5;

    pub const MAX_PLAYERS_PER_ROOM: usize = 8;
    pub const COUNTDOWN_SECS: u64 = 3;
    pub const DAY_CYCLE_SECS: u64 = 1200;
    pub const TIME_SYNC_INTERVAL_SECS: u64 = 10;
    pub const STALE_ROOM_TIMEOUT_SECS: u64 = 300;
    pub const CLEANUP_INTERVAL_SECS: u64 = 60;
    pub const POSITION_RELAY_HZ: u32 = 10;

    /// Colors handed out to joining players, in order
    pub const PLAYER_COLORS: [&str; 8] = [
        "#e74c3c", "#3498db", "#2ecc71", "#f1c40f", "#9b59b6", "#e67e22", "#1abc9c", "#ecf0f1",
    ];
}
