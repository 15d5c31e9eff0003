use super::aabb::{aabb_for_voxel, aabb_from_feet, aabb_intersects, aabb_voxel_bounds};
use super::collision::{corners_supported, move_with_collision, probe_ground};
use super::PhysicsConfig;
use crate::constants::physics::*;
use crate::input::PlayerInput;
use crate::world::{is_solid, slipperiness, BlockId, BlockKind, CollisionShape, VoxelPos, VoxelWorld};
use cgmath::{InnerSpace, Point3, Vector3, Zero};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Physics mode for one tick. Exactly one is active, picked by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    Normal,
    Water,
    Lava,
    Climbing,
    Cobweb,
    Flying,
}

impl MovementMode {
    /// flying > water > lava > climbing > cobweb > normal
    pub fn select(flying: bool, medium: &Medium) -> MovementMode {
        if flying {
            MovementMode::Flying
        } else if medium.in_water {
            MovementMode::Water
        } else if medium.in_lava {
            MovementMode::Lava
        } else if medium.climbing {
            MovementMode::Climbing
        } else if medium.in_cobweb {
            MovementMode::Cobweb
        } else {
            MovementMode::Normal
        }
    }
}

/// What the body is immersed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Medium {
    pub in_water: bool,
    pub in_lava: bool,
    pub climbing: bool,
    pub in_cobweb: bool,
    pub head_in_water: bool,
}

/// Classify every voxel the body overlaps
pub fn sample_medium<W: VoxelWorld + ?Sized>(
    world: &W,
    feet: Point3<f32>,
    config: &PhysicsConfig,
) -> Medium {
    let body = aabb_from_feet(feet, config.player_width, config.player_height);
    let (min, max) = aabb_voxel_bounds(&body);
    let mut medium = Medium::default();

    for x in min.x..=max.x {
        for y in min.y.max(0)..=max.y.min(world.height() - 1) {
            for z in min.z..=max.z {
                let pos = VoxelPos::new(x, y, z);
                let Some(kind) = world.get_block(pos).kind() else {
                    continue;
                };
                let overlaps = aabb_for_voxel(pos, CollisionShape::Full)
                    .map(|cell| aabb_intersects(&body, &cell))
                    .unwrap_or(false);
                if !overlaps {
                    continue;
                }
                match kind {
                    BlockKind::Water => medium.in_water = true,
                    BlockKind::Lava => medium.in_lava = true,
                    BlockKind::Cobweb => medium.in_cobweb = true,
                    k if k.is_climbable() => medium.climbing = true,
                    _ => {}
                }
            }
        }
    }

    let eye = VoxelPos::from_world_pos(Point3::new(feet.x, feet.y + config.eye_height, feet.z));
    medium.head_in_water = world.get_block(eye) == BlockId::WATER;
    medium
}

/// Movement state of one player
#[derive(Debug, Clone)]
pub struct PlayerPhysics {
    /// Feet position
    pub position: Point3<f32>,
    pub velocity: Vector3<f32>,
    /// Radians, 0 looks toward -Z
    pub yaw: f32,
    /// Radians, positive looks up
    pub pitch: f32,

    pub on_ground: bool,
    pub in_water: bool,
    pub in_lava: bool,
    pub climbing: bool,
    pub flying: bool,
    pub sprinting: bool,
    pub sneaking: bool,
    pub swimming: bool,
    pub in_cobweb: bool,
    /// Whether the jump double-tap may toggle flight
    pub allow_flight: bool,

    pub fall_distance: f32,
    pub air_supply: i32,

    mode: MovementMode,
    pending_fall_damage: u32,
    config: PhysicsConfig,
    clock: f32,
    jump_held: bool,
    last_jump_tap: Option<f32>,
    last_supported: Point3<f32>,
}

impl PlayerPhysics {
    pub fn new(position: Point3<f32>) -> Self {
        Self::with_config(position, PhysicsConfig::default())
    }

    pub fn with_config(position: Point3<f32>, config: PhysicsConfig) -> Self {
        Self {
            position,
            velocity: Vector3::zero(),
            yaw: 0.0,
            pitch: 0.0,
            on_ground: false,
            in_water: false,
            in_lava: false,
            climbing: false,
            flying: false,
            sprinting: false,
            sneaking: false,
            swimming: false,
            in_cobweb: false,
            allow_flight: true,
            fall_distance: 0.0,
            air_supply: config.max_air,
            mode: MovementMode::Normal,
            pending_fall_damage: 0,
            config,
            clock: 0.0,
            jump_held: false,
            last_jump_tap: None,
            last_supported: position,
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Mode used by the most recent update
    pub fn mode(&self) -> MovementMode {
        self.mode
    }

    pub fn eye_position(&self) -> Point3<f32> {
        Point3::new(
            self.position.x,
            self.position.y + self.config.eye_height,
            self.position.z,
        )
    }

    pub fn set_look(&mut self, yaw: f32, pitch: f32) {
        if yaw.is_finite() {
            self.yaw = yaw;
        }
        if pitch.is_finite() {
            self.pitch = pitch.clamp(-FRAC_PI_2, FRAC_PI_2);
        }
    }

    /// Fall damage from the last landing. Reading it clears it.
    pub fn take_fall_damage(&mut self) -> u32 {
        std::mem::take(&mut self.pending_fall_damage)
    }

    /// Move instantly, dropping all motion state
    pub fn teleport(&mut self, position: Point3<f32>) {
        if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
            return;
        }
        self.position = position;
        self.velocity = Vector3::zero();
        self.fall_distance = 0.0;
        self.pending_fall_damage = 0;
        self.on_ground = false;
        self.in_water = false;
        self.in_lava = false;
        self.climbing = false;
        self.in_cobweb = false;
        self.swimming = false;
        self.flying = false;
        self.last_jump_tap = None;
        self.last_supported = position;
    }

    /// Velocity override along a horizontal direction plus a fixed upward kick
    pub fn knockback(&mut self, direction: Vector3<f32>, strength: f32) {
        let horizontal = Vector3::new(direction.x, 0.0, direction.z);
        let length = horizontal.magnitude();
        let strength = if strength.is_finite() {
            strength.clamp(-MAX_HORIZONTAL_SPEED, MAX_HORIZONTAL_SPEED)
        } else {
            0.0
        };
        if length.is_finite() && length > 1e-6 {
            let dir = horizontal / length;
            self.velocity.x = dir.x * strength;
            self.velocity.z = dir.z * strength;
        } else {
            self.velocity.x = 0.0;
            self.velocity.z = 0.0;
        }
        self.velocity.y = KNOCKBACK_VERTICAL;
        self.on_ground = false;
    }

    /// Advance one tick
    pub fn update<W: VoxelWorld + ?Sized>(&mut self, world: &W, dt: f32, input: &PlayerInput) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let dt = dt.min(MAX_TICK_DT);
        self.clock += dt;
        if !(self.velocity.x.is_finite() && self.velocity.y.is_finite() && self.velocity.z.is_finite()) {
            self.velocity = Vector3::zero();
        }

        self.handle_flight_toggle(input);
        self.sneaking = input.sneak;
        self.sprinting = input.sprint && input.forward && !input.sneak;

        let medium = sample_medium(world, self.position, &self.config);
        self.in_water = medium.in_water;
        self.in_lava = medium.in_lava;
        self.climbing = medium.climbing;
        self.in_cobweb = medium.in_cobweb;

        let mode = MovementMode::select(self.flying, &medium);
        self.mode = mode;
        self.swimming = mode == MovementMode::Water && self.sprinting;

        let wish = self.wish_direction(input);
        match mode {
            MovementMode::Normal => self.apply_normal(world, wish, input, dt),
            MovementMode::Water => self.apply_fluid(wish, input, dt, &FluidParams::WATER),
            MovementMode::Lava => self.apply_fluid(wish, input, dt, &FluidParams::LAVA),
            MovementMode::Climbing => self.apply_climbing(wish, input, dt),
            MovementMode::Cobweb => self.apply_cobweb(wish, dt),
            MovementMode::Flying => self.apply_flying(wish, input, dt),
        }

        self.limit_speed();
        let was_on_ground = self.on_ground;
        let start = self.position;
        let impact_speed = self.velocity.y;
        let dims = self.config.body_dims();
        let allow_step = was_on_ground && mode != MovementMode::Flying;
        let moved = move_with_collision(world, start, self.velocity * dt, &dims, allow_step);
        self.position = moved.position;
        if moved.blocked_x {
            self.velocity.x = 0.0;
        }
        if moved.blocked_z {
            self.velocity.z = 0.0;
        }
        if moved.hit_ceiling && self.velocity.y > 0.0 {
            self.velocity.y = 0.0;
        }

        if self.sneaking
            && was_on_ground
            && mode == MovementMode::Normal
            && !corners_supported(world, self.position, self.config.player_width)
        {
            self.position.x = self.last_supported.x;
            self.position.z = self.last_supported.z;
            self.velocity.x = 0.0;
            self.velocity.z = 0.0;
        }

        let dy = self.position.y - start.y;
        match mode {
            MovementMode::Normal if dy < 0.0 => self.fall_distance += -dy,
            MovementMode::Normal => {}
            _ => self.fall_distance = 0.0,
        }

        let grounded =
            moved.landed || (self.velocity.y <= 0.0 && probe_ground(world, self.position, &dims));
        self.on_ground = grounded;
        if grounded {
            if self.velocity.y < 0.0 {
                self.velocity.y = 0.0;
            }
            if !was_on_ground {
                self.land(world, impact_speed);
            }
            if self.flying && self.sneaking {
                self.flying = false;
            }
        }

        if self.on_ground && corners_supported(world, self.position, self.config.player_width) {
            self.last_supported = self.position;
        }

        if medium.head_in_water {
            self.air_supply = (self.air_supply - 1).max(0);
        } else {
            self.air_supply = (self.air_supply + AIR_REGEN_PER_TICK).min(self.config.max_air);
        }
    }

    /// Keep one tick's sweep a few voxels wide whatever set the velocity
    fn limit_speed(&mut self) {
        let horizontal = self.velocity.x.hypot(self.velocity.z);
        if horizontal > MAX_HORIZONTAL_SPEED {
            let scale = MAX_HORIZONTAL_SPEED / horizontal;
            self.velocity.x *= scale;
            self.velocity.z *= scale;
        }
        self.velocity.y = self.velocity.y.clamp(-TERMINAL_VELOCITY, TERMINAL_VELOCITY);
    }

    fn handle_flight_toggle(&mut self, input: &PlayerInput) {
        let pressed = input.jump && !self.jump_held;
        self.jump_held = input.jump;

        if input.fly_toggle && self.allow_flight {
            self.set_flying(!self.flying);
            self.last_jump_tap = None;
            return;
        }
        if !pressed || !self.allow_flight {
            return;
        }
        match self.last_jump_tap {
            Some(previous) if self.clock - previous <= FLY_DOUBLE_TAP_WINDOW => {
                self.set_flying(!self.flying);
                self.last_jump_tap = None;
            }
            _ => self.last_jump_tap = Some(self.clock),
        }
    }

    fn set_flying(&mut self, flying: bool) {
        self.flying = flying;
        if flying {
            self.velocity.y = 0.0;
            self.fall_distance = 0.0;
        }
    }

    /// Normalized horizontal intent in world space
    fn wish_direction(&self, input: &PlayerInput) -> Vector3<f32> {
        let (strafe, forward) = input.movement_axes();
        let (sin, cos) = self.yaw.sin_cos();
        let ahead = Vector3::new(-sin, 0.0, -cos);
        let right = Vector3::new(cos, 0.0, -sin);
        let wish = ahead * forward + right * strafe;
        if wish.magnitude2() > 1.0 {
            wish.normalize()
        } else {
            wish
        }
    }

    fn ground_speed(&self) -> f32 {
        if self.sneaking {
            self.config.sneak_speed
        } else if self.sprinting {
            self.config.sprint_speed
        } else {
            self.config.walk_speed
        }
    }

    fn approach_horizontal(&mut self, target: Vector3<f32>, rate: f32) {
        let t = rate.clamp(0.0, 1.0);
        self.velocity.x += (target.x - self.velocity.x) * t;
        self.velocity.z += (target.z - self.velocity.z) * t;
    }

    fn apply_normal<W: VoxelWorld + ?Sized>(
        &mut self,
        world: &W,
        wish: Vector3<f32>,
        input: &PlayerInput,
        dt: f32,
    ) {
        let target = wish * self.ground_speed();
        if self.on_ground {
            let below = block_under(world, self.position, self.config.player_width);
            // Slippery ground hands over velocity more slowly
            let grip = ((1.0 - slipperiness(below)) / (1.0 - DEFAULT_SLIPPERINESS)).max(0.05);
            self.approach_horizontal(target, GROUND_ACCEL * grip * dt);

            if input.jump {
                self.velocity.y = self.config.jump_velocity;
                if self.sprinting {
                    let (sin, cos) = self.yaw.sin_cos();
                    self.velocity.x += -sin * SPRINT_JUMP_BOOST;
                    self.velocity.z += -cos * SPRINT_JUMP_BOOST;
                }
                return;
            }
        } else {
            self.approach_horizontal(target, AIR_CONTROL * dt);
        }

        self.velocity.y -= self.config.gravity * dt;
        self.velocity.y *= (1.0 - AIR_DRAG * dt).max(0.0);
        self.velocity.y = self.velocity.y.max(-TERMINAL_VELOCITY);
    }

    fn apply_fluid(&mut self, wish: Vector3<f32>, input: &PlayerInput, dt: f32, fluid: &FluidParams) {
        let target = wish * self.config.walk_speed * fluid.speed_factor;
        self.approach_horizontal(target, fluid.drag * dt);

        self.velocity.y += (fluid.buoyancy - fluid.gravity) * dt;
        if input.jump {
            self.velocity.y += fluid.swim_accel * dt;
        }
        if input.sneak {
            self.velocity.y -= fluid.swim_accel * dt;
        }
        self.velocity.y *= (1.0 - fluid.drag * dt).max(0.0);
        self.velocity.y = self.velocity.y.clamp(-fluid.max_sink, fluid.max_rise);
    }

    fn apply_climbing(&mut self, wish: Vector3<f32>, input: &PlayerInput, dt: f32) {
        let target = wish * self.ground_speed();
        self.approach_horizontal(target, GROUND_ACCEL * dt);

        self.velocity.y = if input.jump {
            CLIMB_SPEED
        } else if input.sneak {
            -CLIMB_SPEED
        } else if input.forward {
            -CLING_FALL_SPEED
        } else {
            (self.velocity.y - self.config.gravity * dt).max(-MAX_LADDER_FALL)
        };
    }

    fn apply_cobweb(&mut self, wish: Vector3<f32>, dt: f32) {
        let target = wish * self.ground_speed() * COBWEB_SPEED_FACTOR;
        let keep = (1.0 - COBWEB_DRAG * dt).max(0.0);
        self.velocity.x = self.velocity.x * keep + target.x * (1.0 - keep);
        self.velocity.z = self.velocity.z * keep + target.z * (1.0 - keep);
        self.velocity.y = (self.velocity.y * keep - self.config.gravity * dt).max(-COBWEB_MAX_FALL);
    }

    fn apply_flying(&mut self, wish: Vector3<f32>, input: &PlayerInput, dt: f32) {
        let target = wish * self.config.fly_speed;
        self.velocity.x = target.x;
        self.velocity.z = target.z;

        self.velocity.y = if input.jump {
            FLY_VERTICAL_SPEED
        } else if input.sneak {
            -FLY_VERTICAL_SPEED
        } else {
            self.velocity.y * (1.0 - FLY_VERTICAL_DECAY * dt).max(0.0)
        };
    }

    /// First ground contact after being airborne
    fn land<W: VoxelWorld + ?Sized>(&mut self, world: &W, impact_speed: f32) {
        let below = block_under(world, self.position, self.config.player_width);
        let kind = below.kind();

        if kind == Some(BlockKind::SlimeBlock) && !self.sneaking {
            if -impact_speed > MIN_BOUNCE_SPEED {
                self.velocity.y = -impact_speed * self.config.slime_bounce;
                self.on_ground = false;
            }
            self.fall_distance = 0.0;
            return;
        }

        if self.mode != MovementMode::Water && self.mode != MovementMode::Flying {
            let mut effective = self.fall_distance;
            if kind.map(BlockKind::is_soft_landing).unwrap_or(false) {
                effective *= SOFT_LANDING_FACTOR;
            }
            let damage =
                ((effective - self.config.fall_damage_threshold) * self.config.fall_damage_per_block).floor();
            if damage > 0.0 {
                self.pending_fall_damage = self.pending_fall_damage.saturating_add(damage as u32);
            }
        }
        self.fall_distance = 0.0;
    }
}

/// Block the feet rest on: the one under the centre, else the first solid corner
fn block_under<W: VoxelWorld + ?Sized>(world: &W, feet: Point3<f32>, width: f32) -> BlockId {
    let y = (feet.y - GROUND_PROBE).floor() as i32;
    let center = world.get_block(VoxelPos::new(feet.x.floor() as i32, y, feet.z.floor() as i32));
    if is_solid(center) {
        return center;
    }
    let half = width * 0.5 - COLLISION_EPSILON;
    [(-half, -half), (half, -half), (-half, half), (half, half)]
        .iter()
        .map(|&(dx, dz)| {
            world.get_block(VoxelPos::new(
                (feet.x + dx).floor() as i32,
                y,
                (feet.z + dz).floor() as i32,
            ))
        })
        .find(|&block| is_solid(block))
        .unwrap_or(center)
}

struct FluidParams {
    speed_factor: f32,
    gravity: f32,
    buoyancy: f32,
    drag: f32,
    swim_accel: f32,
    max_rise: f32,
    max_sink: f32,
}

impl FluidParams {
    const WATER: FluidParams = FluidParams {
        speed_factor: 1.0,
        gravity: WATER_GRAVITY,
        buoyancy: WATER_BUOYANCY,
        drag: WATER_DRAG,
        swim_accel: WATER_SWIM_ACCEL,
        max_rise: WATER_MAX_RISE,
        max_sink: WATER_MAX_SINK,
    };

    const LAVA: FluidParams = FluidParams {
        speed_factor: LAVA_SPEED_FACTOR,
        gravity: LAVA_GRAVITY,
        buoyancy: LAVA_BUOYANCY,
        drag: LAVA_DRAG,
        swim_accel: LAVA_SWIM_ACCEL,
        max_rise: LAVA_MAX_RISE,
        max_sink: LAVA_MAX_SINK,
    };
}
