// Movement + physics integration tests
//
// Drive a player through small hand-built worlds with the same per-tick
// input a client would send and check where the body ends up.

use cgmath::Point3;
use std::f32::consts::FRAC_PI_2;
use voxel_sandbox::physics::{MovementMode, PlayerPhysics};
use voxel_sandbox::world::{BlockId, BlockKind, MemoryWorld, VoxelPos, VoxelWorld};
use voxel_sandbox::PlayerInput;

const DT: f32 = 0.05;

/// Stone up to y=9 with a dirt layer at y=10, so players stand at y=11
fn ground() -> MemoryWorld {
    let mut world = MemoryWorld::new();
    world.fill(VoxelPos::new(-8, 0, -8), VoxelPos::new(8, 9, 8), BlockId::STONE);
    world.fill(VoxelPos::new(-8, 10, -8), VoxelPos::new(8, 10, 8), BlockId::DIRT);
    world
}

fn settled_at(world: &MemoryWorld, x: f32, z: f32) -> PlayerPhysics {
    let mut player = PlayerPhysics::new(Point3::new(x, 11.0, z));
    player.update(world, DT, &PlayerInput::default());
    assert!(player.on_ground);
    player
}

fn forward(sprint: bool) -> PlayerInput {
    PlayerInput {
        forward: true,
        sprint,
        ..PlayerInput::default()
    }
}

fn run(player: &mut PlayerPhysics, world: &MemoryWorld, input: &PlayerInput, ticks: usize) {
    for _ in 0..ticks {
        player.update(world, DT, input);
    }
}

#[test]
fn test_wall_stops_walking_player() {
    let mut world = ground();
    world.fill(VoxelPos::new(3, 11, -1), VoxelPos::new(3, 13, 1), BlockId::STONE);
    let mut player = settled_at(&world, 0.5, 0.5);
    player.set_look(-FRAC_PI_2, 0.0); // facing +X

    run(&mut player, &world, &forward(false), 60);
    assert!(player.position.x < 2.7 && player.position.x > 2.69, "{}", player.position.x);
    assert!((player.position.z - 0.5).abs() < 1e-3);
    assert_eq!(player.velocity.x, 0.0);
    assert!(player.on_ground);
}

#[test]
fn test_walking_steps_onto_slabs() {
    let mut world = ground();
    world.fill(
        VoxelPos::new(3, 11, -1),
        VoxelPos::new(8, 11, 1),
        BlockKind::StoneSlab.id(),
    );
    let mut player = settled_at(&world, 0.5, 0.5);
    player.set_look(-FRAC_PI_2, 0.0);

    run(&mut player, &world, &forward(false), 25);
    assert!(player.position.x > 3.0);
    assert_eq!(player.position.y, 11.5);
    assert!(player.on_ground);
}

#[test]
fn test_sprinting_outpaces_walking() {
    let world = ground();
    let distance = |sprint: bool| {
        let mut player = settled_at(&world, -7.5, 0.5);
        player.set_look(-FRAC_PI_2, 0.0);
        run(&mut player, &world, &forward(sprint), 10);
        player.position.x + 7.5
    };
    let walked = distance(false);
    let sprinted = distance(true);
    assert!(walked > 1.0);
    assert!(sprinted > walked);
}

#[test]
fn test_pool_breaks_long_fall() {
    let dry = ground();
    let mut pool = ground();
    pool.fill(VoxelPos::new(-3, 11, -3), VoxelPos::new(3, 13, 3), BlockId::WATER);

    let fall = |world: &MemoryWorld| {
        let mut player = PlayerPhysics::new(Point3::new(0.5, 21.0, 0.5));
        let mut damage = 0;
        for _ in 0..300 {
            player.update(world, DT, &PlayerInput::default());
            damage += player.take_fall_damage();
        }
        (damage, player.mode())
    };

    let (dry_damage, _) = fall(&dry);
    let (pool_damage, mode) = fall(&pool);
    assert!(dry_damage >= 6, "{}", dry_damage);
    assert_eq!(pool_damage, 0);
    assert_eq!(mode, MovementMode::Water);
}

#[test]
fn test_mining_out_the_floor_drops_player() {
    let mut world = ground();
    let mut player = settled_at(&world, 0.5, 0.5);

    world.set_block(VoxelPos::new(0, 10, 0), BlockId::AIR);
    run(&mut player, &world, &PlayerInput::default(), 20);
    assert_eq!(player.position.y, 10.0);
    assert!(player.on_ground);
    assert_eq!(player.take_fall_damage(), 0);
}
