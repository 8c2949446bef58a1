//! Example pursuit scenario demonstrating agent navigation

use std::error::Error;

use botnav::prelude::*;

/// Builds the demo course: a gallery running east at ground level, a
/// sunken hall running south fifty units down, and a sight-blocking
/// wall between the start and the quarry.
fn build_course() -> (AreaMesh, RapierTraceWorld) {
    let mut mesh = AreaMesh::new();
    let gallery = mesh.add_area(Vec3::new(0.0, 0.0, 0.0), Vec3::new(500.0, 0.0, 150.0));
    let hall = mesh.add_area(Vec3::new(500.0, -50.0, 0.0), Vec3::new(650.0, -50.0, 600.0));
    mesh.connect_two_way(gallery, hall, Dir::East);

    // The wall runs along the gallery's south side, so the quarry stays
    // hidden until the hunter rounds the corner into the hall.
    let mut trace = RapierTraceWorld::new();
    trace.add_box(Vec3::new(250.0, 25.0, 200.0), Vec3::new(250.0, 85.0, 5.0));

    (mesh, trace)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // Config comes from a .ron or .json file when one is named on the
    // command line.
    let config = match std::env::args().nth(1) {
        Some(path) => NavConfig::load(path)?,
        None => NavConfig::default(),
    };

    let (mesh, trace) = build_course();
    let mut sim = Simulation::new(config.clone(), Box::new(mesh), Box::new(trace));

    // Populate: one quarry actor, one hunter bot ordered after it.
    let quarry_pos = Vec3::new(575.0, -50.0, 550.0);
    let quarry = sim.spawn_actor("quarry", Team(2), quarry_pos);

    let hunter = sim.spawn_bot(
        Bot::builder("hunter")
            .team(Team(1))
            .position(Vec3::new(50.0, 0.0, 75.0))
            .facing(Vec3::X)
            .vision(BotVision::new(&config))
            .intention(PursueIntention::new(&config).with_target(quarry))
            .locomotion(GroundLocomotion::new(&config))
            .body(StandardBody::new(&config))
            .build(),
    );

    // Fixed-tick loop; twenty simulated seconds is plenty of slack for
    // the course.
    let max_ticks = (20.0 / config.tick_interval) as u64;
    let mut caught = false;

    while sim.clock().tick() < max_ticks {
        sim.tick();
        let tick = sim.clock().tick();

        for event in sim.drain_events(hunter) {
            match event {
                BotEvent::Sighted { entity } => {
                    log::info!("[tick {tick}] sighted {entity:?}");
                }
                BotEvent::LostSight { entity } => {
                    log::info!("[tick {tick}] lost sight of {entity:?}");
                }
                BotEvent::Stuck { position, duration } => {
                    log::warn!(
                        "[tick {tick}] stuck for {duration:.1}s at ({:.0}, {:.0}, {:.0})",
                        position.x,
                        position.y,
                        position.z
                    );
                }
                BotEvent::Unstuck => log::info!("[tick {tick}] moving again"),
                BotEvent::MoveSuccess => log::info!("[tick {tick}] route complete"),
                BotEvent::MoveFailure { reason } => {
                    log::warn!("[tick {tick}] move failed: {reason:?}");
                }
                other => log::debug!("[tick {tick}] {other:?}"),
            }
        }

        let bot = sim.bot(hunter).ok_or("hunter left the registry")?;
        if bot.position().distance(quarry_pos) <= config.goal_tolerance {
            caught = true;
            break;
        }
    }

    let bot = sim.bot(hunter).ok_or("hunter left the registry")?;
    if caught {
        log::info!(
            "caught the quarry at ({:.0}, {:.0}, {:.0}) after {:.1}s",
            bot.position().x,
            bot.position().y,
            bot.position().z,
            sim.clock().now()
        );
    } else {
        log::warn!(
            "time limit hit before contact; hunter ended at ({:.0}, {:.0}, {:.0})",
            bot.position().x,
            bot.position().y,
            bot.position().z
        );
    }

    log::info!("{}", sim.stats().format_stats());
    Ok(())
}
