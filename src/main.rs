//! Portal Maze headless runner
//!
//! Loads the maze directory, plays a scripted run for a fixed number of
//! frames and prints where the player ended up.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;

use portal_maze::Settings;
use portal_maze::maze::MapDirectory;
use portal_maze::sim::{GameEvent, GameWorld, TickInput, tick};

#[derive(Parser)]
#[command(name = "portal-maze")]
#[command(about = "Run the maze simulation without a window")]
struct Cli {
    /// Settings file (JSON); defaults are used when it is missing
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,
    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u32,
    /// Nominal frame rate
    #[arg(long, default_value_t = 60.0)]
    fps: f32,
    /// Start on this level instead of the configured first level
    #[arg(long)]
    level: Option<u32>,
}

/// Sweep the four cardinal directions, two seconds each
fn scripted_input(frame: u32, fps: f32) -> TickInput {
    const DIRECTIONS: [Vec2; 4] = [Vec2::X, Vec2::NEG_Y, Vec2::NEG_X, Vec2::Y];
    let seconds = frame as f32 / fps;
    let movement = DIRECTIONS[(seconds / 2.0) as usize % DIRECTIONS.len()];
    TickInput {
        movement,
        aim: Some(movement.y.atan2(movement.x)),
        attack: frame % (fps as u32).max(1) == 0,
        ..Default::default()
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings = Settings::load_or_default(&cli.settings);
    let maps = MapDirectory::new(&settings.maze_dir, settings.map_prefix.clone());
    log::info!("Portal Maze starting (maps in {})", maps.dir().display());

    let mut world = GameWorld::new(settings, maps).context("Failed to create world")?;
    if let Some(level) = cli.level {
        world
            .load_level(level)
            .with_context(|| format!("Failed to load level {level}"))?;
        world.materialize_spawns()?;
    }

    let fps = cli.fps.max(1.0);
    let elapsed = 1.0 / fps;
    let mut steps = 0;
    for frame in 0..cli.frames {
        steps += tick(&mut world, &scripted_input(frame, fps), elapsed)?;

        for event in world.drain_events() {
            match event {
                GameEvent::Won { .. } | GameEvent::Lost | GameEvent::LevelLoaded { .. } => {
                    log::info!("Frame {frame}: {event:?}")
                }
                _ => log::debug!("Frame {frame}: {event:?}"),
            }
        }
        if frame % (fps as u32).max(1) == 0 {
            log::info!(
                "Frame {}: level {}, score {}, health {}",
                frame,
                world.level_number(),
                world.score(),
                world.player().health
            );
        }
        if !world.phase().is_running() {
            break;
        }
    }

    let position = world.player_position();
    println!("Steps:    {steps}");
    println!("Level:    {}", world.level_number());
    println!("Score:    {}", world.score());
    println!("Health:   {}", world.player().health);
    println!("Phase:    {:?}", world.phase());
    println!(
        "Left:     {} treasures, {} monsters",
        world.level().remaining_treasures().count(),
        world.level().live_monsters().count()
    );
    println!("Position: ({:.2}, {:.2})", position.x, position.y);
    Ok(())
}
