//! samooh-sim - run the fusion core against a simulated robot fleet.
//!
//! The main thread plays the transport and the UI: it steps the simulated
//! robots, sends their reports, answers registration requests with each
//! robot's true start pose, issues periodic automatic commands, and watches
//! the display snapshots. The fusion thread owns the map.
//!
//! # Usage
//!
//! ```bash
//! # Three robots for 30 s with default config
//! cargo run --release --bin samooh-sim
//!
//! # Custom config, more robots, reproducible run
//! cargo run --release --bin samooh-sim -- --config samooh.toml --robots 5 --seed 7
//!
//! # Continue mapping from the last saved map
//! cargo run --release --bin samooh-sim -- --resume
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use rand::prelude::*;

use samooh::{
    Command, DisplaySnapshot, FusionEngine, FusionInputs, FusionOutputs, FusionThread,
    FusionThreadConfig, PositionLog, RegistrationInit, RobotId, SamoohConfig, SimConfig,
    SimulatedRobot, create_fusion_channels,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Map fusion with simulated robots", long_about = None)]
struct Args {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of simulated robots
    #[arg(short, long, default_value = "3")]
    robots: usize,

    /// Run time in seconds
    #[arg(short, long, default_value = "30")]
    duration: f64,

    /// Reports per second per robot
    #[arg(long, default_value = "10.0")]
    rate: f64,

    /// Random seed (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Load the map from the configured map path before starting
    #[arg(long)]
    resume: bool,
}

/// Steps between automatic commands.
const COMMAND_INTERVAL_STEPS: u64 = 50;

/// Steps between camera reports of one robot.
const CAMERA_INTERVAL_STEPS: u64 = 5;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match SamoohConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => SamoohConfig::default(),
    };

    log::info!("samooh-sim starting");
    log::info!(
        "  Map: {} cells, center ({}, {})",
        config.map.size,
        config.map.center_x,
        config.map.center_y
    );
    log::info!(
        "  Robots: {} at {} Hz for {} s",
        args.robots,
        args.rate,
        args.duration
    );

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    if let Err(e) = run(&args, &config, running) {
        log::error!("Simulation error: {}", e);
        std::process::exit(1);
    }

    log::info!("samooh-sim shutdown complete");
}

fn run(
    args: &Args,
    config: &SamoohConfig,
    running: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("  Seed: {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    // 1. Engine, optionally resumed from disk
    let mut engine = if args.resume {
        FusionEngine::from_map_file(&config.output.map_path, config)?
    } else {
        FusionEngine::new(config)
    };
    match PositionLog::create(&config.output.position_log_path) {
        Ok(log) => engine = engine.with_position_log(log),
        Err(e) => log::warn!("Position log disabled: {}", e),
    }

    // 2. Fleet; resumed robots restart at their registered origin
    let sim_config = SimConfig {
        ir_range_mm: config.sensor.ir_max_range * 10.0,
        ..SimConfig::default()
    };
    let mut robots: Vec<SimulatedRobot> = (1..=args.robots as RobotId)
        .map(|id| match engine.registry().get(id) {
            Ok(pose) => {
                let origin = pose.origin();
                let heading = pose.origin_heading();
                SimulatedRobot::new(id, origin.x, origin.y, heading, sim_config.clone())
            }
            Err(_) => SimulatedRobot::random(id, sim_config.clone(), &mut rng),
        })
        .collect();
    let start_poses: HashMap<RobotId, RegistrationInit> =
        robots.iter().map(|r| (r.id(), r.registration())).collect();

    // 3. Fusion thread
    let (inputs, outputs, endpoints) = create_fusion_channels(config.channels.capacity);
    let fusion = FusionThread::spawn(engine, endpoints, FusionThreadConfig::from_config(config));

    // 4. Drive the fleet
    let period = Duration::from_secs_f64(1.0 / args.rate.max(0.1));
    let deadline = Instant::now() + Duration::from_secs_f64(args.duration.max(0.0));
    let room = sim_config.room_half_cm as i32;
    let mut display = DisplayStats::default();
    let mut step: u64 = 0;

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        let tick_start = Instant::now();

        for robot in robots.iter_mut() {
            robot.step(&mut rng);
            inputs.reports.send(robot.report())?;
            if step % CAMERA_INTERVAL_STEPS == 0
                && let Some(camera) = robot.camera_report()
            {
                inputs.camera.send(camera)?;
            }
        }

        if step > 0 && step % COMMAND_INTERVAL_STEPS == 0 {
            let target = Command::Automatic {
                x: rng.gen_range(-room..=room),
                y: rng.gen_range(-room..=room),
            };
            inputs.commands.send(target)?;
        }

        service_outputs(&inputs, &outputs, &start_poses, &mut display)?;

        step += 1;
        if let Some(rest) = period.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    // 5. Shut down and report
    log::info!("Stopping after {} steps, waiting for fusion thread...", step);
    fusion.shutdown();
    let engine = match fusion.join() {
        Ok(engine) => engine,
        Err(e) => return Err(format!("fusion thread panicked: {:?}", e).into()),
    };
    for snapshot in outputs.snapshots.try_iter() {
        display.absorb(&snapshot);
    }

    let stats = engine.stats();
    let counts = engine.cell_counts();
    log::info!(
        "Fused {} reports from {} robots ({} dropped before registration)",
        stats.reports_integrated,
        engine.registry().len(),
        stats.reports_dropped
    );
    log::info!(
        "Map: {} open, {} obstacle, {} unknown cells",
        counts.open,
        counts.obstacle,
        counts.unknown
    );
    log::info!(
        "Display: {} snapshots, {} open and {} obstacle cell updates",
        display.snapshots,
        display.open_updates,
        display.obstacle_updates
    );
    log::info!(
        "Commands: {} translated, {} position records",
        stats.commands_translated,
        stats.positions_logged
    );
    Ok(())
}

/// What the display has received.
#[derive(Debug, Default)]
struct DisplayStats {
    snapshots: u64,
    open_updates: u64,
    obstacle_updates: u64,
}

impl DisplayStats {
    fn absorb(&mut self, snapshot: &DisplaySnapshot) {
        self.snapshots += 1;
        self.open_updates += snapshot.new_open.len() as u64;
        self.obstacle_updates += snapshot.new_obstacle.len() as u64;
    }
}

/// Play the UI and transport: register robots, consume drive commands and
/// snapshots.
fn service_outputs(
    inputs: &FusionInputs,
    outputs: &FusionOutputs,
    start_poses: &HashMap<RobotId, RegistrationInit>,
    display: &mut DisplayStats,
) -> Result<(), Box<dyn std::error::Error>> {
    for request in outputs.registration_requests.try_iter() {
        match start_poses.get(&request.id) {
            Some(init) => {
                log::info!(
                    "Registering robot {} at ({}, {}) heading {}",
                    init.id,
                    init.x,
                    init.y,
                    init.theta
                );
                inputs.registrations.send(*init)?;
            }
            None => log::warn!("No start pose known for robot {}", request.id),
        }
    }

    for drive in outputs.drive_commands.try_iter() {
        log::info!(
            "-> robot {}: drive to body ({}, {}) mm",
            drive.id,
            drive.body_x_mm,
            drive.body_y_mm
        );
    }

    for snapshot in outputs.snapshots.try_iter() {
        display.absorb(&snapshot);
        log::debug!(
            "Snapshot: {} robots, +{} open, +{} obstacle",
            snapshot.poses.len(),
            snapshot.new_open.len(),
            snapshot.new_obstacle.len()
        );
    }
    Ok(())
}
