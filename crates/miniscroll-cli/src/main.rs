use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use miniscroll_host::api::ShaderParamType;
use miniscroll_host::{ConfigLoadError, DispatchConfig, Miniscroll, MiniscrollConfig};
use miniscroll_sim::{Scene, SimEngine};
use tracing::{debug, info};

mod demo;
mod logging;

use demo::{Logo, Spinner};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Scene file (TOML) to play
    #[arg(short, long, required_unless_present = "write_config")]
    scene: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(short, long, default_value_t = 60)]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Config file (defaults to config.toml in the config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective config to the config file and exit
    #[arg(long)]
    write_config: bool,

    /// Enables debug mode
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<(MiniscrollConfig, Option<PathBuf>)> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => MiniscrollConfig::default_path(),
    };
    let Some(path) = path else {
        return Ok((MiniscrollConfig::default(), None));
    };

    match MiniscrollConfig::load(&path) {
        Ok(config) => Ok((config, Some(path))),
        Err(ConfigLoadError::NotFound(_)) => Ok((MiniscrollConfig::default(), Some(path))),
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", path.display())),
    }
}

/// Bind the demo classes, spawn the scene's objects and play `ticks` ticks
/// of its script.
fn run_timeline(
    scene: &Scene,
    dispatch: DispatchConfig,
    ticks: u64,
    dt: f32,
) -> anyhow::Result<(SimEngine, Miniscroll)> {
    let mut engine = SimEngine::from_scene(scene);
    let mut callbacks = Miniscroll::builder()
        .bind::<Logo>("Logo")
        .bind::<Spinner>("Spinner")
        .with_config(dispatch)
        .on_init(|_dispatcher, _engine| {
            debug!(target: "miniscroll::demo", "Engine initialized");
            Ok(())
        })
        .build()?;

    engine.init(&mut callbacks)?;
    let spawned = engine.spawn_scene(scene)?;
    info!("Spawned {} object(s)", spawned.len());

    for tick in 0..ticks {
        for step in scene.steps_at(tick) {
            engine
                .apply_step(step)
                .with_context(|| format!("Script step at tick {}", tick))?;
        }
        engine.tick(&mut callbacks, dt)?;
    }
    Ok((engine, callbacks))
}

fn print_summary(engine: &mut SimEngine, callbacks: &mut Miniscroll) -> anyhow::Result<()> {
    println!("Ran {} tick(s)", engine.ticks());

    let handles = callbacks.dispatcher().registry().handles().to_vec();
    println!("Live instances: {}", handles.len());
    for handle in handles {
        let Some(instance) = callbacks.dispatcher().registry().get(handle) else {
            continue;
        };
        let object = instance.object();
        let line = format!(
            "  {} {} (section '{}')",
            handle,
            object.class_name(),
            object.context().section()
        );

        let param = match object.class_name() {
            "Spinner" => "angle",
            _ => "age",
        };
        let value = engine.shader_param(callbacks, handle, "demo", param, ShaderParamType::Float)?;
        match value {
            Some(value) => println!("{} {}={:?}", line, param, value),
            None => println!("{}", line),
        }
    }

    let triggers = engine.triggers();
    println!("Fired triggers: {}", triggers.len());
    for trigger in triggers {
        println!(
            "  {} {} {:?}",
            trigger.object, trigger.event, trigger.refinements
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_path) = load_config(cli.config.as_deref())?;
    let _guard = logging::init_logging(cli.debug, config.logging.file)?;

    if cli.write_config {
        let path = config_path.context("No config directory available")?;
        config.save(&path)?;
        eprintln!("Config file written to: {}", path.display());
        return Ok(());
    }

    let scene_path = cli.scene.context("--scene is required")?;
    info!("Starting miniscroll with scene {}", scene_path.display());
    let scene = Scene::load(&scene_path)?;

    let (mut engine, mut callbacks) = run_timeline(&scene, config.dispatch, cli.ticks, cli.dt)?;
    print_summary(&mut engine, &mut callbacks)
}
