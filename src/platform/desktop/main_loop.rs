use std::{
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
    time::{Duration, Instant},
};

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use tracing::{debug, info, warn, Level};

use crate::{
    colors::{ColorScheme, VisualizationParams, VisualizedAttribute},
    error::{LbmError, Result},
    floating_type_mod::FT,
    init_lbm_sim,
    obstacle::ScenePreset,
    simulation_parameters::SimulationParams,
    statistics::write_statistics,
    SceneConfig,
};

use super::recorder::{OutputSchedule, Recorder};

const CARGO_PKG_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
const CARGO_PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

const DEFAULT_FRAMES: usize = 250;
const DEFAULT_UPSCALE: usize = 4;

fn build_cli() -> App<'static, 'static> {
    App::new("Lattice Flow")
        .version(CARGO_PKG_VERSION)
        .author(CARGO_PKG_AUTHORS)
        .about(CARGO_PKG_DESCRIPTION)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Sets the level of verbosity"),
        )
        .subcommand(
            SubCommand::with_name("run")
                .about("Run simulation with given config")
                .arg(
                    Arg::with_name("SIMULATION_CONFIG")
                        .help("Sets the simulation parameters")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("SCENE_CONFIG")
                        .help("Scene setup (obstacles); the preset is used when missing")
                        .required(false)
                        .index(2),
                )
                .arg(
                    Arg::with_name("PRESET")
                        .long("preset")
                        .takes_value(true)
                        .default_value("cylinder")
                        .help("Scene preset: cylinder, square, wall or empty"),
                )
                .arg(
                    Arg::with_name("FRAMES")
                        .long("frames")
                        .short("n")
                        .takes_value(true)
                        .help("Number of frames to simulate"),
                )
                .arg(
                    Arg::with_name("OUTPUT_DIR")
                        .long("output-dir")
                        .short("o")
                        .takes_value(true)
                        .default_value("./output")
                        .help("Directory for logs, snapshots and images"),
                )
                .arg(
                    Arg::with_name("METRICS_EVERY")
                        .long("metrics-every")
                        .takes_value(true)
                        .help("Log global metrics every N frames (0 disables)"),
                )
                .arg(
                    Arg::with_name("SNAPSHOT_EVERY")
                        .long("snapshot-every")
                        .takes_value(true)
                        .help("Write a full-grid CSV snapshot every N frames (0 disables)"),
                )
                .arg(
                    Arg::with_name("IMAGE_EVERY")
                        .long("image-every")
                        .takes_value(true)
                        .help("Write a PNG frame every N frames (0 disables)"),
                )
                .arg(
                    Arg::with_name("VTK_EVERY")
                        .long("vtk-every")
                        .takes_value(true)
                        .help("Write a VTK file every N frames (0 disables)"),
                )
                .arg(
                    Arg::with_name("ATTRIBUTE")
                        .long("attribute")
                        .takes_value(true)
                        .default_value("speed")
                        .help("Visualized attribute: speed, density, velocity-x or velocity-y"),
                )
                .arg(
                    Arg::with_name("COLOR_SCHEME")
                        .long("color-scheme")
                        .takes_value(true)
                        .default_value("classic")
                        .help("classic or inferno"),
                )
                .arg(
                    Arg::with_name("UPSCALE")
                        .long("upscale")
                        .takes_value(true)
                        .help("Pixels per lattice cell in exported images [default: 4]"),
                )
                .arg(
                    Arg::with_name("OVERWRITE_CONFIG_FILE")
                        .long("overwrite-config-file")
                        .short("c")
                        .required(false)
                        .takes_value(true)
                        .help("Overwrite config"),
                )
                .arg(
                    Arg::with_name("STATISTICS_ENABLED")
                        .help("Track performance of individual steps")
                        .short("p")
                        .long("statistics-enabled")
                        .takes_value(false),
                )
                .arg(
                    Arg::with_name("STATISTICS_PATH")
                        .long("statistics-path")
                        .short("w")
                        .required(false)
                        .takes_value(true)
                        .help("Where to write statistics to"),
                ),
        )
        .subcommand(
            SubCommand::with_name("write-scene")
                .about("Write a preset scene to a YAML file")
                .arg(
                    Arg::with_name("PRESET")
                        .help("cylinder, square, wall or empty")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("OUTPUT_YAML")
                        .help("YAML file the scene is written to")
                        .required(true)
                        .index(2),
                )
                .arg(
                    Arg::with_name("SIMULATION_CONFIG")
                        .long("config")
                        .takes_value(true)
                        .help("Size the preset for the lattice of this parameter file"),
                ),
        )
        .subcommand(
            SubCommand::with_name("write-config")
                .about("Write the default simulation parameters to a YAML file")
                .arg(
                    Arg::with_name("OUTPUT_YAML")
                        .help("YAML file the parameters are written to")
                        .default_value("./simulation.yaml")
                        .index(1),
                ),
        )
}

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    // keep a subscriber that is already installed
    let _ = tracing_subscriber::fmt().with_max_level(level).with_target(false).try_init();
}

fn parse_value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>> {
    match matches.value_of(name) {
        None => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|_| LbmError::InvalidConfig(format!("invalid value `{}` for {}", s, name))),
    }
}

fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        LbmError::InvalidConfig(format!("failed reading `{}`: {}", path, e))
    })
}

fn load_simulation_params(parameter_file: &str, overwrite_file: Option<&str>) -> Result<SimulationParams> {
    let params_yaml = read_file(parameter_file)?;
    match overwrite_file {
        Some(overwrite_file) => SimulationParams::from_yaml_with_overwrite(&params_yaml, &read_file(overwrite_file)?),
        None => SimulationParams::from_yaml(&params_yaml),
    }
}

pub fn start() -> Result<()> {
    let matches = build_cli().get_matches();

    let verbosity = matches
        .subcommand()
        .1
        .map_or(0, |m| m.occurrences_of("v"))
        .max(matches.occurrences_of("v"));
    init_logging(verbosity);

    match matches.subcommand() {
        ("run", Some(run_matches)) => run(run_matches),
        ("write-scene", Some(subcmd_matches)) => write_scene(subcmd_matches),
        ("write-config", Some(subcmd_matches)) => {
            let yaml_path = subcmd_matches.value_of("OUTPUT_YAML").unwrap_or("./simulation.yaml");
            std::fs::write(yaml_path, SimulationParams::default().to_yaml()?)?;
            info!("default parameters written to `{}`", yaml_path);
            Ok(())
        }
        _ => Err(LbmError::InvalidConfig("missing subcommand".into())),
    }
}

fn write_scene(matches: &ArgMatches) -> Result<()> {
    let preset: ScenePreset = parse_preset(matches.value_of("PRESET"))?;
    let params = match matches.value_of("SIMULATION_CONFIG") {
        Some(parameter_file) => load_simulation_params(parameter_file, None)?,
        None => SimulationParams::default(),
    };

    let yaml_path = matches
        .value_of("OUTPUT_YAML")
        .ok_or_else(|| LbmError::InvalidConfig("missing output file".into()))?;
    let scene = SceneConfig::from_preset(preset, params.width, params.height);
    std::fs::write(yaml_path, scene.to_yaml()?)?;
    info!("scene `{}` written to `{}`", preset.name(), yaml_path);
    Ok(())
}

fn parse_preset(name: Option<&str>) -> Result<ScenePreset> {
    name.unwrap_or("cylinder").parse()
}

fn run(run_matches: &ArgMatches) -> Result<()> {
    let parameter_file = run_matches
        .value_of("SIMULATION_CONFIG")
        .ok_or_else(|| LbmError::InvalidConfig("missing simulation config".into()))?;
    let simulation_params = load_simulation_params(parameter_file, run_matches.value_of("OVERWRITE_CONFIG_FILE"))?;
    info!("{:?}", simulation_params);

    let scene_config = match run_matches.value_of("SCENE_CONFIG") {
        Some(scene_file_path) => SceneConfig::from_yaml(&read_file(scene_file_path)?)?,
        None => SceneConfig::from_preset(
            parse_preset(run_matches.value_of("PRESET"))?,
            simulation_params.width,
            simulation_params.height,
        ),
    };
    debug!("{:?}", scene_config);

    let defaults = OutputSchedule::default();
    let schedule = OutputSchedule {
        metrics_every: parse_value(run_matches, "METRICS_EVERY")?.unwrap_or(defaults.metrics_every),
        snapshot_every: parse_value(run_matches, "SNAPSHOT_EVERY")?.unwrap_or(defaults.snapshot_every),
        image_every: parse_value(run_matches, "IMAGE_EVERY")?.unwrap_or(defaults.image_every),
        vtk_every: parse_value(run_matches, "VTK_EVERY")?.unwrap_or(defaults.vtk_every),
    };

    let visualization_params = VisualizationParams {
        visualized_attribute: parse_value::<VisualizedAttribute>(run_matches, "ATTRIBUTE")?.unwrap_or(VisualizedAttribute::Speed),
        color_scheme: parse_value::<ColorScheme>(run_matches, "COLOR_SCHEME")?.unwrap_or(ColorScheme::Classic),
        range: None,
    };
    let upscale: usize = parse_value(run_matches, "UPSCALE")?.unwrap_or(DEFAULT_UPSCALE);

    let frames: usize = parse_value(run_matches, "FRAMES")?.unwrap_or(DEFAULT_FRAMES);
    let output_dir = PathBuf::from(run_matches.value_of("OUTPUT_DIR").unwrap_or("./output"));
    let statistics_path = run_matches.value_of("STATISTICS_PATH").map(PathBuf::from);
    let counters_enabled = run_matches.is_present("STATISTICS_ENABLED") || statistics_path.is_some();

    let mut sim = init_lbm_sim(simulation_params, &scene_config, counters_enabled)?;
    let mut recorder = Recorder::new(&output_dir, schedule, visualization_params, upscale)?;

    info!(
        "simulating {} frames of {} steps on a {}x{} lattice (Re = {:.1} around {} obstacle(s))",
        frames,
        sim.params().steps_per_frame,
        sim.params().width,
        sim.params().height,
        sim.params().reynolds_number(sim.params().height as FT * 0.24),
        scene_config.obstacles.len()
    );

    let mut total_duration = Duration::ZERO;
    for frame in 1..=frames {
        let a = Instant::now();
        sim.run_frame();
        let frame_duration = a.elapsed();
        total_duration += frame_duration;

        recorder.record_frame(&mut sim, frame, frame_duration.as_secs_f64())?;

        debug!(
            "{:05}: step {} {}msec ({}msec AVG)",
            frame,
            sim.step_number(),
            frame_duration.as_secs_f32() * 1000.,
            (total_duration / frame as u32).as_secs_f32() * 1000.
        );

        if !sim.state.fields_are_finite() {
            warn!(
                "fields are no longer finite at step {}; relaxation rate {} is likely unstable",
                sim.step_number(),
                sim.params().relaxation_rate
            );
            break;
        }
    }

    recorder.finish()?;
    info!(
        "finished {} steps in {:.3}s, output in `{}`",
        sim.step_number(),
        total_duration.as_secs_f64(),
        output_dir.display()
    );

    if counters_enabled {
        let s = write_statistics(&sim.pcounters, &sim.vcounters);
        report_statistics(&s, statistics_path.as_deref(), &mut std::io::stdout().lock())?;
    }

    Ok(())
}

/// The summary goes to `path` when given and to `out` otherwise.
fn report_statistics<W: Write>(statistics: &str, path: Option<&Path>, out: &mut W) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, statistics)?;
            info!("statistics written to `{}`", path.display());
        }
        None => {
            write!(out, "{}", statistics)?;
            out.flush()?;
        }
    }
    Ok(())
}
