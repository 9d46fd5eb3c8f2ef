mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::Config;
use raystage_interface::{SceneInterface, Session};
use raystage_kernel::FrameBuffer;
use raystage_shading::PluginRegistry;
use raystage_tools::SceneInspector;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "raystage", about = "Render scene scripts and inspect frame buffers")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scene script
    Render {
        /// Script to run; relative paths inside it resolve next to it
        script: PathBuf,
        /// Worker threads, overrides the configuration
        #[arg(short, long)]
        threads: Option<usize>,
        /// Rows per work band, overrides the configuration
        #[arg(long)]
        band_rows: Option<u32>,
        /// Print the parsed commands instead of running them
        #[arg(long)]
        print: bool,
        /// Describe these entities after the run
        #[arg(short, long)]
        describe: Vec<String>,
    },
    /// Print dimensions and channel statistics of a saved frame buffer
    Inspect {
        /// Frame-buffer file
        file: PathBuf,
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the built-in plugins and the shader types they provide
    Plugins,
    /// Render a built-in scene made of procedural meshes
    Demo {
        /// Output file
        #[arg(short, long, default_value = "demo.rsfb")]
        output: PathBuf,
        #[arg(long, default_value = "160")]
        width: u32,
        #[arg(long, default_value = "120")]
        height: u32,
        /// Worker threads, overrides the configuration
        #[arg(short, long)]
        threads: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_filter(cli.verbose)))
        .init();
    tracing::debug!(config = ?config, "configuration loaded");

    match cli.command {
        Commands::Render {
            script,
            threads,
            band_rows,
            print,
            describe,
        } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading script {}", script.display()))?;
            let si = raystage_interface::parse(&text)
                .with_context(|| format!("parsing script {}", script.display()))?;
            if print {
                print!("{}", si.print());
                return Ok(());
            }

            let mut options = config.render.clone();
            if threads.is_some() {
                options.threads = threads;
            }
            if let Some(rows) = band_rows {
                options.band_rows = rows;
            }
            let base_dir = script.parent().unwrap_or(Path::new("")).to_path_buf();
            let mut session = Session::new().with_base_dir(base_dir).with_options(options);
            run(&si, &mut session)?;

            println!("{}", SceneInspector::summary(session.scene()));
            for name in &describe {
                println!("{}", SceneInspector::describe(session.scene(), name)?);
            }
        }
        Commands::Inspect { file, json } => {
            let fb = raystage_persist::read(&file)
                .with_context(|| format!("reading frame buffer {}", file.display()))?;
            let report = FrameReport::of(&fb);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{}: {}x{} layout={}",
                    file.display(),
                    report.width,
                    report.height,
                    report.layout
                );
                for c in &report.channels {
                    println!(
                        "  {:<9} min={:.4} max={:.4} mean={:.4}",
                        c.channel, c.min, c.max, c.mean
                    );
                }
            }
        }
        Commands::Plugins => {
            let mut registry = PluginRegistry::new();
            let names: Vec<String> = registry.catalog().names().map(str::to_string).collect();
            for name in &names {
                registry.open(name)?;
            }
            for (plugin, types) in registry.loaded_plugins() {
                println!("{plugin}: {}", types.join(", "));
            }
        }
        Commands::Demo {
            output,
            width,
            height,
            threads,
        } => {
            let mut options = config.render.clone();
            if threads.is_some() {
                options.threads = threads;
            }
            let mut si = demo_scene(width, height);
            si.save_framebuffer("fb1", &output);
            let mut session = Session::new().with_options(options);
            run(&si, &mut session)?;
            println!("wrote {}", output.display());
        }
    }

    Ok(())
}

/// Dimensions and per-channel statistics of a frame buffer.
#[derive(Debug, Serialize)]
struct FrameReport {
    width: u32,
    height: u32,
    layout: String,
    channels: Vec<ChannelStats>,
}

#[derive(Debug, Serialize)]
struct ChannelStats {
    channel: &'static str,
    min: f32,
    max: f32,
    mean: f64,
}

impl FrameReport {
    fn of(fb: &FrameBuffer) -> Self {
        let n = fb.channel_count();
        let channels = fb
            .layout()
            .channels()
            .iter()
            .enumerate()
            .map(|(i, channel)| {
                let values = fb.samples().iter().skip(i).step_by(n);
                let (min, max, sum) = values.fold(
                    (f32::INFINITY, f32::NEG_INFINITY, 0.0f64),
                    |(lo, hi, sum), &v| (lo.min(v), hi.max(v), sum + v as f64),
                );
                ChannelStats {
                    channel: channel.name(),
                    min,
                    max,
                    mean: sum / fb.pixel_count().max(1) as f64,
                }
            })
            .collect();
        Self {
            width: fb.width(),
            height: fb.height(),
            layout: fb.layout().to_string(),
            channels,
        }
    }
}

fn run(si: &SceneInterface, session: &mut Session) -> anyhow::Result<()> {
    si.run(session)?;
    for report in session.reports() {
        println!("{report}");
    }
    Ok(())
}

/// Glass sphere and plastic cube on a reflective floor before a constant backdrop.
fn demo_scene(width: u32, height: u32) -> SceneInterface {
    let mut si = SceneInterface::new();
    si.open_plugin("ConstantShader")
        .open_plugin("PlasticShader")
        .open_plugin("GlassShader")
        .new_camera("cam1", "PerspectiveCamera")
        .set_property3("cam1", "translate", 0.0, 1.5, 7.0)
        .set_property3("cam1", "rotate", -10.0, 0.0, 0.0)
        .new_light("light1", "PointLight")
        .set_property3("light1", "position", 5.0, 12.0, 5.0)
        .new_shader("ball_shader", "GlassShader")
        .set_property3("ball_shader", "filter_color", 0.4, 0.75, 0.025)
        .new_shader("box_shader", "PlasticShader")
        .set_property3("box_shader", "diffuse", 0.75, 0.025, 0.4)
        .new_shader("floor_shader", "PlasticShader")
        .set_property1("floor_shader", "reflect", 0.2)
        .new_shader("wall_shader", "ConstantShader")
        .set_property3("wall_shader", "diffuse", 0.3, 0.4, 0.6)
        .new_mesh("sphere_mesh", "primitive:sphere")
        .new_mesh("cube_mesh", "primitive:cube")
        .new_mesh("plane_mesh", "primitive:plane")
        .new_mesh("quad_mesh", "primitive:quad")
        .new_object_instance("ball1", "sphere_mesh")
        .set_property3("ball1", "translate", 1.0, 1.0, 0.0)
        .assign_shader("ball1", "ball_shader")
        .new_object_instance("box1", "cube_mesh")
        .set_property3("box1", "translate", -1.5, 0.75, -1.5)
        .set_property3("box1", "scale", 0.75, 0.75, 0.75)
        .set_property3("box1", "rotate", 0.0, 30.0, 0.0)
        .assign_shader("box1", "box_shader")
        .new_object_instance("floor1", "plane_mesh")
        .set_property3("floor1", "scale", 10.0, 1.0, 10.0)
        .assign_shader("floor1", "floor_shader")
        .new_object_instance("wall1", "quad_mesh")
        .set_property3("wall1", "translate", 0.0, 0.0, -8.0)
        .set_property3("wall1", "scale", 20.0, 20.0, 1.0)
        .assign_shader("wall1", "wall_shader")
        .new_framebuffer("fb1", "rgbaz")
        .new_renderer("ren1")
        .assign_camera("ren1", "cam1")
        .assign_framebuffer("ren1", "fb1")
        .set_property2("ren1", "resolution", width as f32, height as f32)
        .set_property1("ren1", "max_refract_depth", 6.0)
        .render_scene("ren1");
    si
}
