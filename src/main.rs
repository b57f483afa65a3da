use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{ Context, Result };
use clap::Parser;
use indicatif::{ ProgressBar, ProgressStyle };
use log::info;

use scene_tracer::parser::Parser as SceneParser;
use scene_tracer::config::RenderConfig;
use scene_tracer::parallel::{ render, RenderContext };
use scene_tracer::consts::DEFAULT_OUT_FILE;

/// Renders a scene description file to an image.
#[derive(Parser, Debug)]
#[clap(name = "scene-tracer", version, about)]
struct Args {
    /// Scene description file
    scene: PathBuf,

    /// Output resolution, overriding the config file and the scene camera
    #[clap(long, number_of_values = 2, value_names = &["W", "H"])]
    res: Option<Vec<usize>>,

    /// Output image; `.ppm` is written directly, other extensions are
    /// encoded by format
    #[clap(long, default_value = DEFAULT_OUT_FILE)]
    out: PathBuf,

    /// Only log warnings and hide the progress bar
    #[clap(long)]
    quiet: bool,

    /// JSON render settings
    #[clap(long)]
    config: Option<PathBuf>,

    /// Maximum reflection/refraction depth
    #[clap(long)]
    depth: Option<usize>,

    /// Number of render threads
    #[clap(long)]
    threads: Option<usize>,
}

/// Accepts the single-dash spellings `-res`, `-out` and `-quiet`.
fn normalize_legacy_flags<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            let legacy = matches!(arg.to_str(), Some("-res") | Some("-out") | Some("-quiet"));
            if legacy {
                let mut long = OsString::from("-");
                long.push(&arg);
                long
            } else {
                arg
            }
        })
        .collect()
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };

    if let Some(res) = &args.res {
        config.resolution = Some([res[0], res[1]]);
    }
    if let Some(depth) = args.depth {
        config.max_depth = depth;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    config.validate()?;

    let mut scene = SceneParser::parse_file(&args.scene)
        .with_context(|| format!("failed to load scene {}", args.scene.display()))?;
    scene.setup();

    let (_, height) = config.resolution_for(&scene.camera);
    let bar = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(height as u64)
    };
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} rows")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let ctx = {
        let bar = bar.clone();
        RenderContext::new().on_progress(move |done, _| bar.set_position(done as u64))
    };

    let start = Instant::now();
    let canvas = render(Arc::new(scene), &config, &ctx).context("render failed")?;
    bar.finish_and_clear();
    info!("rendered in {:.2?}", start.elapsed());

    canvas.save(&args.out, config.gamma)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    Ok(())
}

fn main() {
    let args = Args::parse_from(normalize_legacy_flags(std::env::args_os()));

    let default_filter = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

#[test]
fn legacy_flags_become_long_flags() {
    let args = ["scene-tracer", "in.scn", "-res", "64", "32", "-out", "a.png", "-quiet"]
        .iter()
        .map(OsString::from);

    let parsed = Args::parse_from(normalize_legacy_flags(args));

    assert_eq!(parsed.scene, PathBuf::from("in.scn"));
    assert_eq!(parsed.res, Some(vec![64, 32]));
    assert_eq!(parsed.out, PathBuf::from("a.png"));
    assert!(parsed.quiet);
}

#[test]
fn defaults_without_flags() {
    let parsed = Args::parse_from(["scene-tracer", "in.scn"].iter().map(OsString::from));

    assert_eq!(parsed.out, PathBuf::from(DEFAULT_OUT_FILE));
    assert_eq!(parsed.res, None);
    assert!(!parsed.quiet);
    assert_eq!(parsed.depth, None);
}
