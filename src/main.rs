#![cfg(not(tarpaulin_include))]

use rand::SeedableRng;
use rand::rngs::StdRng;
use scatter3d::engine::{EngineState, SceneEngine, SceneInput};
use scatter3d::export::{SNAPSHOT_FILENAME, save_snapshot};
use scatter3d::loader::load_dataset;
use scatter3d::options::SceneOptions;
use scatter3d::projector::AxisSelection;
use scatter3d::renderer::SoftwareContext;
use scatter3d::shape::Shape;
use scatter3d::surface::DisplaySurface;
use std::env;
use std::error::Error;
use std::path::PathBuf;

struct CliArgs {
    input: PathBuf,
    axes: Option<AxisSelection>,
    shape: Shape,
    width: u32,
    frames: u32,
    seed: Option<u64>,
    config: Option<PathBuf>,
    out: PathBuf,
}

const USAGE: &str = "Usage: scatter3d <file.csv|file.json> [x y z] [--shape S] [--width W] \
                     [--frames N] [--seed N] [--config options.json] [--out path]";

fn parse_args(args: &[String]) -> Result<CliArgs, Box<dyn Error>> {
    let mut positional = Vec::new();
    let mut cli = CliArgs {
        input: PathBuf::new(),
        axes: None,
        shape: Shape::default(),
        width: 800,
        frames: 60,
        seed: None,
        config: None,
        out: PathBuf::from(SNAPSHOT_FILENAME),
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--shape" => cli.shape = value("--shape")?.parse()?,
            "--width" => cli.width = value("--width")?.parse()?,
            "--frames" => cli.frames = value("--frames")?.parse()?,
            "--seed" => cli.seed = Some(value("--seed")?.parse()?),
            "--config" => cli.config = Some(PathBuf::from(value("--config")?)),
            "--out" => cli.out = PathBuf::from(value("--out")?),
            "-h" | "--help" => return Err(USAGE.into()),
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown option {}\n{}", flag, USAGE).into());
            }
            _ => positional.push(arg.clone()),
        }
    }

    match positional.as_slice() {
        [input] => cli.input = PathBuf::from(input),
        [input, x, y, z] => {
            cli.input = PathBuf::from(input);
            cli.axes = Some(AxisSelection::new(x.as_str(), y.as_str(), z.as_str()));
        }
        _ => return Err(USAGE.into()),
    }
    Ok(cli)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args)?;

    let dataset = load_dataset(&cli.input)?;
    let axes = match cli.axes {
        Some(axes) => axes,
        None => AxisSelection::from_header(&dataset)
            .ok_or("Dataset needs at least three columns to plot")?,
    };
    let options = match &cli.config {
        Some(path) => SceneOptions::from_json_file(path)?,
        None => SceneOptions::default(),
    };

    let mut engine = SceneEngine::new(Box::new(SoftwareContext::new()), options);
    if let Some(seed) = cli.seed {
        engine = engine.with_rng(StdRng::seed_from_u64(seed));
    }

    let surface = DisplaySurface::new(cli.width);
    let input = SceneInput::new(dataset, axes.clone(), cli.shape);
    engine.mount(input, Some(&surface))?;

    if engine.state() != EngineState::Animating {
        return Err(format!(
            "Nothing to render for axes {}/{}/{}: check the column names",
            axes.x, axes.y, axes.z
        )
        .into());
    }

    for _ in 0..cli.frames {
        engine.tick()?;
    }

    let png = engine
        .handle()
        .capture_image()
        .ok_or("Snapshot could not be captured")?;
    let path = save_snapshot(&png, &cli.out)?;

    println!(
        "Rendered {} points and {} edges as {} to {}",
        engine.point_count().unwrap_or(0),
        engine.edge_count().unwrap_or(0),
        cli.shape,
        path.display()
    );

    engine.dispose();
    Ok(())
}
