//! `tilecast-render`: renders one image through the engine and writes a PPM.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use tilecast::{render_to_canvas, PpmFormat};
use tilecast_core::{Rgb8, SceneConfig, SceneVariant, SkyVariant};
use tilecast_engine::{EngineConfig, EngineHandle};

#[derive(Clone, Debug, Parser)]
#[command(name = "tilecast-render", about = "Render a scene tile by tile and write it as PPM")]
struct Args {
    /// Image width in pixels.
    #[arg(long, default_value_t = 320)]
    width: u32,

    /// Image height in pixels.
    #[arg(long, default_value_t = 180)]
    height: u32,

    /// Sky preset: day, dusk, hues, night, or its index.
    #[arg(long, default_value = "day", value_parser = parse_sky)]
    sky: SkyVariant,

    /// Scene preset: ring, pillars, lone, or its index.
    #[arg(long, default_value = "ring", value_parser = parse_scene)]
    scene: SceneVariant,

    /// First hue, as #rrggbb.
    #[arg(long, default_value = "#80cc80", value_parser = parse_hue)]
    hue1: Rgb8,

    /// Second hue, as #rrggbb.
    #[arg(long, default_value = "#808080", value_parser = parse_hue)]
    hue2: Rgb8,

    /// Engine configuration file (TOML).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output file; standard output if absent.
    #[arg(long, short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write binary P6 instead of text P3.
    #[arg(long)]
    binary: bool,

    /// Additional logging to stderr.
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn parse_sky(text: &str) -> Result<SkyVariant, String> {
    if let Some(sky) = SkyVariant::ALL.into_iter().find(|s| s.name().eq_ignore_ascii_case(text)) {
        return Ok(sky);
    }
    let index: u8 = text.parse().map_err(|_| format!("unknown sky {text:?}"))?;
    SkyVariant::try_from(index).map_err(|e| e.to_string())
}

fn parse_scene(text: &str) -> Result<SceneVariant, String> {
    if let Some(scene) = SceneVariant::ALL.into_iter().find(|s| s.name().eq_ignore_ascii_case(text)) {
        return Ok(scene);
    }
    let index: u8 = text.parse().map_err(|_| format!("unknown scene {text:?}"))?;
    SceneVariant::try_from(index).map_err(|e| e.to_string())
}

fn parse_hue(text: &str) -> Result<Rgb8, String> {
    Rgb8::from_hex(text).map_err(|e| e.to_string())
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    use simplelog::LevelFilter::{Debug, Info, Off};
    simplelog::TermLogger::init(
        if args.verbose { Debug } else { Info },
        simplelog::ConfigBuilder::new()
            .set_target_level(Off)
            .set_location_level(Off)
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let engine_config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let scene = SceneConfig::new(args.width, args.height, args.sky, args.scene, args.hue1, args.hue2)?;

    let (engine, mut host) = EngineHandle::spawn(engine_config)?;
    let mut next_report = 10;
    let (canvas, report) = render_to_canvas(&mut host, scene, |painted, total| {
        let percent = painted * 100 / total;
        if percent >= next_report {
            tracing::info!("Rendering... {percent}%");
            next_report = (percent / 10 + 1) * 10;
        }
    })?;
    let stats = engine.shutdown();
    tracing::debug!("Engine stats: {stats:?}");

    let format = if args.binary { PpmFormat::Binary } else { PpmFormat::Text };
    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            canvas.write_ppm(BufWriter::new(file), format)?;
            tracing::info!("Wrote {} ({} tiles)", path.display(), report.tiles);
        }
        None => canvas.write_ppm(BufWriter::new(io::stdout().lock()), format)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_preset_names_and_indices() {
        assert_eq!(parse_sky("Dusk"), Ok(SkyVariant::Dusk));
        assert_eq!(parse_sky("2"), Ok(SkyVariant::Hues));
        assert!(parse_sky("4").is_err());
        assert!(parse_sky("noon").is_err());
        assert_eq!(parse_scene("lone"), Ok(SceneVariant::Lone));
        assert_eq!(parse_scene("1"), Ok(SceneVariant::Pillars));
    }

    #[test]
    fn test_full_command_line() {
        let args = Args::try_parse_from([
            "tilecast-render",
            "--width", "128",
            "--height", "128",
            "--sky", "hues",
            "--hue1", "#ff0000",
            "--hue2", "0000ff",
            "--binary",
        ])
        .unwrap();
        assert_eq!(args.sky, SkyVariant::Hues);
        assert_eq!(args.scene, SceneVariant::Ring);
        assert_eq!(args.hue1, Rgb8::new(255, 0, 0));
        assert_eq!(args.hue2, Rgb8::new(0, 0, 255));
        assert!(args.binary);
        assert!(Args::try_parse_from(["tilecast-render", "--hue1", "red"]).is_err());
    }
}
