// This file is an example runner for the `vision_pixels` library: it reads an
// image, segments it, and writes the superpixels out. All engine logic lives in
// the library.

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;
use vision_pixels::core_modules::utils::image_helper::{load_image, render_average_image, save_png};
use vision_pixels::{refine_mask, Config, SegmentationPipeline};

#[derive(Parser, Debug)]
#[command(name = "vision_pixels", version, about = "Superpixel segmentation by region growing")]
struct Cli {
    #[arg(long, value_name = "PATH", help = "Image to segment")]
    input: PathBuf,

    #[arg(long, value_name = "PATH", help = "Where to write the average-color superpixel PNG")]
    output: PathBuf,

    #[arg(long, value_name = "PATH", help = "Optional JSON settings file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Write the label -> [x, y] dump as JSON")]
    dump: Option<PathBuf>,

    #[arg(long, value_name = "PATH", requires = "refined", help = "Mask image; non-black pixels are selected")]
    mask: Option<PathBuf>,

    #[arg(long, value_name = "PATH", requires = "mask", help = "Where to write the refined mask PNG")]
    refined: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> vision_pixels::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let image = load_image(&cli.input)?;
    info!("loaded {} ({}x{})", cli.input.display(), image.width(), image.height());

    let report = SegmentationPipeline::new(config.segmentation).run(&image)?;
    println!(
        "{} superpixels ({} after labelling, {} small groups left)",
        report.label_count(),
        report.initial_label_count,
        report.small_groups_after
    );

    save_png(&cli.output, &render_average_image(&report.grid))?;

    if let Some(path) = &cli.dump {
        std::fs::write(path, report.grid.to_dump().to_json_string()?)?;
    }

    if let (Some(mask_path), Some(refined_path)) = (&cli.mask, &cli.refined) {
        let mask = load_image(mask_path)?;
        let refined = refine_mask(&report.grid, &image, &mask, &config.refine).await?;
        save_png(refined_path, &refined)?;
    }
    Ok(())
}
