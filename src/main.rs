//! radar-cs command line
//!
//! Preprocesses a zipped Sentinel-1 product with the external engine,
//! reprojects the GeoTIFF and renders quick-look PNGs.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use radar_cs::core::{
    build_graph, preprocess_slc, reproject_geotiff, reprojected_path, run_pipeline, view_geotiff,
    DryRunEngine, GptEngine,
};
use radar_cs::io::slc_reader::select_source_bands;
use radar_cs::{PipelineConfig, SlcReader};

#[derive(Parser, Debug)]
#[command(name = "radar-cs")]
#[command(about = "Sentinel-1 preprocessing, reprojection and quick-look rendering")]
struct Cli {
    /// JSON configuration file; unspecified values use the standard chain defaults
    #[arg(short, long, global = true, env = "RADAR_CS_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the engine's gpt executable
    #[arg(long, global = true, env = "SNAP_GPT")]
    gpt: Option<PathBuf>,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Preprocess, reproject and render quick-looks
    Run {
        #[command(flatten)]
        io: ProcessArgs,

        /// Target CRS for reprojection
        #[arg(long)]
        crs: Option<String>,

        /// Directory for the quick-look PNGs
        #[arg(long, default_value = "outputs/")]
        plot_dir: PathBuf,
    },
    /// Run only the engine preprocessing chain
    Preprocess {
        #[command(flatten)]
        io: ProcessArgs,
    },
    /// Write the processing graph without running it
    Graph {
        #[command(flatten)]
        io: ProcessArgs,

        /// Where to write the graph XML; printed to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Reproject a GeoTIFF with GDAL
    Reproject {
        input: PathBuf,

        /// Output file; defaults to `<input stem>_<crs>.tif`
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        crs: Option<String>,
    },
    /// Render grayscale and RGB quick-looks of a VV/VH GeoTIFF
    View {
        input: PathBuf,

        #[arg(long, default_value = "outputs/")]
        plot_dir: PathBuf,
    },
    /// Show product identification and engine band names of an archive
    Info { input: PathBuf },
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Zipped Sentinel-1 SAFE product
    input: PathBuf,

    /// Output base path; `.dim` and `.tif` are appended
    #[arg(short, long, default_value = "outputs/preprocessed_slc")]
    output: PathBuf,

    /// GeoJSON file with the area of interest polygon
    #[arg(long, default_value = "AOI_Rubicon_sent1.geojson")]
    aoi: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if cli.gpt.is_some() {
        config.engine.gpt_path = cli.gpt.clone();
    }

    match cli.command {
        Command::Run { io, crs, plot_dir } => {
            if let Some(crs) = crs {
                config.target_crs = crs;
            }
            let engine = GptEngine::new(config.engine.clone())?;
            let outputs = run_pipeline(&io.input, &io.output, &io.aoi, &plot_dir, &config, &engine)
                .with_context(|| format!("processing {}", io.input.display()))?;
            println!("Reprojected: {}", outputs.reprojected.display());
            println!("VH plot:     {}", outputs.quick_looks.vh.display());
            println!("VV plot:     {}", outputs.quick_looks.vv.display());
            println!("RGB plot:    {}", outputs.quick_looks.rgb.display());
        }
        Command::Preprocess { io } => {
            let engine = GptEngine::new(config.engine.clone())?;
            let outputs = preprocess_slc(&io.input, &io.output, &io.aoi, &config, &engine)
                .with_context(|| format!("preprocessing {}", io.input.display()))?;
            for path in outputs.dimap.iter().chain(outputs.geotiff.iter()) {
                println!("{}", path.display());
            }
        }
        Command::Graph { io, out } => match out {
            Some(out) => {
                preprocess_slc(&io.input, &io.output, &io.aoi, &config, &DryRunEngine::new(&out))?;
                println!("{}", out.display());
            }
            None => {
                let graph = build_graph(&io.input, &io.output, &io.aoi, &config)?;
                println!("{}", graph.to_xml()?);
            }
        },
        Command::Reproject { input, output, crs } => {
            let crs = crs.unwrap_or(config.target_crs.clone());
            let output = output.unwrap_or_else(|| reprojected_path(input.with_extension(""), &crs));
            let raster = reproject_geotiff(&input, &output, &crs, &config.resampling)?;
            println!(
                "{} ({}x{}, {} bands)",
                raster.path.display(),
                raster.size.0,
                raster.size.1,
                raster.band_count
            );
        }
        Command::View { input, plot_dir } => {
            let looks = view_geotiff(&input, &plot_dir, &config.stretch)?;
            println!("{}\n{}\n{}", looks.vh.display(), looks.vv.display(), looks.rgb.display());
        }
        Command::Info { input } => {
            let mut reader = SlcReader::new(&input)?;
            let info = reader.product_info()?;
            let bands = reader.band_names()?;
            println!("Product:        {}", info.product_id);
            println!("Mission:        {}", info.mission);
            println!("Mode:           {:?}", info.acquisition_mode);
            println!("Type:           {:?}", info.product_type);
            println!("Polarizations:  {:?}", info.polarizations);
            println!("Start:          {}", info.start_time);
            println!("Stop:           {}", info.stop_time);
            println!("Absolute orbit: {}", info.absolute_orbit);
            println!("Bands:          {}", bands.join(","));
            println!(
                "Calibration:    {}",
                select_source_bands(&bands, &config.polarizations).join(",")
            );
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}
