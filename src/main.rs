use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sarveg::core::overlap::OverlapSelector;
use sarveg::io::catalog::{parse_products, CatalogClient};
use sarveg::io::fetcher::{
    extract_archive, find_safe_dir, locate_optical_bands, locate_radar_band, OpticalBandPaths,
    ProductFetcher,
};
use sarveg::pipeline::{PipelineReport, PipelineRunner};
use sarveg::{Footprint, GdalRasterStore, PipelineConfig, SelectedPair, Sensor};
use std::path::{Path, PathBuf};

/// Sentinel-1 / Sentinel-2 pair selection and processing
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON configuration file; defaults are used for missing fields
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output directory, overrides the configuration
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick the best pair from saved catalogue responses
    Select {
        /// OData result page with radar products
        #[arg(long)]
        radar: PathBuf,
        /// OData result page with optical products
        #[arg(long)]
        optical: PathBuf,
    },
    /// Query the catalogue for both sensors and pick the best pair
    Search {
        #[arg(long, env = "CDSE_USERNAME")]
        username: Option<String>,
        #[arg(long, env = "CDSE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Process already extracted bands
    Process {
        /// Radar VH measurement raster
        #[arg(long)]
        radar_band: PathBuf,
        /// Optical red band (B04, 10 m)
        #[arg(long)]
        red: PathBuf,
        /// Optical near-infrared band (B08, 10 m)
        #[arg(long)]
        nir: PathBuf,
        /// Scene classification layer (20 m)
        #[arg(long)]
        scl: PathBuf,
    },
    /// Search, download, extract and process in one go
    Run {
        #[arg(long, env = "CDSE_USERNAME")]
        username: String,
        #[arg(long, env = "CDSE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Where archives are downloaded and extracted
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        /// Radar polarization to process
        #[arg(long, default_value = "vh")]
        polarization: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(output) = &args.output {
        config.output.directory = output.clone();
    }
    config.validate()?;

    match args.command {
        Command::Select { radar, optical } => {
            let radar = read_footprints(&radar, &config.catalog.radar_product_type)?;
            let optical = read_footprints(&optical, &config.catalog.optical_product_type)?;
            print_pair(&OverlapSelector::select_best_pair(&radar, &optical)?);
        }
        Command::Search { username, password } => {
            let mut catalog = CatalogClient::new(config.catalog.clone())?;
            if let (Some(user), Some(pass)) = (username, password) {
                catalog.authenticate(&user, &pass)?;
            }
            print_pair(&search_pair(&catalog)?);
        }
        Command::Process { radar_band, red, nir, scl } => {
            let bands = OpticalBandPaths { red, nir, scl };
            finish(process(&config, &radar_band, &bands))?;
        }
        Command::Run { username, password, data_dir, polarization } => {
            let mut catalog = CatalogClient::new(config.catalog.clone())?;
            catalog.authenticate(&username, &password)?;
            let pair = search_pair(&catalog)?;
            print_pair(&pair);

            let fetcher = ProductFetcher::new(&catalog, &data_dir);
            let radar_zip = fetcher.download(&pair.radar, "s1_product.zip")?;
            let optical_zip = fetcher.download(&pair.optical, "s2_product.zip")?;

            let radar_root = data_dir.join("s1_extracted");
            let optical_root = data_dir.join("s2_extracted");
            extract_archive(&radar_zip, &radar_root)?;
            extract_archive(&optical_zip, &optical_root)?;

            let radar_band = locate_radar_band(find_safe_dir(&radar_root, "S1")?, &polarization)?;
            let bands = locate_optical_bands(find_safe_dir(&optical_root, "S2")?)?;
            finish(process(&config, &radar_band, &bands))?;
        }
    }

    Ok(())
}

fn read_footprints(path: &Path, product_type: &str) -> Result<Vec<Footprint>> {
    let body = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let (footprints, _) = parse_products(&body, product_type)?;
    Ok(footprints)
}

fn search_pair(catalog: &CatalogClient) -> Result<SelectedPair> {
    let radar = catalog.search_sensor(Sensor::Radar)?;
    let optical = catalog.search_sensor(Sensor::Optical)?;
    Ok(OverlapSelector::select_best_pair(&radar, &optical)?)
}

fn print_pair(pair: &SelectedPair) {
    println!("Best pair ({:.2}% overlap)", pair.overlap_percent);
    println!("  S1: {} ({})", pair.radar.name, pair.radar.acquisition_time.format("%Y-%m-%d %H:%M:%S"));
    println!("  S2: {} ({})", pair.optical.name, pair.optical.acquisition_time.format("%Y-%m-%d %H:%M:%S"));
}

fn process(config: &PipelineConfig, radar_band: &Path, bands: &OpticalBandPaths) -> PipelineReport {
    let store = GdalRasterStore::new();
    PipelineRunner::new(&store, config).run_concurrent(radar_band, bands)
}

fn finish(report: PipelineReport) -> Result<()> {
    if let Ok(radar) = &report.radar {
        println!("Radar product: {}", radar.filtered_path.display());
        match &radar.texture {
            Some(props) => println!("  GLCM contrast: {:.4}", props.contrast),
            None => println!("  GLCM contrast: unavailable"),
        }
    }
    if let Ok(optical) = &report.optical {
        println!("NDVI: {}", optical.ndvi_path.display());
        println!(
            "Cloud-masked NDVI: {} ({:.1}% masked)",
            optical.ndvi_masked_path.display(),
            optical.masked_fraction * 100.0
        );
    }

    let failures = report.failures();
    if !failures.is_empty() {
        let names: Vec<String> = failures.iter().map(|(s, e)| format!("{}: {}", s, e)).collect();
        bail!("pipeline failed ({})", names.join("; "));
    }
    Ok(())
}
