use crate::io::catalog::CatalogClient;
use crate::types::{Footprint, PipelineError, PipelineResult};
use regex::Regex;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Band files of an extracted Sentinel-2 L2A product
#[derive(Debug, Clone, PartialEq)]
pub struct OpticalBandPaths {
    /// B04, 10 m
    pub red: PathBuf,
    /// B08, 10 m
    pub nir: PathBuf,
    /// Scene classification layer, 20 m
    pub scl: PathBuf,
}

/// Downloads product archives through an authenticated catalogue session
pub struct ProductFetcher<'a> {
    catalog: &'a CatalogClient,
    data_dir: PathBuf,
}

impl<'a> ProductFetcher<'a> {
    pub fn new<P: AsRef<Path>>(catalog: &'a CatalogClient, data_dir: P) -> Self {
        Self {
            catalog,
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Stream the product archive to `<data_dir>/<file_name>`
    pub fn download(&self, product: &Footprint, file_name: &str) -> PipelineResult<PathBuf> {
        let token = self.catalog.access_token().ok_or_else(|| {
            PipelineError::Catalog("download requires an authenticated session".to_string())
        })?;
        std::fs::create_dir_all(&self.data_dir)?;

        let url = format!(
            "{}({})/$value",
            self.catalog.config().download_url,
            product.product_id
        );
        log::info!("Downloading {} ({} bytes) from {}", product.name, product.content_length, url);

        let mut response = self.catalog.http_client().get(&url).bearer_auth(token).send()?;
        if !response.status().is_success() {
            return Err(PipelineError::Catalog(format!(
                "HTTP {} {}: {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or(""),
                url
            )));
        }

        let output_path = self.data_dir.join(file_name);
        let mut file = File::create(&output_path)?;
        let written = copy_with_progress(&mut response, &mut file, file_name, product.content_length)?;

        if product.content_length > 0 && written != product.content_length {
            log::warn!(
                "{}: expected {} bytes, received {}",
                file_name,
                product.content_length,
                written
            );
        }

        log::info!("Download complete: {}", output_path.display());
        Ok(output_path)
    }
}

const CHUNK_SIZE: usize = 1024 * 1024;
const PROGRESS_EVERY: u64 = 50 * 1024 * 1024;

/// Chunked copy that logs progress every `PROGRESS_EVERY` bytes
pub fn copy_with_progress<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    label: &str,
    expected: u64,
) -> PipelineResult<u64> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    let mut next_report = PROGRESS_EVERY;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        writer.write_all(&buffer[..n])?;
        written += n as u64;

        if written >= next_report {
            if expected > 0 {
                log::debug!(
                    "{}: {} / {} MB ({:.1}%)",
                    label,
                    written / (1024 * 1024),
                    expected / (1024 * 1024),
                    written as f64 / expected as f64 * 100.0
                );
            } else {
                log::debug!("{}: {} MB", label, written / (1024 * 1024));
            }
            next_report += PROGRESS_EVERY;
        }
    }

    writer.flush()?;
    log::debug!("{}: downloaded {} bytes", label, written);
    Ok(written)
}

/// Unpack a product ZIP into `output_dir`
pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(zip_path: P, output_dir: Q) -> PipelineResult<()> {
    log::info!("Extracting {} to {}", zip_path.as_ref().display(), output_dir.as_ref().display());
    std::fs::create_dir_all(output_dir.as_ref())?;

    let file = File::open(zip_path.as_ref())?;
    let mut archive = ZipArchive::new(file)?;
    archive.extract(output_dir.as_ref())?;

    log::info!("Extracted {} entries", archive.len());
    Ok(())
}

/// First `*.SAFE` directory under `root` whose name starts with `mission_prefix`
pub fn find_safe_dir<P: AsRef<Path>>(root: P, mission_prefix: &str) -> PipelineResult<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(root.as_ref())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(mission_prefix) && n.ends_with(".SAFE"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        PipelineError::Processing(format!(
            "no {}*.SAFE directory in {}",
            mission_prefix,
            root.as_ref().display()
        ))
    })
}

/// Measurement GeoTIFF for one polarization (e.g. "vh") of a Sentinel-1 SAFE
pub fn locate_radar_band<P: AsRef<Path>>(safe_dir: P, polarization: &str) -> PipelineResult<PathBuf> {
    let pattern = format!(r"(?i)(^|/)measurement/[^/]*-{}-[^/]*\.tiff?$", regex::escape(polarization));
    locate_one(safe_dir.as_ref(), &pattern, &format!("{} measurement", polarization))
}

/// Red, NIR and SCL rasters of a Sentinel-2 L2A SAFE
pub fn locate_optical_bands<P: AsRef<Path>>(safe_dir: P) -> PipelineResult<OpticalBandPaths> {
    let dir = safe_dir.as_ref();
    Ok(OpticalBandPaths {
        red: locate_one(dir, r"GRANULE/[^/]+/IMG_DATA/R10m/[^/]*B04_10m\.jp2$", "B04 10m")?,
        nir: locate_one(dir, r"GRANULE/[^/]+/IMG_DATA/R10m/[^/]*B08_10m\.jp2$", "B08 10m")?,
        scl: locate_one(dir, r"GRANULE/[^/]+/IMG_DATA/R20m/[^/]*SCL_20m\.jp2$", "SCL 20m")?,
    })
}

fn locate_one(root: &Path, pattern: &str, what: &str) -> PipelineResult<PathBuf> {
    let re = Regex::new(pattern)
        .map_err(|e| PipelineError::InvalidParameter(format!("bad band pattern: {}", e)))?;

    let mut matches: Vec<PathBuf> = list_files(root)?
        .into_iter()
        .filter(|path| {
            path.strip_prefix(root)
                .ok()
                .map(|rel| {
                    let rel = rel.to_string_lossy().replace('\\', "/");
                    re.is_match(&rel)
                })
                .unwrap_or(false)
        })
        .collect();
    matches.sort();

    let found = matches.into_iter().next().ok_or_else(|| {
        PipelineError::Processing(format!("{} band not found under {}", what, root.display()))
    })?;
    log::info!("{} path: {}", what, found.display());
    Ok(found)
}

fn list_files(root: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    Ok(files)
}
