//! Extraction of raw building-model exports into per-county caches.
//!
//! One run reads whole-state exports, normalizes every row through the
//! converters in [`convert`], partitions by (state, county), and writes
//! one gzip CSV cache per county plus the category dictionaries. The
//! dictionaries are passed in explicitly and persisted at the end, so a
//! run is self-contained and reproducible for a fixed input order.

pub mod convert;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use polars::frame::DataFrame;
use polars::prelude::*;

use crate::common::fs::ensure_dir_exists;
use crate::common::io::{read_raw_export, write_csv_gz};
use crate::dictionary::Dictionaries;
use crate::store::Region;

/// Raw export column count; order is fixed by the upstream tooling:
/// id, county, state, climate, year, centroid, footprint, height,
/// ground_area, code, class, mixed, type, windows, floors, floor_area.
const RAW_COLUMNS: usize = 16;

/// One region's accumulated cache columns.
#[derive(Default)]
struct RegionRows {
    id: Vec<String>,
    climate: Vec<String>,
    year: Vec<i32>,
    centroid: Vec<String>,
    footprint: Vec<String>,
    height: Vec<f64>,
    ground_area: Vec<f64>,
    code: Vec<u32>,
    class: Vec<u32>,
    mixed: Vec<bool>,
    ty: Vec<u32>,
    windows: Vec<f64>,
    floors: Vec<u32>,
    floor_area: Vec<f64>,
}

impl RegionRows {
    fn into_frame(self) -> Result<DataFrame> {
        df!(
            "id" => self.id,
            "climate" => self.climate,
            "year" => self.year,
            "centroid" => self.centroid,
            "footprint" => self.footprint,
            "height" => self.height,
            "ground_area" => self.ground_area,
            "code" => self.code,
            "class" => self.class,
            "mixed" => self.mixed,
            "type" => self.ty,
            "windows" => self.windows,
            "floors" => self.floors,
            "floor_area" => self.floor_area,
        )
        .context("[etl] failed to assemble region frame")
    }
}

/// Run the ETL over `inputs`, writing region caches and dictionaries
/// into `out_dir`. Returns the written cache paths in sorted
/// (state, county) order.
pub fn extract(
    inputs: &[PathBuf],
    out_dir: &Path,
    dicts: &mut Dictionaries,
    force: bool,
    verbose: u8,
) -> Result<Vec<PathBuf>> {
    ensure_dir_exists(out_dir)?;

    let mut regions: BTreeMap<(String, String), RegionRows> = BTreeMap::new();
    for input in inputs {
        if verbose > 0 {
            eprintln!("[extract] reading {}", input.display());
        }
        ingest_file(input, &mut regions, dicts)?;
    }

    let mut written = Vec::with_capacity(regions.len());
    for ((state, county), rows) in regions {
        let path = out_dir.join(Region::new(&state, &county).file_name());
        if path.exists() && !force {
            bail!(
                "refusing to overwrite {} (use --force)",
                path.display()
            );
        }
        let mut df = rows.into_frame()?;
        if verbose > 0 {
            eprintln!("[write] {} ({} buildings)", path.display(), df.height());
        }
        write_csv_gz(&mut df, &path)?;
        written.push(path);
    }

    dicts.save(out_dir)?;
    Ok(written)
}

fn ingest_file(
    path: &Path,
    regions: &mut BTreeMap<(String, String), RegionRows>,
    dicts: &mut Dictionaries,
) -> Result<()> {
    let df = read_raw_export(path)?;
    ensure!(
        df.width() >= RAW_COLUMNS,
        "[etl] expected {} columns in {}, found {}",
        RAW_COLUMNS,
        path.display(),
        df.width()
    );

    let columns = df.get_columns();
    let mut text = Vec::with_capacity(RAW_COLUMNS);
    for column in columns.iter().take(RAW_COLUMNS) {
        text.push(
            column
                .as_materialized_series()
                .str()
                .map_err(|e| anyhow::anyhow!("[etl] non-string column in {}: {e}", path.display()))?,
        );
    }

    for row in 0..df.height() {
        let cell = |i: usize| text[i].get(row).unwrap_or("");
        let state = cell(2).to_string();
        let county = cell(1).to_string();
        let at = || format!("[etl] row {} of {}", row, path.display());

        let rows = regions.entry((state, county)).or_default();
        rows.id.push(cell(0).to_string());
        rows.climate.push(cell(3).to_string());
        rows.year.push(convert::to_year(cell(4)));
        rows.centroid
            .push(convert::to_centroid(cell(5)).with_context(at)?);
        rows.footprint
            .push(convert::to_footprint(cell(6)).with_context(at)?);
        rows.height.push(convert::to_height(cell(7)).with_context(at)?);
        rows.ground_area
            .push(convert::to_area(cell(8)).with_context(at)?);
        rows.code.push(dicts.code.intern(cell(9)));
        rows.class.push(dicts.class.intern(cell(10)));
        rows.mixed.push(convert::is_mixed(cell(11)));
        rows.ty.push(dicts.ty.intern(cell(12)));
        rows.windows.push(convert::to_windows(cell(13)));
        rows.floors.push(convert::to_floors(cell(14)));
        rows.floor_area
            .push(convert::to_area(cell(15)).with_context(at)?);
    }
    Ok(())
}
