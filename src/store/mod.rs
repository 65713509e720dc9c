//! Per-region building data accessor.
//!
//! A region cache is a gzip CSV written by the ETL. `Buildings` loads
//! one region, indexes it by building id, and inverts the compact
//! storage encodings on lookup: geocodes back to coordinates, footprint
//! strings back to vertex lists, category indices back to labels.

pub mod source;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geo::{LineString, Point};
use polars::frame::DataFrame;
use polars::prelude::{AnyValue, DataType, Field, Schema, SchemaRef, Series};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::io::read_csv_gz;
use crate::dictionary::{Dictionaries, Dictionary};
use crate::geocode::{self, GeocodeError, footprint};
use source::BlobSource;

/// Errors from opening a region cache or looking up a building.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cache file is absent locally and no blob source was given.
    #[error("cache file not found: {0}")]
    FileNotFound(PathBuf),

    /// The blob source could not produce the requested object.
    #[error("remote fetch failed for {key}")]
    RemoteFetchFailed {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No building with this id in the region.
    #[error("unknown building id {0:?}")]
    UnknownBuilding(String),

    /// A category index with no dictionary entry.
    #[error("no {category} label for code {code}")]
    UnknownCode { category: &'static str, code: u32 },

    /// The cache or a dictionary exists but cannot be interpreted.
    #[error("malformed cache: {0}")]
    Malformed(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error("i/o error")]
    Io(#[from] std::io::Error),
}

fn malformed(e: impl std::fmt::Display) -> StoreError {
    StoreError::Malformed(e.to_string())
}

/// Cache directory: `$OPENBUILDINGS_CACHE`, else `./data`.
pub fn default_cache_dir() -> PathBuf {
    std::env::var_os("OPENBUILDINGS_CACHE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// A (country, state, county) data partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub country: String,
    pub state: String,
    pub county: String,
}

impl Region {
    pub fn new(state: impl Into<String>, county: impl Into<String>) -> Self {
        Self::with_country("US", state, county)
    }

    pub fn with_country(
        country: impl Into<String>,
        state: impl Into<String>,
        county: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            state: state.into(),
            county: county.into(),
        }
    }

    /// Cache file name; county spaces become underscores.
    pub fn file_name(&self) -> String {
        format!("{}_{}.csv.gz", self.state, self.county.replace(' ', "_"))
    }

    /// Remote object key for the cache file.
    pub fn remote_key(&self) -> String {
        format!("{}/{}", self.country, self.file_name())
    }

    fn dictionary_key(&self, file: &str) -> String {
        format!("{}/{}", self.country, file)
    }
}

/// One building's stored fields, decoded from a cache row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    pub id: String,
    pub climate: String,
    pub year: i32,
    /// Centroid geocode; decode with [`Buildings::get_centroid`].
    pub centroid: String,
    /// Prefix-compressed footprint; decode with [`Buildings::get_footprint`].
    pub footprint: String,
    pub height: f64,
    pub ground_area: f64,
    pub code: u32,
    pub class: u32,
    pub mixed: bool,
    pub ty: u32,
    pub windows: f64,
    pub floors: u32,
    pub floor_area: f64,
}

/// Building data accessor for one region.
#[derive(Debug)]
pub struct Buildings {
    region: Region,
    df: DataFrame,
    index: HashMap<String, usize>,
    dicts: Dictionaries,
}

impl Buildings {
    /// Cache columns, also the valid names for [`Buildings::field`].
    pub const FIELDS: [&'static str; 14] = [
        "id",
        "climate",
        "year",
        "centroid",
        "footprint",
        "height",
        "ground_area",
        "code",
        "class",
        "mixed",
        "type",
        "windows",
        "floors",
        "floor_area",
    ];

    /// Open a region's cache from `cache_dir`. Anything absent locally
    /// (the cache file, the dictionaries) is fetched through `source`
    /// and installed; with no source, absence is [`StoreError::FileNotFound`].
    pub fn open(
        region: Region,
        cache_dir: &Path,
        source: Option<&dyn BlobSource>,
    ) -> Result<Self, StoreError> {
        let path = cache_dir.join(region.file_name());
        if !path.exists() {
            match source {
                Some(src) => source::install(src, &region.remote_key(), &path)?,
                None => return Err(StoreError::FileNotFound(path)),
            }
        }
        for file in Dictionaries::FILES {
            let dict_path = cache_dir.join(file);
            if !dict_path.exists() {
                match source {
                    Some(src) => {
                        source::install(src, &region.dictionary_key(file), &dict_path)?
                    }
                    None => return Err(StoreError::FileNotFound(dict_path)),
                }
            }
        }

        let df = read_csv_gz(&path, Some(cache_schema()))
            .map_err(|e| StoreError::Malformed(format!("{e:#}")))?;
        let dicts = Dictionaries::load(cache_dir)
            .map_err(|e| StoreError::Malformed(format!("{e:#}")))?;

        let mut index = HashMap::with_capacity(df.height());
        let ids = df
            .column("id")
            .map_err(malformed)?
            .as_materialized_series()
            .str()
            .map_err(malformed)?;
        for (row, id) in ids.into_iter().enumerate() {
            let id = id.ok_or_else(|| StoreError::Malformed(format!("null id at row {row}")))?;
            index.insert(id.to_string(), row);
        }

        Ok(Self {
            region,
            df,
            index,
            dicts,
        })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Building ids in this region, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// All stored fields of one building, decoded into a typed record.
    pub fn record(&self, id: &str) -> Result<BuildingRecord, StoreError> {
        let row = self.row(id)?;
        Ok(BuildingRecord {
            id: id.to_string(),
            climate: self.str_at("climate", row)?,
            year: self.int_at("year", row)? as i32,
            centroid: self.str_at("centroid", row)?,
            footprint: self.str_at("footprint", row)?,
            height: self.f64_at("height", row)?,
            ground_area: self.f64_at("ground_area", row)?,
            code: self.code_at("code", row)?,
            class: self.code_at("class", row)?,
            mixed: self.bool_at("mixed", row)?,
            ty: self.code_at("type", row)?,
            windows: self.f64_at("windows", row)?,
            floors: self.code_at("floors", row)?,
            floor_area: self.f64_at("floor_area", row)?,
        })
    }

    /// Latitude/longitude of a point inside the building.
    pub fn get_centroid(&self, id: &str) -> Result<Point<f64>, StoreError> {
        let row = self.row(id)?;
        let code = self.str_at("centroid", row)?;
        Ok(geocode::decode(&code)?.into())
    }

    /// Vertices of the building footprint, in stored order.
    pub fn get_footprint(&self, id: &str) -> Result<LineString<f64>, StoreError> {
        let row = self.row(id)?;
        let encoded = self.str_at("footprint", row)?;
        Ok(LineString::from(footprint::decode(&encoded)?))
    }

    /// Building class label, e.g. "IECC".
    pub fn get_class(&self, id: &str) -> Result<&str, StoreError> {
        self.label_at(id, "class", &self.dicts.class)
    }

    /// Construction code label, e.g. "DOE-Ref-Pre-1980".
    pub fn get_code(&self, id: &str) -> Result<&str, StoreError> {
        self.label_at(id, "code", &self.dicts.code)
    }

    /// Building type label, e.g. "SINGLE FAMILY RESIDENTIAL".
    pub fn get_type(&self, id: &str) -> Result<&str, StoreError> {
        self.label_at(id, "type", &self.dicts.ty)
    }

    /// Raw cell access by documented field name (see [`Buildings::FIELDS`]).
    pub fn field(&self, id: &str, name: &str) -> Result<AnyValue<'_>, StoreError> {
        let row = self.row(id)?;
        if !Self::FIELDS.contains(&name) {
            return Err(StoreError::Malformed(format!(
                "unknown field {name:?} (valid: {:?})",
                Self::FIELDS
            )));
        }
        self.series(name)?.get(row).map_err(malformed)
    }

    fn row(&self, id: &str) -> Result<usize, StoreError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| StoreError::UnknownBuilding(id.to_string()))
    }

    fn label_at<'a>(
        &self,
        id: &str,
        column: &'static str,
        dict: &'a Dictionary,
    ) -> Result<&'a str, StoreError> {
        let row = self.row(id)?;
        let code = self.code_at(column, row)?;
        dict.label(code).ok_or(StoreError::UnknownCode {
            category: column,
            code,
        })
    }

    fn series(&self, name: &str) -> Result<&Series, StoreError> {
        Ok(self
            .df
            .column(name)
            .map_err(malformed)?
            .as_materialized_series())
    }

    fn str_at(&self, name: &str, row: usize) -> Result<String, StoreError> {
        self.series(name)?
            .str()
            .map_err(malformed)?
            .get(row)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Malformed(format!("null {name} at row {row}")))
    }

    fn f64_at(&self, name: &str, row: usize) -> Result<f64, StoreError> {
        let series = self
            .series(name)?
            .cast(&DataType::Float64)
            .map_err(malformed)?;
        series
            .f64()
            .map_err(malformed)?
            .get(row)
            .ok_or_else(|| StoreError::Malformed(format!("null {name} at row {row}")))
    }

    fn int_at(&self, name: &str, row: usize) -> Result<i64, StoreError> {
        let series = self
            .series(name)?
            .cast(&DataType::Int64)
            .map_err(malformed)?;
        series
            .i64()
            .map_err(malformed)?
            .get(row)
            .ok_or_else(|| StoreError::Malformed(format!("null {name} at row {row}")))
    }

    fn code_at(&self, name: &str, row: usize) -> Result<u32, StoreError> {
        let value = self.int_at(name, row)?;
        u32::try_from(value)
            .map_err(|_| StoreError::Malformed(format!("negative {name} at row {row}")))
    }

    fn bool_at(&self, name: &str, row: usize) -> Result<bool, StoreError> {
        let series = self
            .series(name)?
            .cast(&DataType::Boolean)
            .map_err(malformed)?;
        series
            .bool()
            .map_err(malformed)?
            .get(row)
            .ok_or_else(|| StoreError::Malformed(format!("null {name} at row {row}")))
    }
}

/// Identifier-like columns must load as strings even when they happen
/// to look numeric.
fn cache_schema() -> SchemaRef {
    Arc::new(Schema::from_iter([
        Field::new("id".into(), DataType::String),
        Field::new("climate".into(), DataType::String),
        Field::new("centroid".into(), DataType::String),
        Field::new("footprint".into(), DataType::String),
    ]))
}

#[cfg(test)]
mod tests {
    use super::source::MemSource;
    use super::*;
    use std::io::Write;
    use std::path::Path;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use crate::etl;

    const KNOX_ID: &str = "87PG4V7P+M843-10-8-10-9";

    fn build_cache(dir: &Path) -> PathBuf {
        let raw = dir.join("ME_geodata.csv.gz");
        let file = std::fs::File::create(&raw).unwrap();
        let mut gz = GzEncoder::new(file, Compression::default());
        writeln!(gz, "AutoBEM-4 building geodata export v4.0").unwrap();
        writeln!(
            gz,
            "id,county,state,climate,year,centroid,footprint,height,ground_area,\
             code,class,mixed,type,windows,floors,floor_area"
        )
        .unwrap();
        writeln!(
            gz,
            "{KNOX_ID},Knox,ME,6A,1940.0,44.1141/-69.1142,\
             44.11418/-69.11418_44.11414/-69.11411_44.11408/-69.11417_44.11411/-69.11425,\
             6.1,650,DOE-Ref-Pre-1980,IECC,0,SINGLE FAMILY RESIDENTIAL,0.14,2,1301.1"
        )
        .unwrap();
        gz.finish().unwrap();

        let cache = dir.join("cache");
        let mut dicts = Dictionaries::default();
        etl::extract(&[raw], &cache, &mut dicts, false, 0).unwrap();
        cache
    }

    #[test]
    fn open_requires_cache_or_source() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Buildings::open(Region::new("ME", "Knox"), tmp.path(), None).unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound(_)));
    }

    #[test]
    fn lookups_decode_the_reference_row() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = build_cache(tmp.path());

        let buildings = Buildings::open(Region::new("ME", "Knox"), &cache, None).unwrap();
        assert_eq!(buildings.len(), 1);
        assert_eq!(buildings.ids().collect::<Vec<_>>(), vec![KNOX_ID]);

        let record = buildings.record(KNOX_ID).unwrap();
        assert_eq!(record.year, 1940);
        assert_eq!(record.climate, "6A");
        assert_eq!(record.centroid, "dryfgq8x6");
        assert_eq!(record.footprint, "dryfgq8xdzh,kx8,5he,34p");
        assert_eq!(record.height, 6.1);
        assert_eq!(record.ground_area, 58.5);
        assert!(!record.mixed);
        assert_eq!(record.windows, 0.14);
        assert_eq!(record.floors, 2);
        assert_eq!(record.floor_area, 117.1);

        assert_eq!(buildings.get_class(KNOX_ID).unwrap(), "IECC");
        assert_eq!(buildings.get_code(KNOX_ID).unwrap(), "DOE-Ref-Pre-1980");
        assert_eq!(
            buildings.get_type(KNOX_ID).unwrap(),
            "SINGLE FAMILY RESIDENTIAL"
        );

        let centroid = buildings.get_centroid(KNOX_ID).unwrap();
        assert!((centroid.y() - 44.1141).abs() < 5e-5);
        assert!((centroid.x() - -69.1142).abs() < 5e-5);

        let footprint = buildings.get_footprint(KNOX_ID).unwrap();
        assert_eq!(footprint.0.len(), 4);
        assert!((footprint.0[0].y - 44.11418).abs() < 5e-6);
        assert!((footprint.0[0].x - -69.11418).abs() < 5e-6);

        assert_eq!(buildings.field(KNOX_ID, "floors").unwrap().to_string(), "2");
        assert!(matches!(
            buildings.field(KNOX_ID, "df"),
            Err(StoreError::Malformed(_))
        ));
        assert!(matches!(
            buildings.record("no-such-building"),
            Err(StoreError::UnknownBuilding(_))
        ));
    }

    #[test]
    fn open_fetches_missing_files_from_source() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = build_cache(tmp.path());

        let mut remote = MemSource::new();
        remote.insert(
            "US/ME_Knox.csv.gz",
            std::fs::read(cache.join("ME_Knox.csv.gz")).unwrap(),
        );
        for file in Dictionaries::FILES {
            remote.insert(format!("US/{file}"), std::fs::read(cache.join(file)).unwrap());
        }

        let fresh = tmp.path().join("fresh");
        let buildings =
            Buildings::open(Region::new("ME", "Knox"), &fresh, Some(&remote)).unwrap();
        assert!(fresh.join("ME_Knox.csv.gz").exists());
        assert!(fresh.join("building_class.json").exists());
        assert_eq!(buildings.get_class(KNOX_ID).unwrap(), "IECC");

        // A source that cannot produce the object surfaces as a fetch
        // failure, not an empty store.
        let empty = MemSource::new();
        let err = Buildings::open(
            Region::new("ME", "York"),
            &tmp.path().join("other"),
            Some(&empty),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::RemoteFetchFailed { .. }));
    }

    #[test]
    fn dangling_category_index_is_unknown_code() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = build_cache(tmp.path());
        std::fs::write(cache.join("building_class.json"), r#"{"": 0}"#).unwrap();

        let buildings = Buildings::open(Region::new("ME", "Knox"), &cache, None).unwrap();
        assert!(matches!(
            buildings.get_class(KNOX_ID),
            Err(StoreError::UnknownCode {
                category: "class",
                code: 1
            })
        ));
    }

    #[test]
    fn region_names_follow_the_cache_layout() {
        let region = Region::new("NM", "Dona Ana");
        assert_eq!(region.file_name(), "NM_Dona_Ana.csv.gz");
        assert_eq!(region.remote_key(), "US/NM_Dona_Ana.csv.gz");
    }
}
