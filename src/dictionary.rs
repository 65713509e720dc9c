//! Categorical dictionaries: first-seen label-to-code assignment.
//!
//! Raw exports repeat a handful of class/type/construction-code labels
//! millions of times; the caches store a small integer instead. Codes
//! are assigned in first-seen order during a single ingestion run, so
//! dictionaries from independently-ordered runs are not mergeable.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use serde_json::{Map, Value};

/// Persisted file name for building class labels.
pub const CLASS_FILE: &str = "building_class.json";
/// Persisted file name for building type labels.
pub const TYPE_FILE: &str = "building_type.json";
/// Persisted file name for construction code labels.
pub const CODE_FILE: &str = "building_code.json";

/// Append-only label-to-code mapping, seeded with `""` at code 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Dictionary {
    codes: HashMap<String, u32>,
    labels: Vec<String>, // index = code
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl Dictionary {
    pub fn new() -> Self {
        let mut dict = Self {
            codes: HashMap::new(),
            labels: Vec::new(),
        };
        dict.intern("");
        dict
    }

    /// Code for `label`, assigning the next integer on first sight.
    pub fn intern(&mut self, label: &str) -> u32 {
        if let Some(&code) = self.codes.get(label) {
            return code;
        }
        let code = self.labels.len() as u32;
        self.codes.insert(label.to_string(), code);
        self.labels.push(label.to_string());
        code
    }

    /// Code for `label` if it has been seen.
    pub fn code(&self, label: &str) -> Option<u32> {
        self.codes.get(label).copied()
    }

    /// Label for `code`; `None` for a dangling index.
    pub fn label(&self, code: u32) -> Option<&str> {
        self.labels.get(code as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Write the mapping as a flat JSON object, label to code.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut doc = Map::new();
        for (code, label) in self.labels.iter().enumerate() {
            doc.insert(label.clone(), Value::from(code as u32));
        }
        let file = File::create(path)
            .with_context(|| format!("[dictionary] failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &Value::Object(doc))
            .with_context(|| format!("[dictionary] failed to write {}", path.display()))?;
        Ok(())
    }

    /// Load a flat label-to-code JSON object. The empty-string entry at
    /// code 0 is implied if absent; self-inconsistent documents
    /// (duplicate or out-of-range codes) are rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("[dictionary] failed to open {}", path.display()))?;
        let raw: HashMap<String, u32> = serde_json::from_reader(file)
            .with_context(|| format!("[dictionary] failed to parse {}", path.display()))?;
        Self::from_entries(raw).with_context(|| format!("[dictionary] in {}", path.display()))
    }

    fn from_entries(mut raw: HashMap<String, u32>) -> Result<Self> {
        raw.entry(String::new()).or_insert(0);
        let len = raw.len();
        let mut labels: Vec<Option<String>> = vec![None; len];
        for (label, code) in raw {
            ensure!(
                (code as usize) < len,
                "code {code} out of range for {len} entries"
            );
            ensure!(
                labels[code as usize].is_none(),
                "duplicate code {code}"
            );
            labels[code as usize] = Some(label);
        }
        let mut codes = HashMap::with_capacity(len);
        let mut ordered = Vec::with_capacity(len);
        for (code, slot) in labels.into_iter().enumerate() {
            let Some(label) = slot else {
                bail!("no label for code {code}");
            };
            codes.insert(label.clone(), code as u32);
            ordered.push(label);
        }
        Ok(Self {
            codes,
            labels: ordered,
        })
    }
}

/// The three category dictionaries of a dataset, built during one
/// ingestion run and persisted beside the region caches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionaries {
    pub class: Dictionary,
    pub ty: Dictionary,
    pub code: Dictionary,
}

impl Dictionaries {
    /// Dictionary file names, in (class, type, code) order.
    pub const FILES: [&'static str; 3] = [CLASS_FILE, TYPE_FILE, CODE_FILE];

    pub fn save(&self, dir: &Path) -> Result<()> {
        self.class.save(&dir.join(CLASS_FILE))?;
        self.ty.save(&dir.join(TYPE_FILE))?;
        self.code.save(&dir.join(CODE_FILE))?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            class: Dictionary::load(&dir.join(CLASS_FILE))?,
            ty: Dictionary::load(&dir.join(TYPE_FILE))?,
            code: Dictionary::load(&dir.join(CODE_FILE))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_seen_order_assigns_codes() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.intern("IECC"), 1);
        assert_eq!(dict.intern("ASHRAE"), 2);
        assert_eq!(dict.intern("IECC"), 1);
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.code(""), Some(0));
        assert_eq!(dict.label(0), Some(""));
        assert_eq!(dict.label(1), Some("IECC"));
        assert_eq!(dict.label(2), Some("ASHRAE"));
        assert_eq!(dict.label(9), None);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("building_class.json");

        let mut dict = Dictionary::new();
        dict.intern("IECC");
        dict.intern("ASHRAE");
        dict.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc[""], 0);
        assert_eq!(doc["IECC"], 1);
        assert_eq!(doc["ASHRAE"], 2);

        assert_eq!(Dictionary::load(&path).unwrap(), dict);
    }

    #[test]
    fn empty_label_is_implied_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dict.json");
        std::fs::write(&path, r#"{"IECC": 1, "ASHRAE": 2}"#).unwrap();

        let dict = Dictionary::load(&path).unwrap();
        assert_eq!(dict.label(0), Some(""));
        assert_eq!(dict.label(1), Some("IECC"));
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn rejects_inconsistent_documents() {
        let dir = tempfile::tempdir().unwrap();
        let gap = dir.path().join("gap.json");
        std::fs::write(&gap, r#"{"A": 1, "B": 3}"#).unwrap();
        assert!(Dictionary::load(&gap).is_err());

        let dup = dir.path().join("dup.json");
        std::fs::write(&dup, r#"{"A": 1, "B": 1}"#).unwrap();
        assert!(Dictionary::load(&dup).is_err());
    }

    #[test]
    fn bundle_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut dicts = Dictionaries::default();
        dicts.class.intern("IECC");
        dicts.ty.intern("SINGLE FAMILY RESIDENTIAL");
        dicts.code.intern("DOE-Ref-Pre-1980");
        dicts.save(dir.path()).unwrap();

        for file in Dictionaries::FILES {
            assert!(dir.path().join(file).exists());
        }
        assert_eq!(Dictionaries::load(dir.path()).unwrap(), dicts);
    }
}
