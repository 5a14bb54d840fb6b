//! Reference catalog - materials, tools and machines by identifier
//!
//! Catalogs are JSON documents:
//!
//! ```json
//! { "materials": { "<id>": { ... } }, "tools": { ... }, "machines": { ... } }
//! ```
//!
//! Every record is validated on load. A [`Catalog`] is immutable once built;
//! hosts share it through a [`CatalogHandle`], which swaps whole snapshots.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use crate::engine::{EngineError, MachineEnvelope, Material, MaterialPhysicalModel, ToolGeometry};

const BUILTIN: &str = include_str!("builtin.json");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cannot read catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("material '{id}' rejected: {source}")]
    InvalidMaterial {
        id: String,
        #[source]
        source: EngineError,
    },

    #[error("tool '{id}' rejected: {source}")]
    InvalidTool {
        id: String,
        #[source]
        source: EngineError,
    },

    #[error("machine '{id}' rejected: {source}")]
    InvalidMachine {
        id: String,
        #[source]
        source: EngineError,
    },
}

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialPhysicalModel>,
    #[serde(default)]
    pub tools: BTreeMap<String, ToolGeometry>,
    #[serde(default)]
    pub machines: BTreeMap<String, MachineEnvelope>,
}

/// Validated, read-only reference data
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    materials: BTreeMap<String, Material>,
    tools: BTreeMap<String, ToolGeometry>,
    machines: BTreeMap<String, MachineEnvelope>,
}

impl Catalog {
    /// The reference data shipped with the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Self::from_records(file)
    }

    /// Validate every record. The first bad record rejects the whole catalog.
    pub fn from_records(file: CatalogFile) -> Result<Self, CatalogError> {
        let mut materials = BTreeMap::new();
        for (id, record) in file.materials {
            let material = Material::from_record(id.as_str(), record)
                .map_err(|source| CatalogError::InvalidMaterial { id: id.clone(), source })?;
            materials.insert(material.id().to_string(), material);
        }

        for (id, tool) in &file.tools {
            tool.validate()
                .map_err(|source| CatalogError::InvalidTool { id: id.clone(), source })?;
        }
        for (id, machine) in &file.machines {
            machine
                .validate()
                .map_err(|source| CatalogError::InvalidMachine { id: id.clone(), source })?;
        }

        Ok(Self {
            materials,
            tools: file.tools,
            machines: file.machines,
        })
    }

    /// Back to the on-disk layout
    pub fn to_records(&self) -> CatalogFile {
        CatalogFile {
            materials: self
                .materials
                .iter()
                .map(|(id, m)| (id.clone(), m.record().clone()))
                .collect(),
            tools: self.tools.clone(),
            machines: self.machines.clone(),
        }
    }

    /// Get a material by ID, falling back to a case-insensitive ID or name match
    pub fn material(&self, key: &str) -> Option<&Material> {
        lookup(&self.materials, key, |m| m.name())
    }

    pub fn tool(&self, key: &str) -> Option<(&str, &ToolGeometry)> {
        lookup_entry(&self.tools, key, |t| t.name.as_str())
    }

    pub fn machine(&self, key: &str) -> Option<(&str, &MachineEnvelope)> {
        lookup_entry(&self.machines, key, |m| m.name.as_str())
    }

    /// Materials in ID order
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }

    pub fn tools(&self) -> impl Iterator<Item = (&str, &ToolGeometry)> {
        self.tools.iter().map(|(id, t)| (id.as_str(), t))
    }

    pub fn machines(&self) -> impl Iterator<Item = (&str, &MachineEnvelope)> {
        self.machines.iter().map(|(id, m)| (id.as_str(), m))
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty() && self.tools.is_empty() && self.machines.is_empty()
    }
}

fn lookup<'a, T>(
    map: &'a BTreeMap<String, T>,
    key: &str,
    name: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    lookup_entry(map, key, name).map(|(_, value)| value)
}

fn lookup_entry<'a, T>(
    map: &'a BTreeMap<String, T>,
    key: &str,
    name: impl Fn(&T) -> &str,
) -> Option<(&'a str, &'a T)> {
    let key = key.trim();
    if let Some((id, value)) = map.get_key_value(key) {
        return Some((id.as_str(), value));
    }
    map.iter()
        .find(|(id, value)| id.eq_ignore_ascii_case(key) || name(value).eq_ignore_ascii_case(key))
        .map(|(id, value)| (id.as_str(), value))
}

/// Shared, swappable catalog snapshot.
///
/// The lock only guards the pointer. Readers take an `Arc` and keep using it
/// while a reload installs a new catalog.
#[derive(Debug)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Install `catalog`, returning the snapshot it replaced
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(catalog))
    }

    /// Load `path` and install it. On error the current snapshot stays.
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<Arc<Catalog>, CatalogError> {
        let catalog = Catalog::from_file(path)?;
        self.replace(catalog);
        Ok(self.snapshot())
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::new(Catalog::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ToolCoating;
    use pretty_assertions::assert_eq;

    const SMALL: &str = r#"{
        "materials": {
            "1018": {
                "name": "AISI 1018",
                "kienzle": { "kc1_1": 1500.0, "mc": 0.25 },
                "johnson_cook": { "a": 350.0, "b": 275.0, "n": 0.36, "c": 0.022, "m": 1.0 },
                "taylor": { "c": 300.0, "n": 0.25 },
                "machinability_rating": 78.0,
                "melting_point_c": 1500.0
            }
        },
        "tools": {
            "EM_8_3FL": {
                "name": "8 mm 3FL",
                "diameter": 8.0,
                "flute_count": 3,
                "length_of_cut": 19.0,
                "max_rpm": 20000,
                "coating": "TIALN"
            }
        }
    }"#;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("chipload-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.material("52100-annealed").is_some());
        assert!(catalog.material("52100-62hrc").is_some());
        let (id, tool) = catalog.tool("EM_12_4FL").unwrap();
        assert_eq!(id, "EM_12_4FL");
        assert_eq!(tool.coating, ToolCoating::TiAlN);
        assert!(catalog.machine("bench-mill-2kw").is_some());
        assert_eq!(catalog.materials().count(), 8);
    }

    #[test]
    fn test_builtin_hardness_is_optional() {
        let catalog = Catalog::builtin().unwrap();
        let hard = catalog.material("52100-62hrc").unwrap().record();
        assert_eq!(hard.hardness_hrc, Some(62.0));
        assert_eq!(hard.hardness_hb, None);
    }

    #[test]
    fn test_parse_small_catalog() {
        let catalog = Catalog::from_json(SMALL).unwrap();
        assert_eq!(catalog.materials().count(), 1);
        assert_eq!(catalog.machines().count(), 0);
        let (_, tool) = catalog.tool("EM_8_3FL").unwrap();
        assert_eq!(tool.flute_count, 3);
        assert_eq!(tool.feed_per_tooth, None);
    }

    #[test]
    fn test_lookup_by_name_and_case() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.material("TI-6AL-4V").unwrap().id(), "ti-6al-4v");
        assert_eq!(catalog.material("aluminum 6061-t6").unwrap().id(), "6061-t6");
        assert_eq!(catalog.tool("em_6_3fl").unwrap().0, "EM_6_3FL");
        assert!(catalog.material("unobtainium").is_none());
    }

    #[test]
    fn test_rejects_bad_material() {
        let json = SMALL.replace(r#""mc": 0.25"#, r#""mc": 1.5"#);
        let err = Catalog::from_json(&json).unwrap_err();
        match err {
            CatalogError::InvalidMaterial { id, source } => {
                assert_eq!(id, "1018");
                assert!(matches!(
                    source,
                    EngineError::InvalidMaterial {
                        coefficient: "kienzle.mc",
                        ..
                    }
                ));
            }
            other => panic!("expected InvalidMaterial, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_tool() {
        let json = SMALL.replace(r#""flute_count": 3"#, r#""flute_count": 0"#);
        let err = Catalog::from_json(&json).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidTool { ref id, .. } if id == "EM_8_3FL"));
    }

    #[test]
    fn test_rejects_bad_machine() {
        let json = r#"{ "machines": { "m1": { "max_rpm": 8000, "max_power_kw": 0.0, "max_torque_nm": 50.0 } } }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidMachine { .. }));
    }

    #[test]
    fn test_records_reload_unchanged() {
        let catalog = Catalog::builtin().unwrap();
        let json = serde_json::to_string(&catalog.to_records()).unwrap();
        let again = Catalog::from_json(&json).unwrap();
        assert_eq!(
            catalog.material("304").map(|m| m.record()),
            again.material("304").map(|m| m.record())
        );
        assert_eq!(catalog.tools().count(), again.tools().count());
    }

    #[test]
    fn test_handle_swaps_snapshot() {
        let handle = CatalogHandle::new(Catalog::builtin().unwrap());
        let before = handle.snapshot();

        let previous = handle.replace(Catalog::from_json(SMALL).unwrap());
        assert!(Arc::ptr_eq(&before, &previous));

        // Readers keep the snapshot they took
        assert!(before.material("52100-annealed").is_some());
        assert!(handle.snapshot().material("52100-annealed").is_none());
    }

    #[test]
    fn test_failed_reload_keeps_snapshot() {
        let handle = CatalogHandle::new(Catalog::builtin().unwrap());
        let path = temp_path("broken");
        std::fs::write(&path, "{ not json").unwrap();

        let err = handle.reload_from_file(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));
        assert!(handle.snapshot().material("52100-annealed").is_some());

        let err = handle.reload_from_file(temp_path("missing")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_reload_from_file() {
        let handle = CatalogHandle::default();
        assert!(handle.snapshot().is_empty());

        let path = temp_path("small");
        std::fs::write(&path, SMALL).unwrap();
        let snapshot = handle.reload_from_file(&path).unwrap();
        assert!(snapshot.material("1018").is_some());
        std::fs::remove_file(&path).ok();
    }
}
