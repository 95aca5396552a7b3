//! Schema catalog loading
//!
//! A catalog is the static declarative source of formats and shared
//! definitions, read once at startup:
//!
//! ```text
//! schemas/
//! ├── definitions/
//! │   ├── molang_number.json      → definition "molang_number"
//! │   └── ...
//! └── formats/
//!     ├── feature.json            → format "feature"
//!     └── spawn_rules.json        → format "spawn_rules"
//! ```
//!
//! A format file holds `{ "fileMatch", "baseSchema", "changes" }`; a
//! definition file holds the definition's schema tree. Names come from the
//! file stem. The catalog bundled with this crate is embedded at compile
//! time.

use include_dir::{include_dir, Dir};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use walkdir::WalkDir;

use crate::definitions::DefinitionRegistry;
use crate::error::{Result, SchemaError};
use crate::format::{FormatDescriptor, FormatSource};
use crate::resolver::{ResolverOptions, SchemaResolver};

static EMBEDDED: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/schemas");

const DEFINITIONS_DIR: &str = "definitions";
const FORMATS_DIR: &str = "formats";

/// Formats and definitions read from a declarative source
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    definitions: Vec<(String, Value)>,
    formats: Vec<FormatDescriptor>,
}

impl SchemaCatalog {
    /// The catalog compiled into this crate
    pub fn embedded() -> Result<Self> {
        let mut catalog = Self::default();
        for (kind, dir) in [(DEFINITIONS_DIR, EMBEDDED.get_dir(DEFINITIONS_DIR)), (FORMATS_DIR, EMBEDDED.get_dir(FORMATS_DIR))] {
            let Some(dir) = dir else { continue };
            let mut files: Vec<_> = dir
                .files()
                .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
                .collect();
            files.sort_by_key(|f| f.path());

            for file in files {
                let origin = file.path().display().to_string();
                let contents = file
                    .contents_utf8()
                    .ok_or_else(|| SchemaError::invalid_source(&origin, "not valid UTF-8"))?;
                catalog.add_file(kind, file.path(), contents)?;
            }
        }
        info!(
            formats = catalog.formats.len(),
            definitions = catalog.definitions.len(),
            "loaded embedded catalog"
        );
        Ok(catalog)
    }

    /// Load a catalog laid out as `definitions/*.json` and `formats/*.json`
    pub fn from_directory(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut catalog = Self::default();
        for kind in [DEFINITIONS_DIR, FORMATS_DIR] {
            for path in json_files(&root.join(kind))? {
                let contents = fs::read_to_string(&path)?;
                catalog.add_file(kind, &path, &contents)?;
            }
        }
        info!(
            root = %root.display(),
            formats = catalog.formats.len(),
            definitions = catalog.definitions.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    fn add_file(&mut self, kind: &str, path: &Path, contents: &str) -> Result<()> {
        let origin = path.display().to_string();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SchemaError::invalid_source(&origin, "file name is not valid UTF-8"))?
            .to_string();

        if kind == DEFINITIONS_DIR {
            let tree: Value = serde_json::from_str(contents).map_err(|e| SchemaError::invalid_source(&origin, e))?;
            self.definitions.push((name, tree));
        } else {
            let source: FormatSource =
                serde_json::from_str(contents).map_err(|e| SchemaError::invalid_source(&origin, e))?;
            self.formats.push(FormatDescriptor::from_source(name, source)?);
        }
        Ok(())
    }

    pub fn formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    pub fn definitions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.definitions.iter().map(|(name, tree)| (name.as_str(), tree))
    }

    /// Registry seeded with the built-in definitions plus this catalog's
    pub fn registry(&self) -> Result<DefinitionRegistry> {
        let mut registry = DefinitionRegistry::with_builtins()?;
        for (name, tree) in &self.definitions {
            registry.register(name.clone(), tree.clone())?;
        }
        Ok(registry)
    }

    pub fn into_resolver(self, options: ResolverOptions) -> Result<SchemaResolver> {
        let registry = self.registry()?;
        SchemaResolver::new(self.formats, Arc::new(registry), options)
    }
}

/// `*.json` files under `dir`, sorted by path; a missing dir is empty
fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| SchemaError::invalid_source(dir.display().to_string(), e))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}
