//! Schema resolver
//!
//! Computes the effective schema of a format at a requested version: the
//! base schema with every change at or below that version applied, oldest
//! first, each change seeing the result of the ones before it.
//!
//! ```text
//! resolve(format, version)
//!   ├─ cache hit? ──────────────────────────────► return
//!   ├─ parse version
//!   ├─ clone base schema
//!   ├─ for change in timeline where change.version <= version (ascending)
//!   │     apply change (all operations or none)
//!   ├─ expand shared definitions
//!   └─ cache + return
//! ```

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::cache::{CacheStats, ResolutionCache};
use crate::definitions::{DefinitionRegistry, ExpansionPolicy};
use crate::error::{Result, SchemaError};
use crate::format::FormatDescriptor;
use crate::version::VersionOrdinal;

/// Resolver behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    pub expansion: ExpansionPolicy,
    pub cache_enabled: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            expansion: ExpansionPolicy::Preserve,
            cache_enabled: true,
        }
    }
}

struct RegisteredFormat {
    descriptor: FormatDescriptor,
    file_match: GlobSet,
}

/// Resolves formats against their change timelines
///
/// Formats and definitions are fixed at construction and shared read-only;
/// the cache is the only interior mutability, so a resolver can be shared
/// across threads behind an `Arc`.
pub struct SchemaResolver {
    formats: IndexMap<String, RegisteredFormat>,
    definitions: Arc<DefinitionRegistry>,
    options: ResolverOptions,
    cache: ResolutionCache,
}

impl SchemaResolver {
    pub fn new(
        formats: impl IntoIterator<Item = FormatDescriptor>,
        definitions: Arc<DefinitionRegistry>,
        options: ResolverOptions,
    ) -> Result<Self> {
        let mut registered = IndexMap::new();
        for descriptor in formats {
            let id = descriptor.id().to_string();
            if registered.contains_key(&id) {
                return Err(SchemaError::DuplicateFormat(id));
            }
            let file_match = build_globs(&descriptor)?;
            registered.insert(id, RegisteredFormat { descriptor, file_match });
        }

        Ok(Self {
            formats: registered,
            definitions,
            options,
            cache: ResolutionCache::new(options.cache_enabled),
        })
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    /// Registered format ids, in registration order
    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    pub fn format(&self, id: &str) -> Result<&FormatDescriptor> {
        self.formats
            .get(id)
            .map(|f| &f.descriptor)
            .ok_or_else(|| SchemaError::UnknownFormat {
                id: id.to_string(),
                suggestion: self.suggest(id),
            })
    }

    /// Declared change versions of a format, ascending
    pub fn timeline(&self, id: &str) -> Result<Vec<&VersionOrdinal>> {
        Ok(self.format(id)?.changes().iter().map(|c| c.version()).collect())
    }

    /// Format whose `fileMatch` globs match `path`, first registered wins
    pub fn format_for_path(&self, path: impl AsRef<Path>) -> Option<&FormatDescriptor> {
        let path = path.as_ref();
        self.formats
            .values()
            .find(|f| f.file_match.is_match(path))
            .map(|f| &f.descriptor)
    }

    /// Effective schema of `format_id` at `requested`, memoized
    pub fn resolve(&self, format_id: &str, requested: &str) -> Result<Arc<Value>> {
        if let Some(hit) = self.cache.get(format_id, requested) {
            trace!(format = format_id, version = requested, "resolution cache hit");
            return Ok(hit);
        }

        let resolved = Arc::new(self.resolve_uncached(format_id, requested)?);
        self.cache.insert(format_id, requested, Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Effective schema without consulting or filling the cache
    pub fn resolve_uncached(&self, format_id: &str, requested: &str) -> Result<Value> {
        let format = self.format(format_id)?;
        let version = VersionOrdinal::parse(requested).map_err(|_| SchemaError::InvalidRequestedVersion {
            format: format.id().to_string(),
            requested: requested.to_string(),
        })?;

        let mut working = format.base_schema().clone();
        let mut applied = 0usize;
        for change in format.applicable_changes(&version) {
            change.apply(&mut working).map_err(|failure| SchemaError::PatchFailed {
                format: format.id().to_string(),
                requested: requested.to_string(),
                change: change.version().to_string(),
                operation: failure.index,
                source: failure.source,
            })?;
            applied += 1;
            debug!(
                format = format.id(),
                change = %change.version(),
                operations = change.operations.len(),
                "applied change"
            );
        }

        debug!(format = format.id(), version = requested, applied, "resolved schema");
        self.definitions
            .expand(&working, self.options.expansion)
            .map_err(|source| SchemaError::ExpansionFailed {
                format: format.id().to_string(),
                requested: requested.to_string(),
                source,
            })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn suggest(&self, query: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default();
        self.formats
            .keys()
            .filter_map(|id| matcher.fuzzy_match(id, query).map(|score| (score, id)))
            .max_by_key(|(score, _)| *score)
            .map(|(_, id)| id.clone())
    }
}

fn build_globs(descriptor: &FormatDescriptor) -> Result<GlobSet> {
    let origin = || format!("format '{}'", descriptor.id());
    let mut builder = GlobSetBuilder::new();
    for pattern in descriptor.file_match() {
        let glob = Glob::new(pattern).map_err(|e| SchemaError::invalid_source(origin(), e))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| SchemaError::invalid_source(origin(), e))
}
