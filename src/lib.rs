//! Bedrock Schema Resolution
//!
//! Resolves the JSON schema that applies to a game-content definition file
//! at the format version it declares.
//!
//! ## Features
//!
//! - **Versioned Formats**: Each format is a base schema plus a timeline of
//!   change records keyed by version
//! - **Numeric Ordering**: `1.16.100` comes after `1.16.20`, whatever order
//!   changes are declared in
//! - **Cumulative Patching**: Every change sees the effect of the ones before it
//! - **Shared Definitions**: Named subtrees referenced by `$ref`, inlined or
//!   kept symbolic; recursive ones always stay symbolic
//! - **Memoization**: Resolved trees are cached per (format, version)
//!
//! ## Architecture
//!
//! ```text
//! schemas/
//! ├── definitions/
//! │   └── molang_number.json
//! └── formats/
//!     ├── feature.json         { fileMatch, baseSchema, changes: [...] }
//!     └── spawn_rules.json
//!
//! SchemaCatalog ──► FormatDescriptor ─┐
//!               └─► DefinitionRegistry ┴─► SchemaResolver ──► Arc<Value>
//! ```

pub mod annotations;
pub mod cache;
pub mod catalog;
pub mod change;
pub mod checksum;
pub mod config;
pub mod definitions;
pub mod error;
pub mod filter;
pub mod format;
pub mod pointer;
pub mod resolver;
pub mod version;

pub use annotations::{Annotation, AnnotationSite, ExpressionValidator};
pub use cache::{CacheStats, ResolutionCache};
pub use catalog::SchemaCatalog;
pub use change::{ActionKind, ChangeRecord, Operation};
pub use checksum::Checksum;
pub use config::ResolverConfig;
pub use definitions::{DefinitionRegistry, ExpandError, ExpansionPolicy};
pub use error::{ErrorKind, Result, SchemaError};
pub use filter::FilterExpr;
pub use format::{FormatDescriptor, FormatSource};
pub use pointer::{PathError, TargetPath};
pub use resolver::{ResolverOptions, SchemaResolver};
pub use version::VersionOrdinal;
