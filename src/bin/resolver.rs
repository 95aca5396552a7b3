//! Schema Resolver CLI
//!
//! Lists formats, prints version timelines and resolves the effective schema
//! of a format at a given version.

use anyhow::{anyhow, Context};
use bedrock_schemas::{
    annotations, Checksum, DefinitionRegistry, ExpansionPolicy, ResolverConfig, SchemaCatalog,
    SchemaResolver,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-resolver")]
#[command(about = "Resolve versioned Bedrock content schemas")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    /// Catalog directory (overrides config; embedded catalog when unset)
    #[arg(long)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered formats
    Formats,

    /// Show the change timeline of a format
    Timeline {
        /// Format id
        format: String,
    },

    /// Resolve the effective schema of a format at a version
    Resolve {
        /// Format id
        format: String,
        /// Requested version, e.g. 1.16.100
        version: String,
        /// Inline shared definitions instead of keeping `$ref`s
        #[arg(long)]
        inline: bool,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List annotated nodes of a resolved schema
    Annotations {
        format: String,
        version: String,
    },

    /// Find the format that applies to a content file path
    Match {
        path: PathBuf,
    },

    /// Resolve every format at every declared version
    Check,

    /// Show the effective configuration
    Config {
        /// Save it to this file
        #[arg(long)]
        save: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ResolverConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    let inline = matches!(cli.command, Commands::Resolve { inline: true, .. });
    let catalog_dir = cli.catalog.clone();
    let open = || open_resolver(&config, catalog_dir.clone(), inline);

    match cli.command {
        Commands::Formats => {
            let resolver = open()?;
            println!("📚 Formats:");
            for id in resolver.formats() {
                let format = resolver.format(id)?;
                let latest = format
                    .latest_version()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "base".to_string());
                println!("  {} ({} changes, latest {})", id, format.changes().len(), latest);
                for pattern in format.file_match() {
                    println!("    └─ {}", pattern);
                }
            }
            print_definitions(resolver.definitions());
        }

        Commands::Timeline { format } => {
            let resolver = open()?;
            let descriptor = resolver.format(&format)?;
            println!("🕒 {} timeline:", descriptor.id());
            println!("  base");
            for change in descriptor.changes() {
                println!("  {} ({} operations)", change.version(), change.operations.len());
                for op in &change.operations {
                    println!("    └─ {} {}", op.action.as_str(), op.target);
                }
            }
        }

        Commands::Resolve { format, version, compact, output, .. } => {
            let resolver = open()?;
            let tree = resolver.resolve(&format, &version)?;
            let rendered = if compact {
                serde_json::to_string(&*tree)?
            } else {
                serde_json::to_string_pretty(&*tree)?
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;
                    println!(
                        "✅ {}@{} → {} ({})",
                        format,
                        version,
                        path.display(),
                        Checksum::of(&tree).short()
                    );
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Annotations { format, version } => {
            let resolver = open()?;
            let tree = resolver.resolve(&format, &version)?;
            let sites = annotations::collect(&tree);
            if sites.is_empty() {
                println!("No annotations in {}@{}", format, version);
            }
            for site in sites {
                let pointer = if site.pointer.is_empty() { "/" } else { site.pointer.as_str() };
                println!("  {} {}", pointer, serde_json::to_string(&site.annotation)?);
            }
        }

        Commands::Match { path } => {
            let resolver = open()?;
            let format = resolver
                .format_for_path(&path)
                .ok_or_else(|| anyhow!("no format matches {}", path.display()))?;
            println!("{}", format.id());
        }

        Commands::Check => {
            let resolver = open()?;
            println!("🔍 Resolving every format at every declared version...");
            let mut failures = 0;
            let ids: Vec<String> = resolver.formats().map(str::to_string).collect();
            for id in ids {
                let mut versions = vec!["0".to_string()];
                versions.extend(resolver.timeline(&id)?.into_iter().map(|v| v.to_string()));
                for version in versions {
                    match resolver.resolve(&id, &version) {
                        Ok(tree) => println!("  ✅ {}@{} {}", id, version, Checksum::of(&tree).short()),
                        Err(e) => {
                            println!("  ❌ {}@{} {}", id, version, e);
                            failures += 1;
                        }
                    }
                }
            }

            if failures > 0 {
                return Err(anyhow!("{} resolution(s) failed", failures));
            }
            println!("\n✅ All formats resolve");
        }

        Commands::Config { save } => {
            println!("{}", toml::to_string_pretty(&config)?);
            if let Some(path) = save {
                config.save(&path).with_context(|| format!("saving configuration to {}", path))?;
                println!("✅ Saved configuration to {}", path);
            }
        }
    }

    Ok(())
}

fn open_resolver(config: &ResolverConfig, catalog: Option<PathBuf>, inline: bool) -> anyhow::Result<SchemaResolver> {
    let mut options = config.resolver_options();
    if inline {
        options.expansion = ExpansionPolicy::Inline;
    }

    let catalog = match catalog.or_else(|| config.catalog_path()) {
        Some(path) => SchemaCatalog::from_directory(&path)
            .with_context(|| format!("loading catalog from {}", path.display()))?,
        None => SchemaCatalog::embedded()?,
    };
    Ok(catalog.into_resolver(options)?)
}

fn print_definitions(registry: &DefinitionRegistry) {
    println!("\n🧩 Definitions:");
    for name in registry.names() {
        let marker = if registry.is_recursive(name) { " (recursive)" } else { "" };
        println!("  {}{}", name, marker);
    }
}
