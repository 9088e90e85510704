//! resembl CLI: exercises the core engine end-to-end.
//!
//! This binary is deliberately thin. Per the library's scope, it does not
//! render tables, JSON, or CSV — each invocation prints a plain-text dump
//! of whatever the core operation returned and exits. It also starts from
//! an empty in-memory store on every run: wiring a durable
//! [`resembl_core::store::SnippetStoreSession`] implementation to a real
//! database is left to whichever external collaborator embeds this crate.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use resembl_core::core::config;
use resembl_core::merge;
use resembl_core::pipeline;
use resembl_core::store::{InMemorySession, SnippetStore};

#[derive(Parser)]
#[command(name = "resembl", about = "Content-addressed assembly snippet search")]
struct Cli {
    /// Emit debug-level logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add one snippet from a file, or a whole directory of `*.asm` files.
    Add {
        /// Name to attach to the snippet (ignored for directory imports,
        /// where the file stem is used instead).
        name: String,
        /// Path to an `.asm` file or a directory of them.
        path: PathBuf,
        #[arg(long)]
        ngram_size: Option<usize>,
    },
    /// Look up a snippet by checksum prefix.
    Get { checksum: String },
    /// Find the best matches for a query file against the store.
    Find {
        path: PathBuf,
        #[arg(long)]
        top_n: Option<usize>,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Compare two stored snippets directly.
    Compare { checksum1: String, checksum2: String },
    /// Add or remove a name on a snippet.
    Name {
        #[command(subcommand)]
        action: NameAction,
    },
    /// Add or remove a tag on a snippet.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Manage collections.
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },
    /// Substring search over snippet names.
    Search { pattern: String },
    /// Write every snippet's code out as `.asm` files.
    Export { directory: PathBuf },
    /// Write every snippet out as a YARA rule file.
    ExportYara { path: PathBuf },
    /// Merge a second directory of snippets into the running store.
    Merge { source_dir: PathBuf },
    /// Aggregate store statistics.
    Stats {
        #[arg(long, default_value_t = 0)]
        sample_size: usize,
    },
    /// Recompute every snippet's MinHash.
    Reindex {
        #[arg(long)]
        ngram_size: Option<usize>,
    },
    /// Invalidate the LSH cache and reclaim storage.
    Clean,
    /// Show version history for a snippet.
    Version { checksum: String },
}

#[derive(Subcommand)]
enum NameAction {
    Add { checksum: String, name: String },
    Remove { checksum: String, name: String },
}

#[derive(Subcommand)]
enum TagAction {
    Add { checksum: String, tag: String },
    Remove { checksum: String, tag: String },
}

#[derive(Subcommand)]
enum CollectionAction {
    Create {
        name: String,
        #[arg(default_value = "")]
        description: String,
    },
    Delete { name: String },
    List,
    AddSnippet { collection: String, checksum: String },
    RemoveSnippet { checksum: String },
}

fn main() -> resembl_core::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).with_target(false).init();

    let cfg = config::load_config();
    let mut store = SnippetStore::new(InMemorySession::new());

    match cli.command {
        Commands::Add { name, path, ngram_size } => {
            let ngram_size = ngram_size.unwrap_or(cfg.ngram_size);
            if path.is_dir() {
                let count = parallel_import(&mut store, &path, ngram_size)?;
                println!("imported {count} snippets from {}", path.display());
            } else {
                let code = std::fs::read_to_string(&path)?;
                match store.add(&name, &code, ngram_size) {
                    Some(snippet) => println!("{snippet:#?}"),
                    None => println!("refused: blank input"),
                }
            }
        }
        Commands::Get { checksum } => {
            let checksum = store.resolve_prefix(&checksum)?;
            match store.get(&checksum) {
                Some(snippet) => println!("{snippet:#?}"),
                None => println!("not found"),
            }
        }
        Commands::Find { path, top_n, threshold } => {
            let query = std::fs::read_to_string(&path)?;
            let top_n = top_n.unwrap_or(cfg.top_n);
            let threshold = threshold.unwrap_or(cfg.lsh_threshold);
            if !(0.0..0.99).contains(&threshold) {
                return Err(resembl_core::ResemblError::invalid_parameter(
                    "threshold",
                    format!("must be in [0.0, 0.99), got {threshold}"),
                ));
            }
            let (candidate_count, matches) = pipeline::find_matches(
                &store,
                &query,
                top_n,
                threshold,
                true,
                cfg.ngram_size,
                cfg.jaccard_weight,
            )?;
            println!("{candidate_count} candidate(s)");
            for (snippet, score) in matches {
                println!("{:.2}  {}  {}", score, snippet.checksum, snippet.names.join(", "));
            }
        }
        Commands::Compare { checksum1, checksum2 } => {
            let c1 = store.resolve_prefix(&checksum1)?;
            let c2 = store.resolve_prefix(&checksum2)?;
            match store.compare(&c1, &c2, cfg.jaccard_weight) {
                Some(comparison) => println!("{comparison:#?}"),
                None => println!("not found"),
            }
        }
        Commands::Name { action } => match action {
            NameAction::Add { checksum, name } => {
                let checksum = store.resolve_prefix(&checksum)?;
                println!("{:#?}", store.name_add(&checksum, &name)?);
            }
            NameAction::Remove { checksum, name } => {
                let checksum = store.resolve_prefix(&checksum)?;
                println!("{:#?}", store.name_remove(&checksum, &name)?);
            }
        },
        Commands::Tag { action } => match action {
            TagAction::Add { checksum, tag } => {
                let checksum = store.resolve_prefix(&checksum)?;
                println!("{:#?}", store.tag_add(&checksum, &tag)?);
            }
            TagAction::Remove { checksum, tag } => {
                let checksum = store.resolve_prefix(&checksum)?;
                println!("{:#?}", store.tag_remove(&checksum, &tag)?);
            }
        },
        Commands::Collection { action } => match action {
            CollectionAction::Create { name, description } => {
                println!("{:#?}", store.collection_create(&name, &description));
            }
            CollectionAction::Delete { name } => {
                println!("deleted: {}", store.collection_delete(&name));
            }
            CollectionAction::List => {
                for summary in store.collection_list() {
                    println!(
                        "{}  {} snippet(s)  {}",
                        summary.name, summary.snippet_count, summary.description
                    );
                }
            }
            CollectionAction::AddSnippet { collection, checksum } => {
                let checksum = store.resolve_prefix(&checksum)?;
                match store.collection_add_snippet(&collection, &checksum) {
                    Some(snippet) => println!("{snippet:#?}"),
                    None => println!("not found: snippet or collection"),
                }
            }
            CollectionAction::RemoveSnippet { checksum } => {
                let checksum = store.resolve_prefix(&checksum)?;
                match store.collection_remove_snippet(&checksum) {
                    Some(snippet) => println!("{snippet:#?}"),
                    None => println!("not found"),
                }
            }
        },
        Commands::Search { pattern } => {
            for snippet in store.search_by_name(&pattern) {
                println!("{}  {}", snippet.checksum, snippet.names.join(", "));
            }
        }
        Commands::Export { directory } => {
            println!("{:#?}", store.export(&directory)?);
        }
        Commands::ExportYara { path } => {
            println!("{:#?}", store.export_yara(&path)?);
        }
        Commands::Merge { source_dir } => {
            let mut source = SnippetStore::new(InMemorySession::new());
            parallel_import(&mut source, &source_dir, cfg.ngram_size)?;
            let stats = merge::merge(&mut store, &source);
            println!("{stats:#?}");
        }
        Commands::Stats { sample_size } => {
            println!("{:#?}", store.stats(sample_size));
        }
        Commands::Reindex { ngram_size } => {
            let ngram_size = ngram_size.unwrap_or(cfg.ngram_size);
            println!("{:#?}", store.reindex(ngram_size));
        }
        Commands::Clean => {
            store.clean()?;
            println!("ok");
        }
        Commands::Version { checksum } => {
            let checksum = store.resolve_prefix(&checksum)?;
            let versions = store.snippet_version_list(&checksum);
            if versions.is_empty() {
                println!("no version history for this snippet");
            }
            for version in versions {
                println!("{}  {}", version.created_at, version.id);
            }
        }
    }

    Ok(())
}

/// Read every `*.asm` file in `dir` and insert it, computing MinHash
/// fingerprints across a thread pool before the sequential inserts. The
/// store itself isn't `Sync`, so only the CPU-bound fingerprinting step
/// runs in parallel; the rest is the same work `SnippetStore::import_directory`
/// does one file at a time.
fn parallel_import(
    store: &mut SnippetStore<InMemorySession>,
    dir: &std::path::Path,
    ngram_size: usize,
) -> resembl_core::Result<usize> {
    let entries: Vec<(String, String)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("asm"))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?.to_string();
            let code = std::fs::read_to_string(&path).ok()?;
            Some((stem, code))
        })
        .collect();

    let fingerprinted: Vec<(String, String, resembl_core::fingerprint::MinHash)> = entries
        .par_iter()
        .map(|(name, code)| {
            let minhash = resembl_core::fingerprint::build_minhash(
                code,
                ngram_size,
                resembl_core::fingerprint::NUM_PERMUTATIONS,
                true,
            );
            (name.clone(), code.clone(), minhash)
        })
        .collect();

    let mut count = 0usize;
    for (name, code, minhash) in fingerprinted {
        store.add_prehashed(&name, &code, minhash);
        count += 1;
    }
    Ok(count)
}
