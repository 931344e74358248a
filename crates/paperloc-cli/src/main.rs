use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use paperloc_core::config_file::{self, ConfigFile};
use paperloc_core::{SchemaMapping, parse_schema_assignment};
use paperloc_ingest::{DirectoryStore, PaperAssembler, PaperStore};
use paperloc_tex::{BibitemExtractor, extract_equations};

mod output;

use output::{ColorMode, LocalizeSummary};

const DEFAULT_DATA_DIR: &str = "data";

/// paperloc - Extract bibliographies from TeX and pair detected entities with their rendered locations
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract \bibitem entries from a .tex or .bbl file as JSON
    Bibitems {
        /// Path to the .tex or .bbl file
        file_path: PathBuf,

        /// Comma-separated command names that start an entry (default: bibitem)
        #[arg(long, value_delimiter = ',')]
        markers: Vec<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the equations of a .tex file as JSON
    Equations {
        /// Path to the .tex file
        file_path: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List papers that have location data for an entity type
    Papers {
        /// Entity type, e.g. "citations", "equations", "terms"
        #[arg(long)]
        entity: String,

        /// Root of the pipeline data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Pair each paper's detected entities with their locations (JSON Lines)
    Localize {
        /// Entity type, e.g. "citations", "equations", "terms"
        #[arg(long)]
        entity: String,

        /// Root of the pipeline data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Paper ids to process (default: every paper with location data)
        #[arg(long = "paper")]
        papers: Vec<String>,

        /// Schema for an entity file, e.g. entities-terms.csv=term (repeatable)
        #[arg(long = "schema", value_name = "FILE=SCHEMA")]
        schemas: Vec<String>,

        /// Glob for entity files inside a paper's directory
        #[arg(long)]
        entity_glob: Option<String>,

        /// Path to output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();
    let config = config_file::load_config();

    match cli.command {
        Command::Bibitems {
            file_path,
            markers,
            pretty,
        } => bibitems(&file_path, markers, pretty, &config),
        Command::Equations { file_path, pretty } => equations(&file_path, pretty),
        Command::Papers { entity, data_dir } => papers(&entity, data_dir, &config),
        Command::Localize {
            entity,
            data_dir,
            papers,
            schemas,
            entity_glob,
            output,
            no_color,
        } => localize(
            &entity,
            data_dir,
            papers,
            schemas,
            entity_glob,
            output,
            no_color,
            &config,
        ),
    }
}

/// Log to stderr. `RUST_LOG` overrides the default `warn` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn bibitems(
    file_path: &Path,
    markers: Vec<String>,
    pretty: bool,
    config: &ConfigFile,
) -> anyhow::Result<()> {
    let markers = if markers.is_empty() {
        config
            .bibliography
            .as_ref()
            .and_then(|b| b.markers.clone())
            .unwrap_or_default()
    } else {
        markers
    };
    let extractor = if markers.is_empty() {
        BibitemExtractor::new()
    } else {
        BibitemExtractor::with_markers(markers)
    };

    let tex = read_source(file_path)?;
    let items = extractor.extract(&tex)?;
    tracing::info!(file = %file_path.display(), count = items.len(), "extracted bibitems");
    print_json(&items, pretty)
}

fn equations(file_path: &Path, pretty: bool) -> anyhow::Result<()> {
    let tex = read_source(file_path)?;
    let equations = extract_equations(&tex)?;
    print_json(&equations, pretty)
}

fn papers(entity: &str, data_dir: Option<PathBuf>, config: &ConfigFile) -> anyhow::Result<()> {
    let store = DirectoryStore::new(resolve_data_dir(data_dir, config), entity);
    let mut stdout = std::io::stdout().lock();
    for id in store.paper_ids()? {
        writeln!(stdout, "{id}")?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn localize(
    entity: &str,
    data_dir: Option<PathBuf>,
    papers: Vec<String>,
    schemas: Vec<String>,
    entity_glob: Option<String>,
    output: Option<PathBuf>,
    no_color: bool,
    config: &ConfigFile,
) -> anyhow::Result<()> {
    let data_dir = resolve_data_dir(data_dir, config);
    if !data_dir.is_dir() {
        anyhow::bail!("Data directory not found: {}", data_dir.display());
    }

    let mut store = DirectoryStore::new(&data_dir, entity);
    let entity_glob =
        entity_glob.or_else(|| config.data.as_ref().and_then(|d| d.entity_glob.clone()));
    if let Some(glob) = entity_glob {
        store = store.with_entity_glob(glob);
    }
    let schemas = resolve_schemas(schemas, config)?;

    let papers = if papers.is_empty() {
        store.paper_ids()?
    } else {
        papers
    };
    tracing::info!(data_dir = %data_dir.display(), entity, papers = papers.len(), "localizing");

    let use_color = !no_color;
    let color = ColorMode(use_color);
    let mut writer: Box<dyn Write> = if let Some(ref output_path) = output {
        Box::new(std::io::BufWriter::new(std::fs::File::create(output_path)?))
    } else {
        Box::new(std::io::stdout().lock())
    };

    let assembler = PaperAssembler::new(store).with_schemas(schemas);
    let mut summary = LocalizeSummary::default();
    for (paper_id, outcome) in papers.iter().zip(assembler.assemble_all(papers.clone())) {
        match outcome {
            Ok(outcome) => {
                summary.diagnostics += outcome.diagnostics.len();
                match outcome.result {
                    Some(result) => {
                        summary.record(&result);
                        serde_json::to_writer(&mut writer, &result)?;
                        writeln!(writer)?;
                    }
                    None => summary.skipped += 1,
                }
            }
            Err(e) => {
                tracing::error!(paper_id = %paper_id, error = %e, "failed to localize paper");
                summary.failed += 1;
            }
        }
    }
    writer.flush()?;

    output::print_summary(&mut std::io::stderr(), &summary, color)?;
    if summary.failed > 0 {
        anyhow::bail!("{} paper(s) failed", summary.failed);
    }
    Ok(())
}

/// CLI flag > `PAPERLOC_DATA_DIR` > config file > `./data`.
fn resolve_data_dir(flag: Option<PathBuf>, config: &ConfigFile) -> PathBuf {
    flag.or_else(|| std::env::var("PAPERLOC_DATA_DIR").ok().map(PathBuf::from))
        .or_else(|| {
            config
                .data
                .as_ref()
                .and_then(|d| d.root.as_ref())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// `--schema` assignments layered over the config file's `[schemas]` table.
fn resolve_schemas(
    assignments: Vec<String>,
    config: &ConfigFile,
) -> anyhow::Result<Option<SchemaMapping>> {
    let mut map = match config.schema_mapping()? {
        Some(SchemaMapping::ByFileName(map)) => map,
        mapping if assignments.is_empty() => return Ok(mapping),
        _ => BTreeMap::new(),
    };
    for assignment in &assignments {
        let (file, schema) = parse_schema_assignment(assignment)?;
        map.insert(file, schema);
    }
    Ok(Some(SchemaMapping::ByFileName(map)))
}

fn read_source(file_path: &Path) -> anyhow::Result<String> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }
    Ok(std::fs::read_to_string(file_path)?)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)?;
    } else {
        serde_json::to_writer(&mut stdout, value)?;
    }
    writeln!(stdout)?;
    Ok(())
}
