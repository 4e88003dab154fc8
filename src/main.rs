//! devkg CLI: developer knowledge graph builder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use devkg::config::{DevkgConfig, LinkMode};
use devkg::extract::memo::TripleMemo;
use devkg::extract::validate::{Verdict, classify_entity};
use devkg::extract::{TripleExtractor, normalize_entity};
use devkg::graph::DevKgGraph;
use devkg::link::{
    AgenticResolver, AliasTable, DEFAULT_CONTEXT, EntityCache, EntityLinker, EntitySearch,
    HeuristicResolver, LinkReport, LinkStatus, Resolver, WikidataClient, snapshot_report,
};
use devkg::llm::{LlmProvider, build_provider};
use devkg::paths::DevkgPaths;
use devkg::pipeline::{Pipeline, load_sessions};

#[derive(Parser)]
#[command(name = "devkg", version, about = "Developer knowledge graph builder")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/devkg/devkg.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the entity cache and triple memo.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a session graph from parsed conversations, extracting triples.
    Extract {
        /// Session files (JSON array or JSON lines).
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output Turtle file.
        #[arg(long)]
        output: PathBuf,

        /// Record sessions and messages only; no LLM calls.
        #[arg(long)]
        no_extract: bool,

        /// Ignore the triple memo and query the LLM for every message.
        #[arg(long)]
        no_memo: bool,

        /// Override the configured provider (ollama, openai, anthropic, gemini).
        #[arg(long)]
        provider: Option<String>,

        /// Override the provider's model.
        #[arg(long)]
        model: Option<String>,
    },

    /// Link entity labels to Wikidata and write the links graph.
    Link {
        /// Turtle files to collect `devkg:Entity` labels from.
        #[arg(long, num_args = 1.., required_unless_present = "labels")]
        input: Vec<PathBuf>,

        /// Plain-text file with one label per line.
        #[arg(long)]
        labels: Option<PathBuf>,

        /// Output Turtle file.
        #[arg(long)]
        output: PathBuf,

        /// Resolution strategy (default from config).
        #[arg(long, value_enum)]
        mode: Option<LinkMode>,

        /// Minimum confidence for a link.
        #[arg(long)]
        threshold: Option<f64>,

        /// Maximum concurrently resolved labels.
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Print the report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Write a links graph from the cache alone, without resolving anything.
    ///
    /// Safe to run while a `link` process is still writing the cache.
    Snapshot {
        /// Turtle files to collect `devkg:Entity` labels from.
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output Turtle file.
        #[arg(long)]
        output: PathBuf,
    },

    /// Run labels through the entity validator.
    Validate {
        /// Labels to classify.
        labels: Vec<String>,

        /// Also show the normalized form that extraction would store.
        #[arg(long)]
        normalized: bool,
    },

    /// Inspect the entity cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Entry counts.
    Stats,
    /// Look up one label.
    Get { label: String },
    /// List entries in key order.
    List {
        /// Maximum entries to print.
        #[arg(long, default_value = "50")]
        limit: usize,
    },
}

struct Settings {
    paths: DevkgPaths,
    config: DevkgConfig,
    env: HashMap<String, String>,
    cache_dir: Option<PathBuf>,
}

impl Settings {
    fn load(cli: &Cli) -> Result<Self> {
        let paths = DevkgPaths::resolve()?;
        let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
        let config = match &cli.config {
            Some(path) => DevkgConfig::load(path)?,
            None => DevkgConfig::load_or_default(&config_path)?,
        };
        Ok(Self {
            paths,
            config,
            env: std::env::vars().collect(),
            cache_dir: cli.cache_dir.clone(),
        })
    }

    fn entity_cache_dir(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.join("entities"),
            None => self.paths.entity_cache_dir(),
        }
    }

    fn triple_memo_dir(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.join("triples"),
            None => self.paths.triple_memo_dir(),
        }
    }

    fn aliases(&self) -> Result<AliasTable> {
        let path = self
            .config
            .linking
            .aliases_path(&self.paths.config_dir)
            .unwrap_or_else(|| self.paths.aliases_file());
        Ok(AliasTable::load(&path)?)
    }

    fn provider(&self) -> Result<Box<dyn LlmProvider>> {
        let provider_config = self.config.provider.resolve(&self.env)?;
        Ok(build_provider(&provider_config)?)
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli)?;

    match cli.command {
        Commands::Extract {
            input,
            output,
            no_extract,
            no_memo,
            provider,
            model,
        } => {
            if provider.is_some() {
                settings.config.provider.kind = provider;
            }
            if model.is_some() {
                settings.config.provider.model = model;
            }

            let mut sessions = Vec::new();
            for path in &input {
                sessions.extend(load_sessions(path)?);
            }

            let graph = DevKgGraph::new()?;
            let summary = if no_extract {
                Pipeline::new(&graph).process_sessions(&sessions)?
            } else {
                let provider = settings.provider()?;
                let extractor =
                    TripleExtractor::with_config(&provider, settings.config.extraction.clone());
                let memo = if no_memo {
                    None
                } else {
                    Some(TripleMemo::open(&settings.triple_memo_dir())?)
                };
                let mut pipeline = Pipeline::new(&graph).with_extractor(&extractor);
                if let Some(memo) = &memo {
                    pipeline = pipeline.with_memo(memo);
                }
                pipeline.process_sessions(&sessions)?
            };
            graph.write_turtle(&output)?;

            println!(
                "Sessions: {}  messages: {}  triples: {}",
                summary.sessions, summary.messages, summary.triples
            );
            if !no_extract {
                println!("{}", summary.stats);
            }
            println!("Output: {}", output.display());
        }

        Commands::Link {
            input,
            labels,
            output,
            mode,
            threshold,
            max_parallel,
            json,
        } => {
            let mut raw = match &labels {
                Some(path) => read_label_file(path)?,
                None => Vec::new(),
            };
            if !input.is_empty() {
                raw.extend(DevKgGraph::collect_entity_labels(&input)?);
            }
            if raw.is_empty() {
                miette::bail!("no entity labels found in the given inputs");
            }

            let mut linker_config = settings.config.linking.linker_config();
            if let Some(t) = threshold {
                linker_config.confidence_threshold = t;
            }
            if let Some(n) = max_parallel {
                linker_config.max_parallel = n.max(1);
            }
            let mode = mode.unwrap_or(settings.config.linking.mode);

            let search: Arc<dyn EntitySearch> =
                Arc::new(WikidataClient::new(settings.config.linking.wikidata_config()));
            let resolver: Box<dyn Resolver> = match mode {
                LinkMode::Heuristic => Box::new(HeuristicResolver::new(search)),
                LinkMode::Agentic => {
                    let llm: Arc<dyn LlmProvider> = Arc::from(settings.provider()?);
                    Box::new(AgenticResolver::new(llm, search))
                }
            };

            let cache = EntityCache::open(&settings.entity_cache_dir())?;
            let linker = EntityLinker::new(cache, resolver, settings.aliases()?, linker_config);
            let report = linker.link_batch(&raw, DEFAULT_CONTEXT)?;

            let graph = DevKgGraph::new()?;
            graph.add_link_report(&report)?;
            graph.write_turtle(&output)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                print_report(&report);
                println!("Output: {}", output.display());
            }
        }

        Commands::Snapshot { input, output } => {
            let raw = DevKgGraph::collect_entity_labels(&input)?;
            let cache = EntityCache::open_snapshot(&settings.entity_cache_dir())?;
            let report = snapshot_report(
                &cache,
                &settings.aliases()?,
                &raw,
                settings.config.linking.confidence_threshold,
            );

            let graph = DevKgGraph::new()?;
            for label in &report.pending {
                graph.add_entity(label)?;
            }
            let linked = graph.add_link_report(&report)?;
            graph.write_turtle(&output)?;

            let total = report.results.len() + report.pending.len();
            println!("Entities: {total}");
            println!("In cache: {}", report.results.len());
            println!("Not yet cached: {}", report.pending.len());
            println!("Rejected: {}", report.rejected.len());
            println!("Linked: {linked}");
            println!("Deduplicated: {}", report.same_as.len());
            println!("Output: {}", output.display());
        }

        Commands::Validate { labels, normalized } => {
            for label in &labels {
                let verdict = classify_entity(label);
                let shown = match verdict {
                    Verdict::Accepted => "accepted".to_string(),
                    Verdict::Whitelisted => "accepted (whitelisted)".to_string(),
                    Verdict::Rejected(why) => format!("rejected: {why}"),
                };
                if normalized {
                    println!("{label:<30} {:<30} {shown}", normalize_entity(label));
                } else {
                    println!("{label:<30} {shown}");
                }
            }
        }

        Commands::Cache { action } => {
            let cache = EntityCache::open_snapshot(&settings.entity_cache_dir())?;
            match action {
                CacheAction::Stats => {
                    let entries = cache.entries()?;
                    let misses = entries.iter().filter(|(_, e)| e.is_known_miss()).count();
                    let confident = entries
                        .iter()
                        .filter(|(_, e)| {
                            !e.is_known_miss()
                                && e.confidence >= settings.config.linking.confidence_threshold
                        })
                        .count();
                    println!("Entries:      {}", entries.len());
                    println!("Linked:       {confident}");
                    println!("Low conf.:    {}", entries.len() - misses - confident);
                    println!("Known misses: {misses}");
                }
                CacheAction::Get { label } => match cache.get(&label)? {
                    Some(entry) => {
                        println!("label:        {}", label.trim().to_lowercase());
                        println!("id:           {}", entry.external_id.as_deref().unwrap_or("-"));
                        println!("confidence:   {:.2}", entry.confidence);
                        println!("description:  {}", entry.description.as_deref().unwrap_or("-"));
                        println!("last queried: {}", entry.last_queried);
                    }
                    None => println!("\"{label}\" is not cached."),
                },
                CacheAction::List { limit } => {
                    for (label, entry) in cache.entries()?.into_iter().take(limit) {
                        println!(
                            "{label:<30} {:<12} {:.2}",
                            entry.external_id.as_deref().unwrap_or("-"),
                            entry.confidence
                        );
                    }
                }
            }
        }

        Commands::Config => {
            print!("{}", settings.config.to_toml()?);
        }
    }

    Ok(())
}

fn read_label_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn print_report(report: &LinkReport) {
    for result in &report.results {
        match &result.status {
            LinkStatus::Linked => println!(
                "  [linked]   {} -> {} ({:.2}){}",
                result.label,
                result.external_id.as_deref().unwrap_or("-"),
                result.confidence,
                if result.cached { " [cached]" } else { "" }
            ),
            LinkStatus::LowConfidence { candidate } => println!(
                "  [low-conf] {} -> {candidate} ({:.2}), skipped",
                result.label, result.confidence
            ),
            LinkStatus::NotFound => println!("  [none]     {}", result.label),
            LinkStatus::Failed { message } => println!("  [error]    {}: {message}", result.label),
        }
    }
    for edge in &report.same_as {
        println!("  [same-as]  {} = {} ({})", edge.from, edge.to, edge.external_id);
    }
    println!("{}", report.stats);
}
