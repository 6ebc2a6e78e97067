//! CLI entry point for `mailscope`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};

use mailscope::config::Config;
use mailscope::index::memory::MemoryIndex;
use mailscope::labels::http::HttpLabelResolver;
use mailscope::labels::snapshot::LabelSnapshot;
use mailscope::labels::{LabelResolver, UnconfiguredResolver};
use mailscope::model::hit::RankedResult;
use mailscope::search::filter::{parse_query, ContentField, SearchFilter, SystemLabel};
use mailscope::search::sort::SortOrder;
use mailscope::search::{MailSearch, SearchOptions, SearchOutcome};

#[derive(Parser)]
#[command(name = "mailscope", version, about = "Compound mailbox search over a local index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Search messages
    Search(SearchArgs),
    /// Show or initialize the configuration file
    Config {
        /// Write the default configuration if no file exists yet
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Free text; may also carry inline filters such as `from:` or `in:spam`
    #[arg(value_name = "QUERY", default_value = "")]
    query: String,

    /// JSON document file backing the local index
    #[arg(long, env = "MAILSCOPE_INDEX")]
    index: Option<PathBuf>,

    /// Sender address filter
    #[arg(long, value_name = "ADDRESS")]
    from: Option<String>,

    /// Recipient address filter (to, cc, bcc)
    #[arg(long, value_name = "ADDRESS")]
    to: Option<String>,

    /// Search the free text in the subject only
    #[arg(long)]
    in_subject: bool,

    /// Search the free text in the body only
    #[arg(long)]
    in_body: bool,

    /// Only items created in the last N days
    #[arg(long, value_name = "DAYS")]
    within_days: Option<u32>,

    /// System label filter (repeatable)
    #[arg(long = "system-label", value_enum, value_name = "LABEL")]
    system_labels: Vec<SystemLabel>,

    /// User folder or label id filter (repeatable)
    #[arg(long = "label", value_name = "ID")]
    labels: Vec<String>,

    /// Result order
    #[arg(long, value_enum)]
    sort: Option<SortOrder>,

    /// Treat the last term as a prefix
    #[arg(long)]
    autosuggest: bool,

    /// Label snapshot file to check label filters against
    #[arg(long, value_name = "FILE")]
    labels_snapshot: Option<PathBuf>,

    /// Label backend base URL
    #[arg(long, value_name = "URL")]
    labels_endpoint: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

impl SearchArgs {
    /// Inline filters from the query followed by the flag filters.
    fn filters(&self) -> (String, Vec<SearchFilter>) {
        let parsed = parse_query(&self.query);
        let mut filters = parsed.filters;

        if let Some(addr) = &self.from {
            filters.push(SearchFilter::sender(addr.as_str()));
        }
        if let Some(addr) = &self.to {
            filters.push(SearchFilter::recipient(addr.as_str()));
        }
        if self.in_subject {
            filters.push(SearchFilter::ContentField {
                field: ContentField::Subject,
            });
        }
        if self.in_body {
            filters.push(SearchFilter::ContentField {
                field: ContentField::Body,
            });
        }
        if let Some(days_ago) = self.within_days {
            filters.push(SearchFilter::DateRange { days_ago });
        }
        filters.extend(
            self.system_labels
                .iter()
                .map(|&label| SearchFilter::SystemLabel { label }),
        );
        filters.extend(self.labels.iter().map(|id| SearchFilter::UserLabel {
            label_id: id.clone(),
        }));

        (parsed.free_text, filters)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mailscope::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Search(args) => cmd_search(&args, &config).await,
        Commands::Config { init } => cmd_config(&config, init),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mailscope::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailscope.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Run one compound search and print the results.
async fn cmd_search(args: &SearchArgs, config: &Config) -> anyhow::Result<()> {
    let index_path = args
        .index
        .clone()
        .or_else(|| config.index.path.clone())
        .ok_or_else(|| anyhow::anyhow!("No index given (use --index or [index] path)"))?;
    if !index_path.exists() {
        anyhow::bail!("Index file not found: {}", index_path.display());
    }

    let index = MemoryIndex::load(&index_path)?;
    let labels = label_resolver(args, config)?;

    let mut options = SearchOptions::from(&config.search);
    options.autosuggest |= args.autosuggest;

    let search = MailSearch::new(Arc::new(index), labels, options);
    let (free_text, filters) = args.filters();
    let order = args.sort.unwrap_or(config.search.default_sort);

    let outcome = search.resolve(&free_text, &filters, order).await;

    if args.json {
        print_outcome_json(&outcome)?;
    } else {
        print_outcome_table(&outcome);
    }
    Ok(())
}

/// Pick the label backend: command line first, then config, else none.
fn label_resolver(args: &SearchArgs, config: &Config) -> anyhow::Result<Arc<dyn LabelResolver>> {
    if let Some(path) = args.labels_snapshot.as_ref().or(config.labels.snapshot.as_ref()) {
        return Ok(Arc::new(LabelSnapshot::load(path)?));
    }

    if let Some(endpoint) = args.labels_endpoint.as_ref().or(config.labels.endpoint.as_ref()) {
        let mut resolver =
            HttpLabelResolver::new(endpoint, Duration::from_secs(config.labels.timeout_secs))?;
        if let Some(token) = &config.labels.api_token {
            resolver = resolver.with_api_token(token);
        }
        return Ok(Arc::new(resolver));
    }

    Ok(Arc::new(UnconfiguredResolver))
}

/// Show the config path and effective configuration, or write defaults.
fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    let path = mailscope::config::config_file_path();

    if init {
        if let Some(existing) = path.as_deref().filter(|p| p.exists()) {
            anyhow::bail!("Config already exists: {}", existing.display());
        }
        let written = mailscope::config::save_config(&Config::default())?;
        println!("  Wrote default config to {}", written.display());
        return Ok(());
    }

    match path.as_deref() {
        Some(p) => println!("# {}", describe_path(p)),
        None => println!("# no config directory on this system"),
    }
    println!("# log file: {}", mailscope::config::log_file_path(config).display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn describe_path(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not present, using defaults)", path.display())
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailscope", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print results in a human-readable table.
fn print_outcome_table(outcome: &SearchOutcome) {
    let results = match outcome {
        SearchOutcome::NotPerformed => {
            println!();
            println!("  No search performed (enter text or fill in a field filter)");
            println!();
            return;
        }
        SearchOutcome::Results(results) => results,
    };

    println!();
    println!("  {} result(s)", results.len());
    println!();

    if results.is_empty() {
        return;
    }

    println!(
        "  {:<4} {:<17} {:<20} {:<20} {:>6}  {}",
        "#", "Date", "Id", "Thread", "Score", "Matches"
    );
    println!("  {}", "-".repeat(98));

    for (i, result) in results.iter().enumerate() {
        let date = result.created_at.format("%Y-%m-%d %H:%M").to_string();
        let id: String = result.id.chars().take(19).collect();
        let thread: String = result.thread_id.chars().take(19).collect();

        println!(
            "  {:<4} {:<17} {:<20} {:<20} {:>6.3}  {}",
            i + 1,
            date,
            id,
            thread,
            result.score,
            describe_matches(result)
        );
    }
    println!();
}

/// `term(field,field) term(field)`.
fn describe_matches(result: &RankedResult) -> String {
    result
        .match_info
        .iter()
        .map(|(term, fields)| {
            let fields: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
            format!("{term}({})", fields.join(","))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print results as JSON.
fn print_outcome_json(outcome: &SearchOutcome) -> anyhow::Result<()> {
    let output = match outcome {
        SearchOutcome::NotPerformed => serde_json::json!({ "performed": false }),
        SearchOutcome::Results(results) => serde_json::json!({
            "performed": true,
            "result_count": results.len(),
            "results": results,
        }),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
