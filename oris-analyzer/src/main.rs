//! oris-analyzer - command-line split analysis of ORIS results
//!
//! Every command prints its result as JSON on stdout; logs go to stderr or the configured file.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use oris_analyzer::analytics::{
    absolute_series, relative_series, runner_level_series, styled_table, LEVEL_GROUP_TITLES,
};
use oris_analyzer::catalog::parse_level_choice;
use oris_analyzer::export::build_report;
use oris_analyzer::models::{parse_filter_choice, ResultTable};
use oris_analyzer::selector::{select_graph_rows, select_rows};
use oris_analyzer::table::{project, TimeFamily};
use oris_analyzer::{
    CachedSource, EventContext, EventQuery, Limit, OrisClient, ResultsSource, Selection,
    TimelineMerger,
};
use oris_common::config::{LoggingConfig, TomlConfig};
use oris_common::time::current_season;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for oris-analyzer
#[derive(Parser, Debug)]
#[command(name = "oris-analyzer")]
#[command(about = "Split analysis of ORIS orienteering results")]
#[command(version)]
struct Cli {
    /// Config file (default: platform config dir, or ORIS_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// ORIS API base URL (overrides ORIS_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List events of a season
    Events {
        /// Season year (default: current year)
        #[arg(short, long)]
        season: Option<i32>,
        /// Substring of the event name
        #[arg(short, long)]
        name: Option<String>,
        /// Event level id or "id: label" choice, repeatable
        #[arg(short, long)]
        level: Vec<String>,
        /// Include all sports, not only foot orienteering
        #[arg(long)]
        all_sports: bool,
        /// Include unofficial events
        #[arg(long)]
        all_events: bool,
    },
    /// Show an event with its categories
    Event {
        event_id: String,
    },
    /// Standings table and graph series of one category
    Splits {
        #[command(flatten)]
        category: CategoryArgs,
        #[command(flatten)]
        view: ViewArgs,
        /// Time family of the table
        #[arg(long, default_value = "totals")]
        family: TimeFamily,
        /// Loss to the fastest selected competitor instead of absolute times
        #[arg(long)]
        relative: bool,
    },
    /// Season history of one competitor
    Runner {
        /// Registration number ("ABM8501")
        reg_no: String,
        /// Season year (default: current year)
        #[arg(short, long)]
        season: Option<i32>,
    },
    /// Print layout of one category
    Export {
        #[command(flatten)]
        category: CategoryArgs,
        #[command(flatten)]
        view: ViewArgs,
        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Category addressed by event and name, or directly by class id
#[derive(Args, Debug)]
struct CategoryArgs {
    /// Event id
    #[arg(short, long, requires = "category")]
    event: Option<String>,
    /// Category name within the event ("H21")
    #[arg(long)]
    category: Option<String>,
    /// Category (class) id
    #[arg(long, conflicts_with_all = ["event", "category"], required_unless_present = "event")]
    class_id: Option<String>,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Runner limit: "none", "crop" or a count
    #[arg(short, long, default_value = "none")]
    limit: Limit,
    /// Registration number or "RegNo: Name" choice to compare, repeatable
    #[arg(short, long)]
    filter: Vec<String>,
}

impl ViewArgs {
    fn selection(&self) -> Selection {
        Selection::new(
            self.limit,
            self.filter
                .iter()
                .map(|choice| parse_filter_choice(choice).to_uppercase()),
        )
    }
}

/// Category loaded for a view
struct LoadedCategory {
    context: Option<EventContext>,
    label: String,
    table: ResultTable,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", error_message(&e));
            ExitCode::FAILURE
        }
    }
}

/// Error text for the user; analyzer errors use their user-facing wording
fn error_message(error: &anyhow::Error) -> String {
    let mut chain = error.chain();
    let outermost = chain.next();
    if let Some(cause) = outermost.and_then(|c| c.downcast_ref::<oris_common::Error>()) {
        return cause.user_message();
    }
    match chain.find_map(|c| c.downcast_ref::<oris_common::Error>()) {
        Some(cause) => format!("{}: {}", error, cause.user_message()),
        None => format!("{:#}", error),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (config, origin) =
        TomlConfig::resolve_with_origin(cli.config.as_deref(), cli.api_url.as_deref())
            .context("Failed to load configuration")?;
    init_tracing(&config.logging)?;
    origin.log();

    info!(
        "Starting oris-analyzer v{} against {}",
        env!("CARGO_PKG_VERSION"),
        config.oris.base_url
    );

    let client = OrisClient::new(&config.oris).context("Failed to create ORIS client")?;
    let source = CachedSource::new(client);

    match cli.command {
        Command::Events {
            season,
            name,
            level,
            all_sports,
            all_events,
        } => {
            let query = EventQuery {
                name_mask: name,
                levels: level
                    .iter()
                    .map(|l| parse_level_choice(l))
                    .collect::<oris_common::Result<_>>()?,
                all_sports,
                all_events,
                ..season.map_or_else(EventQuery::current, EventQuery::season)
            };
            let events = source
                .fetch_event_catalog(&query)
                .await
                .with_context(|| format!("Failed to list events of season {}", query.season))?;
            print_json(&events)?;
        }
        Command::Event { event_id } => {
            let context = EventContext::load(&source, &event_id)
                .await
                .with_context(|| format!("Failed to load event {}", event_id))?;
            print_json(&json!({
                "info": context.detail.info_lines(),
                "event": context.detail,
                "categories": context.categories(),
            }))?;
        }
        Command::Splits {
            category,
            view,
            family,
            relative,
        } => {
            let loaded = load_category(&source, &category).await?;
            let selection = view.selection();
            let projection = project(&loaded.table, family);
            let series_rows = select_graph_rows(&loaded.table, &selection);
            let totals = project(&loaded.table, TimeFamily::Totals);
            let series = if relative {
                relative_series(&totals, &series_rows)?
            } else {
                absolute_series(&totals, &series_rows)
            };

            print_json(&json!({
                "category": loaded.label,
                "runners": loaded.table.runner_choices(),
                "table": styled_table(&projection, &select_rows(&loaded.table, &selection)),
                "series": series,
            }))?;
        }
        Command::Runner { reg_no, season } => {
            let season = season.unwrap_or_else(current_season);
            let merger = TimelineMerger::new(source, config.oris.concurrency);
            let timeline = merger
                .timeline(&reg_no, season)
                .await
                .with_context(|| format!("Failed to build timeline of {}", reg_no))?;

            let levels: Vec<_> = LEVEL_GROUP_TITLES
                .iter()
                .enumerate()
                .filter_map(|(group, title)| {
                    runner_level_series(&timeline, group)
                        .map(|series| json!({ "title": title, "series": series }))
                })
                .collect();

            print_json(&json!({
                "info": timeline.info_lines(),
                "timeline": timeline,
                "levels": levels,
            }))?;
        }
        Command::Export {
            category,
            view,
            output,
        } => {
            let loaded = load_category(&source, &category).await?;
            let report = build_report(
                &loaded.table,
                &view.selection(),
                loaded.context.as_ref(),
                &loaded.label,
            )?;
            match output {
                Some(path) => {
                    let content = serde_json::to_string_pretty(&report)?;
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Report written to {}", path.display());
                }
                None => print_json(&report)?,
            }
        }
    }

    Ok(())
}

/// Resolve the category arguments and fetch its split table
async fn load_category<S: ResultsSource>(
    source: &S,
    args: &CategoryArgs,
) -> Result<LoadedCategory> {
    let (context, label, class_id) = match (&args.event, &args.category, &args.class_id) {
        (Some(event_id), Some(name), _) => {
            let context = EventContext::load(source, event_id)
                .await
                .with_context(|| format!("Failed to load event {}", event_id))?;
            let class_id = context.resolve_category_id(name)?.to_string();
            (Some(context), format!("Kategorie: {}", name.to_uppercase()), class_id)
        }
        (_, _, Some(class_id)) => (None, String::new(), class_id.clone()),
        _ => anyhow::bail!("Either --event with --category, or --class-id is required"),
    };

    let table = source
        .fetch_splits(&class_id)
        .await
        .with_context(|| format!("Failed to load splits of class {}", class_id))?;

    Ok(LoadedCategory {
        context,
        label,
        table,
    })
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("oris_analyzer={0},oris_common={0}", logging.level))
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };
    let stderr_layer = logging
        .file
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
