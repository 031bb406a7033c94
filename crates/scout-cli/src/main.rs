use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::SystemTime;

use clap::{Args, Parser, Subcommand};
use scout_core::clock::SystemClock;
use scout_core::config::ScoutConfig;
use scout_core::models::{
    SearchCriterion, SearchError, SearchField, SearchOperator, SearchQuery, SortOrder,
};
use scout_core::orchestration::SearchSession;
use scout_core::transport::{HttpSearchTransport, MockSearchTransport, SearchTransport};
use tracing_subscriber::EnvFilter;

mod render;

const EXIT_FAILURE: u8 = 1;
const EXIT_RATE_LIMITED: u8 = 2;
const EXIT_TIMEOUT: u8 = 3;

/// Used when `RUST_LOG` is unset. The binary logs under `scout`.
const DEFAULT_LOG_FILTER: &str = "scout=info,scout_core=info";

#[derive(Parser)]
#[command(name = "scout", version, about = "Search candidate profiles through the Scout backend")]
struct Cli {
    /// TOML configuration file. SCOUT_* environment variables take precedence.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a search and print the matching candidates
    Search(SearchArgs),
    /// Fetch the full profile behind a search result
    Profile {
        /// Profile id as shown in search results (`linkedin_id`)
        id: String,
    },
    /// Print the effective configuration with secrets masked
    Config,
}

#[derive(Args)]
struct SearchArgs {
    /// Criterion as field:operator:value, e.g. title:starts_with:Senior
    #[arg(long = "criterion", value_name = "FIELD:OP:VALUE", value_parser = parse_criterion)]
    criteria: Vec<SearchCriterion>,

    #[arg(long)]
    keywords: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    company: Option<String>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    industry: Option<String>,

    #[arg(long, default_value_t = 100)]
    max_results: u32,

    #[arg(long, default_value = "relevance_score")]
    sort_by: String,

    #[arg(long, default_value = "desc", value_parser = parse_sort_order)]
    sort_order: SortOrder,

    /// Serve results from built-in fixtures instead of the backend
    #[arg(long)]
    mock: bool,

    /// Print the raw response as JSON
    #[arg(long)]
    json: bool,
}

impl SearchArgs {
    fn query(&self) -> SearchQuery {
        let shorthand = [
            (SearchField::Keywords, &self.keywords),
            (SearchField::Title, &self.title),
            (SearchField::Company, &self.company),
            (SearchField::Location, &self.location),
            (SearchField::Industry, &self.industry),
        ];

        let mut query = SearchQuery::new()
            .max_results(self.max_results)
            .sort(self.sort_by.as_str(), self.sort_order);
        query.criteria = self.criteria.clone();
        for (field, value) in shorthand {
            if let Some(value) = value {
                query = query.criterion(field, SearchOperator::Contains, value.as_str());
            }
        }
        query
    }
}

fn parse_criterion(raw: &str) -> Result<SearchCriterion, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(field), Some(operator), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err("expected FIELD:OPERATOR:VALUE".to_string());
    };

    let field = field.parse::<SearchField>().map_err(|()| {
        let known: Vec<&str> = SearchField::ALL.iter().map(|field| field.as_str()).collect();
        format!("unknown field '{field}' (expected one of {})", known.join(", "))
    })?;
    let operator = operator.parse::<SearchOperator>().map_err(|()| {
        format!(
            "unknown operator '{operator}' \
             (expected contains, equals, starts_with or ends_with)"
        )
    })?;

    Ok(SearchCriterion::new(field, operator, value))
}

fn parse_sort_order(raw: &str) -> Result<SortOrder, String> {
    raw.parse()
        .map_err(|()| format!("unknown sort order '{raw}' (expected asc or desc)"))
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let config = match ScoutConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match cli.command {
        Command::Config => print_config(&config),
        Command::Profile { id } => print_profile(&config, &id),
        Command::Search(args) => run_search(&config, &args),
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_config(config: &ScoutConfig) -> ExitCode {
    match serde_json::to_string_pretty(&config.redacted()) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Failed to serialize configuration: {error}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn print_profile(config: &ScoutConfig, id: &str) -> ExitCode {
    let transport = HttpSearchTransport::from_config(&config.backend);
    let profile = match transport.get_profile(id) {
        Ok(profile) => profile,
        Err(error) => {
            tracing::error!(profile_id = id, status = error.status_code(), "profile fetch failed");
            eprintln!("Failed to fetch profile: {error}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match serde_json::to_string_pretty(&profile) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Failed to serialize profile: {error}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run_search(config: &ScoutConfig, args: &SearchArgs) -> ExitCode {
    let query = args.query();
    if query.normalized().criteria.is_empty() {
        eprintln!("At least one non-empty search criterion is required");
        return ExitCode::from(EXIT_FAILURE);
    }

    let transport: Arc<dyn SearchTransport> = if args.mock {
        tracing::debug!("using fixture transport");
        Arc::new(MockSearchTransport::new())
    } else {
        tracing::debug!(base_url = %config.backend.base_url, "using http transport");
        Arc::new(HttpSearchTransport::from_config(&config.backend))
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("Failed to create Tokio runtime: {error}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let orchestrator = Arc::new(config.orchestrator(transport, Arc::new(SystemClock)));
    let session = SearchSession::with_debounce(orchestrator, config.debounce());

    match runtime.block_on(session.submit(query)) {
        Ok(response) => {
            let output = if args.json {
                render::json(&response)
            } else {
                Ok(render::table(&response))
            };
            match output {
                Ok(text) => {
                    println!("{text}");
                    ExitCode::SUCCESS
                }
                Err(error) => {
                    eprintln!("Failed to serialize results: {error}");
                    ExitCode::from(EXIT_FAILURE)
                }
            }
        }
        Err(error) => {
            eprintln!("{error}");
            if let Some(window_start) = error.reset_time() {
                let reset_interval = session.orchestrator().rate_limiter().reset_interval();
                let wait = session.time_until_reset(SystemTime::now());
                eprintln!(
                    "Remaining quota: {}. Quota resets in {} (at {}).",
                    error.remaining_quota().unwrap_or(0),
                    render::countdown(wait),
                    render::timestamp(window_start + reset_interval)
                );
            }
            ExitCode::from(exit_code(&error))
        }
    }
}

fn exit_code(error: &SearchError) -> u8 {
    match error {
        SearchError::RateLimited { .. } => EXIT_RATE_LIMITED,
        SearchError::Timeout { .. } => EXIT_TIMEOUT,
        SearchError::Request { .. } | SearchError::Cancelled => EXIT_FAILURE,
    }
}
