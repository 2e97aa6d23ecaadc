//! delve - iterative web research agent CLI

mod config;
mod render;

use std::{
    io::{self, Write},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, bail};
use clap::{CommandFactory, Parser};
use delve_ai::{Model, Provider, models};
use delve_research::{
    ProviderReasoner, ReasonerOptions, ResearchAgent, ResearchConfig, RetryConfig, RetryingLookup,
    RetryingReasoner, SearchDepth, SearchOptions, TavilyLookup,
};
use tokio::sync::broadcast::error::RecvError;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// delve - research any topic on the web and get a cited report
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The research topic or question
    query: Option<String>,

    /// Prompt for topics until quit/exit/q
    #[arg(short, long)]
    interactive: bool,

    /// Model to use (default: gpt-4o-mini)
    #[arg(short, long)]
    model: Option<String>,

    /// Provider (openai, anthropic, groq, openrouter, ollama)
    #[arg(short, long)]
    provider: Option<String>,

    /// Maximum research iterations (default: 5)
    #[arg(short = 'n', long)]
    max_iterations: Option<u32>,

    /// Results requested per search (default: 5)
    #[arg(long)]
    max_results: Option<usize>,

    /// Search depth: basic or advanced (default: advanced)
    #[arg(long)]
    search_depth: Option<String>,

    /// Passes before the agent may decide it has enough
    #[arg(long)]
    min_iterations: Option<u32>,

    /// Drop repeated urls from the gathered sources
    #[arg(long)]
    dedup_sources: bool,

    /// Print the session outcome as JSON
    #[arg(long)]
    json: bool,

    /// Show each research step as it happens
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

/// Everything a session needs, after merging flags, config and defaults
struct Settings {
    model: Model,
    research: ResearchConfig,
    search: SearchOptions,
    temperature: f32,
    retry: RetryConfig,
}

impl Settings {
    fn resolve(args: &Args, cfg: &config::Config) -> anyhow::Result<Self> {
        let provider = args.provider.as_deref().or(cfg.provider.as_deref());
        let model_id = args
            .model
            .as_deref()
            .or(cfg.model.as_deref())
            .unwrap_or(DEFAULT_MODEL);
        let model = resolve_model(provider, model_id);

        let depth = match args.search_depth.as_ref().or(cfg.search_depth.as_ref()) {
            Some(s) => SearchDepth::parse(s)
                .with_context(|| format!("unknown search depth {:?} (basic, advanced)", s))?,
            None => SearchDepth::default(),
        };
        let search = SearchOptions {
            max_results: args
                .max_results
                .or(cfg.max_results)
                .unwrap_or(SearchOptions::default().max_results),
            depth,
        };
        if search.max_results == 0 {
            bail!("--max-results must be at least 1");
        }

        let defaults = ResearchConfig::default();
        let research = ResearchConfig {
            max_iterations: args
                .max_iterations
                .or(cfg.max_iterations)
                .unwrap_or(defaults.max_iterations),
            min_iterations: args
                .min_iterations
                .or(cfg.min_iterations)
                .unwrap_or(defaults.min_iterations),
            dedup_sources: args.dedup_sources || cfg.dedup_sources.unwrap_or(false),
            cache_lookups: cfg.cache_lookups.unwrap_or(false),
            ..defaults
        }
        .validate()?;

        let retry = RetryConfig {
            max_retries: cfg.max_retries.unwrap_or(RetryConfig::default().max_retries),
            ..Default::default()
        };

        Ok(Self {
            model,
            research,
            search,
            temperature: cfg.temperature.unwrap_or(ReasonerOptions::default().temperature),
            retry,
        })
    }
}

/// With an explicit provider the model is resolved against it; otherwise the
/// registry picks the provider, falling back to OpenAI for unknown ids.
fn resolve_model(provider: Option<&str>, model_id: &str) -> Model {
    match provider {
        Some(provider) => models::resolve(Provider::parse(provider), model_id),
        None => models::get_model_by_id(model_id)
            .unwrap_or_else(|| models::resolve(Provider::OpenAI, model_id)),
    }
}

type SessionReasoner = RetryingReasoner<ProviderReasoner>;

/// Wire the session collaborators. Exits when an API key is missing.
fn build_agent(
    settings: &Settings,
    cfg: &config::Config,
) -> anyhow::Result<(ResearchAgent, Arc<SessionReasoner>)> {
    let provider = settings.model.provider;
    let api_key = match cfg.get_api_key(provider.id()) {
        Some(key) => key,
        // Local servers take any bearer token
        None if provider.api_key_env_var().is_none() => String::new(),
        None => {
            let var = provider.api_key_env_var().unwrap_or("OPENAI_API_KEY");
            eprintln!("Error: No API key found for {}", provider.name());
            eprintln!("Set it with: export {}=your-key", var);
            eprintln!("Or put it in a .env file, or in the config file: delve --init-config");
            std::process::exit(1);
        }
    };
    let Some(search_key) = cfg.get_search_key() else {
        eprintln!("Error: TAVILY_API_KEY not found");
        eprintln!("Set it with: export TAVILY_API_KEY=your-key");
        eprintln!("Or put it in a .env file, or in the config file: delve --init-config");
        std::process::exit(1);
    };

    let reasoner = ProviderReasoner::new(settings.model.clone(), api_key).with_options(
        ReasonerOptions {
            temperature: settings.temperature,
            max_tokens: None,
        },
    );
    let reasoner = Arc::new(RetryingReasoner::new(reasoner, settings.retry.clone()));
    let tavily = TavilyLookup::new(search_key, settings.search.clone())
        .context("failed to build the search client")?;
    let lookup = Arc::new(RetryingLookup::new(tavily, settings.retry.clone()));

    let agent = ResearchAgent::new(settings.research.clone(), reasoner.clone(), lookup);
    Ok((agent, reasoner))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("delve_research=debug,delve_ai=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    init_tracing(args.verbose);

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    if !args.interactive && args.query.as_deref().is_none_or(|q| q.trim().is_empty()) {
        Args::command().print_help()?;
        return Ok(());
    }

    let cfg = config::Config::load();
    let settings = Settings::resolve(&args, &cfg)?;
    let (agent, reasoner) = build_agent(&settings, &cfg)?;

    if args.interactive {
        return run_interactive(&agent, &reasoner, &settings, &args).await;
    }

    let topic = args.query.as_deref().unwrap_or_default();
    if !args.json {
        println!(
            "{}",
            render::header(
                topic,
                &settings.model.id,
                settings.research.max_iterations,
                args.verbose
            )
        );
    }
    run_once(&agent, &reasoner, topic, &args).await
}

/// Run one session and print its outcome
async fn run_once(
    agent: &ResearchAgent,
    reasoner: &SessionReasoner,
    topic: &str,
    args: &Args,
) -> anyhow::Result<()> {
    let printer = if args.verbose && !args.json {
        Some(spawn_event_printer(agent))
    } else {
        if !args.json {
            println!("Researching... This may take a minute or two.\n");
        }
        None
    };

    let result = agent.run(topic).await;

    if let Some(mut handle) = printer {
        // The printer exits on the terminal event; don't wait forever if none came
        if tokio::time::timeout(Duration::from_secs(1), &mut handle)
            .await
            .is_err()
        {
            handle.abort();
        }
    }

    let outcome = result.map_err(session_failure)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("{}", render::report(&outcome.report));
    println!(
        "{}",
        render::stats(outcome.iterations_used, outcome.sources.len())
    );
    let usage = reasoner.inner().total_usage();
    if usage.input > 0 || usage.output > 0 {
        println!("[Tokens: {} in, {} out]", usage.input, usage.output);
    }
    Ok(())
}

fn session_failure(e: delve_research::Error) -> anyhow::Error {
    let what = if e.is_context_overflow() {
        "research prompt outgrew the model's context window; \
         try a lower --max-iterations or --max-results"
    } else {
        "research session failed"
    };
    anyhow::Error::new(e).context(what)
}

fn spawn_event_printer(agent: &ResearchAgent) -> tokio::task::JoinHandle<()> {
    let mut receiver = agent.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Some(text) = render::event(&event) {
                        println!("{}", text);
                    }
                    if event.is_terminal() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event printer skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn is_quit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q")
}

async fn run_interactive(
    agent: &ResearchAgent,
    reasoner: &SessionReasoner,
    settings: &Settings,
    args: &Args,
) -> anyhow::Result<()> {
    println!(
        "{}",
        render::interactive_header(
            &settings.model.id,
            settings.research.max_iterations,
            args.verbose
        )
    );

    loop {
        print!("\nEnter your research topic: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            println!();
            break;
        }

        let topic = input.trim();
        if topic.is_empty() {
            continue;
        }
        if is_quit(topic) {
            println!("Goodbye!");
            break;
        }

        if let Err(e) = run_once(agent, reasoner, topic, args).await {
            eprintln!("Error: {:#}", e);
        }
    }

    Ok(())
}
