//! # taskrun CLI
//!
//! Command-line interface for running the taskrun agent.
//!
//! Usage:
//!   taskrun <task>
//!   taskrun --provider anthropic <task>
//!   taskrun rules
//!   taskrun schema
//!
//! Examples:
//!   taskrun "Read Cargo.toml and list the dependencies"
//!   taskrun -y "Count the lines of Rust code in src"
//!   taskrun --provider anthropic --model claude-3-5-haiku-20241022 "What is in this directory?"
//!
//! API keys come from OPENAI_API_KEY / ANTHROPIC_API_KEY.

use clap::{Parser, Subcommand, ValueEnum};
use taskrun_agent::{Agent, AgentConfig, TaskOutcome};
use taskrun_core::policy::PolicyStore;
use taskrun_core::prompt::PolicyGate;
use taskrun_core::provider::{AnthropicProvider, LlmProvider, OpenAIProvider, ProviderConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default location of the persisted approval rules
const DEFAULT_POLICY_PATH: &str = ".taskrun/policy.json";

#[derive(Parser)]
#[command(name = "taskrun")]
#[command(author, version, about = "taskrun - approval-gated command-line agent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Task to execute (when not using subcommands)
    #[arg(trailing_var_arg = true)]
    task: Vec<String>,

    /// LLM provider to use
    #[arg(short, long, global = true, value_enum, default_value = "openai")]
    provider: Provider,

    /// Model override (defaults to the provider's default)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Path to the persisted approval rules
    #[arg(long, global = true, default_value = DEFAULT_POLICY_PATH)]
    policy_file: String,

    /// Approve every command without prompting (this session only)
    #[arg(short = 'y', long, global = true)]
    always_allow: bool,

    /// Maximum loop iterations before giving up
    #[arg(long, global = true, default_value = "12")]
    max_iterations: usize,

    /// Enable verbose output (show token usage)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only show the final answer
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task
    Run {
        /// The task description
        #[arg(trailing_var_arg = true, required = true)]
        task: Vec<String>,
    },
    /// Show the stored approval rules, in match order
    Rules,
    /// Show the actions the model may emit
    Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Provider {
    Openai,
    Anthropic,
}

/// Initialize tracing for development logging.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset. Output: stderr, compact.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn env_api_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|key| !key.is_empty())
}

async fn run_task(cli: &Cli, task: &str) {
    let store = match PolicyStore::load(&cli.policy_file) {
        Ok(mut store) => {
            store.set_always_allow(cli.always_allow);
            store
        }
        Err(e) => {
            eprintln!("Failed to load policy rules: {}", e);
            std::process::exit(1);
        }
    };

    let config = AgentConfig::default()
        .with_max_iterations(cli.max_iterations)
        .with_verbose(!cli.quiet);

    match cli.provider {
        Provider::Openai => {
            let Some(api_key) = env_api_key("OPENAI_API_KEY") else {
                eprintln!("Error: OPENAI_API_KEY is not set.");
                std::process::exit(1);
            };
            let mut provider_config = ProviderConfig::openai(api_key);
            if let Some(model) = &cli.model {
                provider_config = provider_config.with_model(model);
            }
            drive(cli, task, config, store, OpenAIProvider::new(provider_config)).await;
        }
        Provider::Anthropic => {
            let Some(api_key) = env_api_key("ANTHROPIC_API_KEY") else {
                eprintln!("Error: ANTHROPIC_API_KEY is not set.");
                std::process::exit(1);
            };
            let mut provider_config = ProviderConfig::anthropic(api_key);
            if let Some(model) = &cli.model {
                provider_config = provider_config.with_model(model);
            }
            drive(cli, task, config, store, AnthropicProvider::new(provider_config)).await;
        }
    }
}

async fn drive<P: LlmProvider>(
    cli: &Cli,
    task: &str,
    config: AgentConfig,
    store: PolicyStore,
    provider: P,
) {
    let gate = PolicyGate::with_stdin(store);
    let mut agent = Agent::new(config, provider, gate);

    let outcome = agent.run(task).await;

    match &outcome {
        Ok(TaskOutcome::Done(result)) => {
            if !cli.quiet {
                println!("\n--- FINAL ANSWER ---\n");
            }
            println!("{}", result);
        }
        Ok(TaskOutcome::IterationLimit(summary)) => {
            println!("{}", summary);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
        }
    }

    if cli.verbose {
        let usage = agent.usage();
        println!(
            "\nProvider calls: {} ({} prompt + {} completion tokens)",
            usage.total_calls, usage.total_prompt_tokens, usage.total_completion_tokens
        );
    }

    // Rules chosen at the prompt this session persist at shutdown.
    let store = agent.into_gate().into_store();
    if let Err(e) = store.save(&cli.policy_file) {
        eprintln!("Failed to save policy rules: {}", e);
        std::process::exit(1);
    }

    if outcome.is_err() {
        std::process::exit(1);
    }
}

fn show_rules(policy_file: &str) {
    match PolicyStore::load(policy_file) {
        Ok(store) => {
            if store.is_empty() {
                println!("No stored rules at {}.", policy_file);
                return;
            }
            println!("Rules in {} (first match wins):", policy_file);
            for rule in store.rules() {
                println!("  {:6}  {}", rule.decision.to_string(), rule.pattern);
            }
        }
        Err(e) => {
            eprintln!("Failed to load policy rules: {}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Rules) => {
            show_rules(&cli.policy_file);
            return;
        }
        Some(Commands::Schema) => {
            println!("{}", taskrun_core::schema_summary());
            return;
        }
        Some(Commands::Run { task }) => {
            let task_str = task.join(" ");
            run_task(&cli, &task_str).await;
            return;
        }
        None => {
            if cli.task.is_empty() {
                eprintln!("Error: No task provided.");
                eprintln!("Usage: taskrun [OPTIONS] <TASK>...");
                eprintln!("       taskrun run <TASK>...");
                eprintln!("       taskrun rules");
                eprintln!("       taskrun schema");
                eprintln!("\nExamples:");
                eprintln!("  taskrun \"Read Cargo.toml and list dependencies\"");
                eprintln!("  taskrun -y \"Count the Rust files in this repo\"");
                eprintln!("  taskrun --provider anthropic \"What is in this directory?\"");
                eprintln!("  taskrun --help");
                std::process::exit(1);
            }
        }
    }

    let task_str = cli.task.join(" ");
    run_task(&cli, &task_str).await;
}
