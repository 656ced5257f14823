use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use amanda_bot::application::messaging::Dispatcher;
use amanda_bot::domain::entities::RequestExtra;
use amanda_bot::infrastructure::adapters::ConsoleDriver;
use amanda_bot::infrastructure::config::Config;
use amanda_bot::plugins::builtin;
use amanda_bot::{BotError, Driver};

#[derive(Parser)]
#[command(name = "amanda-bot")]
#[command(about = "A plugin-routing chat bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on the console driver
    Run,
    /// Dispatch a single message and print the reply
    Say {
        /// Message text
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// List registered plugins
    Plugins,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_bot(&cli.config),
        Commands::Say { text } => say_once(&cli.config, &text.join(" ")),
        Commands::Plugins => list_plugins(&cli.config),
        Commands::Version => {
            println!("amanda-bot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(&cli.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(config_path: &str) -> Result<Config, BotError> {
    if !Path::new(config_path).exists() {
        tracing::warn!("Config {} not found, using defaults", config_path);
        return Ok(Config::load_env());
    }

    let mut config = Config::load(config_path)?;
    config.apply_env();
    config.validate()?;
    Ok(config)
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher, BotError> {
    let plugins = builtin::load_from_config(&config.plugins)?;
    tracing::info!("Plugin system initialized with {} plugins", plugins.len());
    Ok(Dispatcher::new(&config.dispatch, plugins))
}

fn run_bot(config_path: &str) -> Result<(), BotError> {
    let config = load_config(config_path)?;
    tracing::info!("Starting amanda-bot: {}", config.bot.name);

    if !config.drivers.console.enabled {
        return Err(BotError::Internal("no driver enabled".to_string()));
    }

    let dispatcher = build_dispatcher(&config)?;
    let driver = ConsoleDriver::stdout(&config.bot.name).with_prompt("> ");
    driver.run(&dispatcher, io::stdin().lock())?;
    Ok(())
}

fn say_once(config_path: &str, text: &str) -> Result<(), BotError> {
    let config = load_config(config_path)?;
    let dispatcher = build_dispatcher(&config)?;
    let driver = ConsoleDriver::stdout(&config.bot.name);

    let request = dispatcher.dispatch(text, Some(&driver as &dyn Driver), RequestExtra::new());
    if !request.is_accepted() {
        println!("(no plugin wanted this message)");
    }
    Ok(())
}

fn list_plugins(config_path: &str) -> Result<(), BotError> {
    let config = load_config(config_path)?;
    let plugins = builtin::load_from_config(&config.plugins)?;

    for info in plugins.list_plugins() {
        let name = info
            .name
            .map(|n| format!("!{}", n))
            .unwrap_or_else(|| "(implicit only)".to_string());
        let mode = if info.implicit { " [implicit]" } else { "" };
        println!("{}{} - {}", name, mode, info.description);
    }
    Ok(())
}

fn init_config(config_path: &str) -> Result<(), BotError> {
    if Path::new(config_path).exists() {
        return Err(BotError::Internal(format!("{} already exists", config_path)));
    }

    let yaml = Config::sample().to_yaml()?;
    fs::write(config_path, yaml)?;
    println!("Created {}", config_path);
    Ok(())
}
