use clap::Parser;
use tracing_subscriber::EnvFilter;
use workflow_learner::cli::commands::{cmd_learn, cmd_list, cmd_run, cmd_validate};
use workflow_learner::cli::config::{Cli, Commands, Settings, load_config};

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::List { feature } = &cli.command {
        return cmd_list(feature);
    }

    let config = load_config(cli.config.as_deref());

    // Resolve settings: CLI > config > env > defaults
    let settings = Settings::resolve(&cli, &config, |key| std::env::var(key).ok())?;

    let all_passed = match &cli.command {
        Commands::Learn { feature, scenario } => {
            cmd_learn(&settings, feature, scenario.as_deref())?
        }
        Commands::Validate => cmd_validate(&settings)?,
        Commands::Run { feature, scenario } => cmd_run(&settings, feature, scenario.as_deref())?,
        Commands::List { .. } => true,
    };

    if !all_passed {
        std::process::exit(1);
    }

    Ok(())
}
