use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use taskboard::{Config, Database, Profile, cli::{Cli, Commands}};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let config_path = match &cli.config {
        Some(path) => taskboard::utils::expand_path(path),
        None => Config::get_config_path(profile)?,
    };
    let config = Config::load_from(&config_path, profile)?;

    let db_path = config.get_database_path();
    let log_dir = taskboard::utils::get_data_dir(profile)
        .or_else(|| db_path.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let _log_guard = taskboard::logging::init(&log_dir, &config.log_level)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), ?profile, "starting");

    // Initialize database
    let db = Database::new(
        db_path.to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?
    )?;

    // Dispatch to appropriate command handler
    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let app = taskboard::tui::App::new(config, db)?.with_config_path(config_path);
            taskboard::tui::run_event_loop(app)?;
        }
        command => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut out = std::io::stdout();
            taskboard::cli::run(command, &db, &config, &mut input, &mut out)?;
        }
    }

    Ok(())
}
