use clap::Parser;
use log::{error, info};

use icebite::{App, Cli, Config, FileKeyValueStore, Result, TripStore};

pub fn initialize_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let kv = FileKeyValueStore::open(config.store_path())?;
    let store = TripStore::with_offset(kv, config.offset());

    let mut app = App::new(store, config, cli.verbose);
    app.show_onboarding_if_needed(&cli.command);
    app.run(cli.command)
}

fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    info!("Application shutting down");
}
