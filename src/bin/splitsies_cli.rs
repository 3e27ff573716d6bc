use splitsies_core::{cli::run_cli, config::ConfigManager, init_with_filter};

fn main() {
    let log_filter = ConfigManager::new()
        .and_then(|manager| manager.load())
        .ok()
        .and_then(|config| config.log_filter);
    init_with_filter(log_filter.as_deref());

    if let Err(err) = run_cli() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
