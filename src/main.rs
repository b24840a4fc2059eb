use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use datarepo::construct::{Access, DataRepo};
use datarepo::error::Result;
use datarepo::settings::Settings;

fn run(settings: &Settings) -> Result<()> {
    let repo = DataRepo::new();
    if let Some(seed) = &settings.seed_json {
        let json = std::fs::read_to_string(seed).map_err(|e| {
            datarepo::RepoError::Config(format!("cannot read {}: {}", seed.display(), e))
        })?;
        let count = repo.create_from_json(&json, &settings.seed_base_key, &settings.key_options())?;
        info!(path = %seed.display(), count, "seeded repository");
    }
    let mut listing: Vec<_> = repo.list_all().collect();
    listing.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, cell) in listing {
        // values behind a read password are not printed
        if cell.policy().is_protected(Access::Read) {
            println!("{} ({}) = <protected>", key, cell.kind());
        } else {
            println!("{} ({}) = {}", key, cell.kind(), cell.snapshot());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let file = std::env::args().nth(1);
    let settings = match Settings::load(file.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "datarepo failed");
            ExitCode::FAILURE
        }
    }
}
