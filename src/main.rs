use floorplan_mapper::client::MappingClient;
use floorplan_mapper::config::{Config, load_env_file};
use floorplan_mapper::engine::session::MappingSession;
use floorplan_mapper::models::account::Account;
use floorplan_mapper::services::report::ValidationReport;
use floorplan_mapper::services::sync;
use log::{error, info};
use std::path::PathBuf;

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

pub fn run() -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (backend={}, timeout={}s, actor={}, report_enabled={}, push_enabled={}, push_file={})",
        cfg.backend_url,
        cfg.http_timeout.as_secs(),
        cfg.actor,
        cfg.report_enabled,
        cfg.push_enabled,
        cfg.push_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    // 2) Client and session
    let client = MappingClient::new(&cfg.backend_url, cfg.http_timeout);
    let mut session = MappingSession::new(Account::default(), &cfg.actor);

    // 3) Pull account and saved mapping
    sync::pull(&client, &mut session)?;

    // 4) Report
    if cfg.report_enabled {
        ValidationReport::build(&session).log();
    } else {
        info!("Report disabled via MAPPING_REPORT_ENABLED={}", cfg.report_enabled);
    }

    // 5) Push
    match (cfg.push_enabled, cfg.push_file.as_deref()) {
        (true, Some(path)) => {
            sync::push_file(&client, &mut session, path)?;
        }
        _ => info!("Push disabled via MAPPING_PUSH_ENABLED={}", cfg.push_enabled),
    }

    Ok(())
}

fn configure_env_from_cli() -> Result<Option<LoadedEnvFile>, String> {
    let mut args = std::env::args_os();
    args.next();

    let mut env_file: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        let path = match arg.to_str() {
            Some("--env-file") => PathBuf::from(
                args.next()
                    .ok_or_else(|| "`--env-file` requires a path argument".to_string())?,
            ),
            Some(s) if s.starts_with("--env-file=") => match &s["--env-file=".len()..] {
                "" => return Err("`--env-file` requires a path argument".to_string()),
                p => PathBuf::from(p),
            },
            Some("--") => break,
            Some(other) => return Err(format!("unrecognised argument: {}", other)),
            None => return Err("argument contains invalid UTF-8".to_string()),
        };
        if env_file.replace(path).is_some() {
            return Err("`--env-file` provided more than once".to_string());
        }
    }

    match env_file {
        Some(path) => {
            if !path.is_file() {
                return Err(format!("env file not found: {}", path.display()));
            }
            load_env_file(&path)?;
            Ok(Some(LoadedEnvFile { path, explicit: true }))
        }
        None => {
            let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
            let path = cwd.join(".env");
            if !path.is_file() {
                return Ok(None);
            }
            load_env_file(&path)?;
            Ok(Some(LoadedEnvFile { path, explicit: false }))
        }
    }
}

fn main() {
    let loaded_env = match configure_env_from_cli() {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "floorplan-mapper {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
