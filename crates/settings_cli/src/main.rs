//! Command-line access to a settings database.
//!
//! # Responsibility
//! - Exercise the settings core the way a host application wires it.
//! - Keep output line-oriented and deterministic for scripting.
//!
//! Usage:
//!   settings_cli [--owner TYPE:ID] get NAMESPACE KEY
//!   settings_cli [--owner TYPE:ID] set NAMESPACE KEY JSON
//!   settings_cli [--owner TYPE:ID] unset NAMESPACE KEY
//!   settings_cli [--owner TYPE:ID] list [NAMESPACE]
//!
//! The database path comes from `SETTINGS_DB_PATH` (in-memory when unset).

use log::info;
use settings_core::db::open_db_with;
use settings_core::{
    core_version, init_logging_from_config, CoreConfig, DefaultsRegistry, InMemoryCache,
    NoopCache, Owner, SettingValue, SettingsCache, SettingsService, SqliteSettingRepository,
};
use std::process::ExitCode;
use std::sync::Arc;

const USAGE: &str = "usage: settings_cli [--owner TYPE:ID] <get|set|unset|list> [args...]";

enum Command {
    Get { namespace: String, key: String },
    Set { namespace: String, key: String, value: SettingValue },
    Unset { namespace: String, key: String },
    List { namespace: Option<String> },
}

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let (owner, command) = parse_args(args)?;
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_logging_from_config(&config).map_err(|err| err.to_string())?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        core_version()
    );

    let conn = open_db_with(&config).map_err(|err| err.to_string())?;
    let repo = SqliteSettingRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let defaults = Arc::new(DefaultsRegistry::new());

    if config.cache_enabled {
        execute(
            &SettingsService::new(repo, InMemoryCache::new(), defaults),
            owner.as_ref(),
            command,
        )
    } else {
        execute(
            &SettingsService::new(repo, NoopCache, defaults),
            owner.as_ref(),
            command,
        )
    }
}

fn execute<C: SettingsCache>(
    service: &SettingsService<SqliteSettingRepository<'_>, C>,
    owner: Option<&Owner>,
    command: Command,
) -> Result<(), String> {
    match command {
        Command::Get { namespace, key } => {
            let value = service
                .get(&namespace, &key, owner)
                .map_err(|err| err.to_string())?;
            println!("{value}");
        }
        Command::Set {
            namespace,
            key,
            value,
        } => {
            let written = service
                .set(&namespace, &key, value, owner)
                .map_err(|err| err.to_string())?;
            println!("{written}");
        }
        Command::Unset { namespace, key } => {
            service
                .destroy(&namespace, &key, owner)
                .map_err(|err| err.to_string())?;
            println!("deleted {namespace}/{key}");
        }
        Command::List { namespace } => {
            let values = match owner {
                Some(owner) => service
                    .for_owner(owner.clone())
                    .and_then(|settings| settings.all(namespace.as_deref())),
                None => service.all(namespace.as_deref()),
            }
            .map_err(|err| err.to_string())?;
            for (key, value) in values {
                println!("{key}={value}");
            }
        }
    }
    Ok(())
}

fn parse_args(mut args: Vec<String>) -> Result<(Option<Owner>, Command), String> {
    let mut owner = None;
    if args.first().map(String::as_str) == Some("--owner") {
        if args.len() < 2 {
            return Err(USAGE.to_string());
        }
        let spec = args.remove(1);
        args.remove(0);
        let (owner_type, owner_id) = spec
            .split_once(':')
            .ok_or_else(|| format!("owner must be TYPE:ID, got `{spec}`"))?;
        owner = Some(Owner::new(owner_type, owner_id));
    }

    let command = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["get", namespace, key] => Command::Get {
            namespace: namespace.to_string(),
            key: key.to_string(),
        },
        ["set", namespace, key, raw] => {
            let json: serde_json::Value = serde_json::from_str(raw)
                .map_err(|err| format!("value must be JSON: {err}"))?;
            Command::Set {
                namespace: namespace.to_string(),
                key: key.to_string(),
                value: SettingValue::from(json),
            }
        }
        ["unset", namespace, key] => Command::Unset {
            namespace: namespace.to_string(),
            key: key.to_string(),
        },
        ["list"] => Command::List { namespace: None },
        ["list", namespace] => Command::List {
            namespace: Some(namespace.to_string()),
        },
        _ => return Err(USAGE.to_string()),
    };

    Ok((owner, command))
}
