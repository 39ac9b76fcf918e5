use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use twinbird_common::observability::init_logging;
use twinbird_config::{TwinbirdConfig, TwinbirdConfigLoader, load_dotenv};
use twinbird_social::twitter::{Dispatched, Dispatcher, Payload};

mod cli;
mod compare;

use cli::{Cli, Command};

const DEFAULT_CONFIG_FILE: &str = "twinbird.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Config: explicit file, else ./twinbird.yaml, else plain environment.
    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(kind) = cli.provider {
        cfg.provider = kind;
    }

    let log_path = init_logging(cfg.log_config())?;
    tracing::debug!(log = %log_path.display(), provider = %cfg.provider, "twinbird starting");

    if let Command::Compare(args) = &cli.command {
        return compare::run(&cfg, args).await;
    }

    cfg.validate()?;
    let op = cli
        .command
        .operation()?
        .context("subcommand has no provider operation")?;
    let dispatcher = Dispatcher::from_config(&cfg)?;
    let out = dispatcher
        .dispatch(op)
        .await
        .context("provider returned a malformed body")?;
    print_dispatched(&out, cli.raw, cli.compact)
}

fn load_config(explicit: Option<&Path>) -> Result<TwinbirdConfig> {
    let cwd = std::env::current_dir().context("reading working directory")?;
    let file: Option<PathBuf> = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Some(cwd.join(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
    };

    match file {
        Some(path) => {
            // `${VAR}` placeholders in the file may point at .env entries.
            load_dotenv(&cwd);
            TwinbirdConfigLoader::new()
                .with_file(&path)
                .load()
                .with_context(|| format!("loading {}", path.display()))
        }
        None => Ok(TwinbirdConfig::from_env()),
    }
}

fn print_dispatched(out: &Dispatched<Payload>, raw: bool, compact: bool) -> Result<()> {
    if raw {
        match out.status {
            Some(code) => eprintln!("status: {code}"),
            None => eprintln!("status: no response"),
        }
        eprintln!("{}", out.raw_text);
    }
    let rendered = if compact {
        serde_json::to_string(&out.envelope)?
    } else {
        serde_json::to_string_pretty(&out.envelope)?
    };
    println!("{rendered}");
    Ok(())
}
