use std::{
    fs::File,
    io::{self, BufReader, Write},
    path::Path,
};

use anyhow::{Context, Result, bail};
use idlink_app::{AppConfig, ReconcileService, pass_through_reason};
use idlink_core::SourceIdentity;
use idlink_store_cognito::CognitoDirectory;
use idlink_trigger::{SignUpEvent, read_event, write_event};
use serde::Serialize;
use tracing::info;

use crate::Command;

pub fn run(command: Command, config_path: &Path) -> Result<()> {
    match command {
        Command::Handle { event, pretty } => {
            let config = AppConfig::load(config_path)?;
            handle_event(&config, event.as_deref(), pretty, io::stdout().lock())
        }
        Command::Parse { username } => handle_parse(&username),
    }
}

fn handle_event(
    config: &AppConfig,
    event_path: Option<&Path>,
    pretty: bool,
    out: impl Write,
) -> Result<()> {
    let mut event = load_event(event_path)?;
    if let Some(reason) = pass_through_reason(&config.trigger, &event) {
        info!(?reason, "sign-up passed through");
        write_event(out, &event, pretty)?;
        return Ok(());
    }

    let settings = config.directory.cognito_settings(event.region.as_deref());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let outcome = runtime.block_on(async {
        let directory = CognitoDirectory::connect(&settings).await;
        ReconcileService::new(directory, config)
            .reconcile(&mut event)
            .await
    })?;
    info!(?outcome, "sign-up handled");

    write_event(out, &event, pretty)?;
    Ok(())
}

fn load_event(path: Option<&Path>) -> Result<SignUpEvent> {
    match path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            read_event(BufReader::new(file))
                .with_context(|| format!("failed to read event from {}", path.display()))
        }
        None => read_event(io::stdin().lock()).context("failed to read event from stdin"),
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct ParsedUsername {
    provider_name: String,
    provider_user_id: String,
    link_source: String,
}

fn parse_username(username: &str) -> Result<ParsedUsername> {
    let Some(identity) = SourceIdentity::parse(username) else {
        bail!("{username:?} is not a provider-qualified username");
    };
    let link_source = identity.link_source().to_string();
    let SourceIdentity {
        provider_name,
        provider_user_id,
    } = identity;
    Ok(ParsedUsername {
        provider_name,
        provider_user_id,
        link_source,
    })
}

fn handle_parse(username: &str) -> Result<()> {
    let parsed = parse_username(username)?;
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}
