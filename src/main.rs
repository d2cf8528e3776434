mod auth;
mod cli;
mod config;
mod dispatcher;
mod error;
mod gateway;
mod lifecycle;
mod manager;
mod poller;
mod store;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::sync::Notify;

use auth::TokenResolver;
use cli::{Cli, Command};
use config::ZapConfig;
use dispatcher::ActionDispatcher;
use gateway::UazapiClient;
use manager::ConnectionManager;
use poller::{ProfileStatusSource, StatusPoller};
use store::{FileStore, MemoryStore};
use ui::{StatusView, WatchView};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ZapConfig::load_from(Path::new(&cli.config))?;

    // Caller identity is resolved exactly once, here at the boundary.
    let bearer = cli.token.clone().unwrap_or_default();
    let profile = match config.token_resolver().resolve(&bearer) {
        Ok(profile) => profile,
        Err(e) => bail!("{e} (HTTP {})", e.http_status()),
    };
    if !profile.role.can_manage_instance() {
        bail!("Profile role may not manage a WhatsApp instance");
    }
    if cli.verbose {
        eprintln!("caller: {} ({:?})", profile.email, profile.role);
    }

    let gateway = UazapiClient::new(config.base_url.clone(), config.admin_token.clone());
    let store: Box<dyn store::InstanceStore> = if cli.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileStore::new(PathBuf::from(&config.store_path)))
    };
    let manager = Arc::new(ConnectionManager::new(gateway, store));
    let view = StatusView::new();

    match cli.command {
        Command::Status => {
            let report = manager.status(&profile).await?;
            view.print_report(&report);
        }

        Command::Create => {
            let refresh = Arc::new(Notify::new());
            let (dispatcher, mut rx) = ActionDispatcher::new(manager, profile, refresh);
            let resp = dispatcher.create().await;
            while let Ok(n) = rx.try_recv() {
                view.print_notification(&n);
            }
            match resp {
                Some(resp) => println!("instance_id: {}", resp.instance_id),
                None => std::process::exit(1),
            }
        }

        Command::Connect { phone } => {
            let refresh = Arc::new(Notify::new());
            let (dispatcher, mut rx) = ActionDispatcher::new(manager, profile, refresh);
            let payload = dispatcher.connect(phone).await;
            while let Ok(n) = rx.try_recv() {
                view.print_notification(&n);
            }
            match payload {
                Some(raw) => view.print_connect_payload(&raw),
                None => std::process::exit(1),
            }
        }

        Command::Disconnect => {
            let refresh = Arc::new(Notify::new());
            let (dispatcher, mut rx) = ActionDispatcher::new(manager, profile, refresh);
            let ack = dispatcher.disconnect().await;
            while let Ok(n) = rx.try_recv() {
                view.print_notification(&n);
            }
            if ack.is_none() {
                std::process::exit(1);
            }
        }

        Command::Pause => {
            let ack = manager.pause(&profile).await?;
            println!("{}", ack.message);
        }

        Command::Delete => {
            let ack = manager.delete(&profile).await?;
            println!("{}", ack.message);
        }

        Command::Watch { interval } => {
            let secs = interval.unwrap_or(config.poll_interval_secs);
            let source = Arc::new(ProfileStatusSource::new(manager, profile));
            let handle = StatusPoller::spawn(source, Duration::from_secs(secs));

            let watch_view = WatchView::start();
            let mut rx = handle.subscribe();
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = rx.borrow().clone();
                        watch_view.update(&state);
                    }
                }
            }
            handle.stop();
            watch_view.finish();
        }
    }

    Ok(())
}
