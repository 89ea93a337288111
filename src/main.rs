//! Arena Lobby Demo
//!
//! Plays a host and a guest client against an in-process store: create a
//! lobby, join it, lose the guest's connection, then bootstrap the session.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::{interval, Interval};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use arena_lobby::{
    ClientConfig, LobbyCollection, LobbyEvent, MemoryStore, PlayerRef, SessionBootstrapper,
    VERSION,
};

/// How often the demo's event loop delivers store notifications.
const TICK: Duration = Duration::from_millis(16);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Arena Lobby v{}", VERSION);

    let config = ClientConfig::from_env()?;
    info!(lobbies = %config.lobbies_root, sessions = %config.sessions_root, "config loaded");

    let store = MemoryStore::new();
    let host = store.connect();
    let guest = store.connect();
    let mut ticker = interval(TICK);

    let host_lobbies = LobbyCollection::new(host.clone(), &config);
    let guest_lobbies = LobbyCollection::new(guest.clone(), &config);
    guest_lobbies.on_create(|lobby| info!(lobby = %lobby.key(), name = %lobby.name(), "guest sees lobby"));
    guest_lobbies.on_remove(|key| info!(lobby = %key, "guest lost lobby"));

    // Host creates and joins
    let handle = host_lobbies.create_lobby("Ninja Squad", "host")?;
    settle(&store, &mut ticker).await;

    let lobby = host_lobbies
        .get(handle.key())
        .context("created lobby was never reported")?;
    lobby.on(LobbyEvent::Change, |payload| {
        let players = payload.get("players").and_then(|p| p.as_object()).map_or(0, |p| p.len());
        info!(players, "host lobby changed");
    });
    lobby.join(&PlayerRef::new("host", "Host"))?;

    // Guest joins and picks a champion
    let guest_lobby = guest_lobbies
        .get(handle.key())
        .context("guest never saw the lobby")?;
    guest_lobby.join(&PlayerRef::new("guest", "Guest"))?;
    guest_lobby.set_player_champion("guest", "ninja")?;
    settle(&store, &mut ticker).await;
    info!(players = ?lobby.players().keys().collect::<Vec<_>>(), "roster before disconnect");

    // Guest's connection drops; the store cleans up its roster entry
    guest.disconnect();
    settle(&store, &mut ticker).await;
    info!(players = ?lobby.players().keys().collect::<Vec<_>>(), "roster after disconnect");

    lobby.set_map("de_dust")?;
    lobby.set_game_type("ffa")?;
    settle(&store, &mut ticker).await;

    let document = SessionBootstrapper::new(host.clone(), &config).bootstrap_lobby(&lobby)?;
    println!("{}", serde_json::to_string_pretty(&document)?);

    host_lobbies.close();
    guest_lobbies.close();
    settle(&store, &mut ticker).await;

    Ok(())
}

/// Let the event loop turn until no notification is left.
async fn settle(store: &MemoryStore, ticker: &mut Interval) {
    loop {
        ticker.tick().await;
        if store.flush() == 0 && store.pending() == 0 {
            break;
        }
    }
}
