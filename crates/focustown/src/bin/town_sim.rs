//! # FOCUSTOWN Town Simulator
//!
//! Headless walkthrough of the offline-first loop against the in-process
//! server, on a simulated clock.
//!
//! ```bash
//! # In-memory
//! town_sim
//!
//! # With a journal and log level from a config file
//! RUST_LOG=focustown_sync=debug town_sim town.toml
//! ```
//!
//! The run goes offline, plays a focus session and some building, fails to
//! sync, comes back online and converges with the server.

use std::error::Error;
use std::sync::atomic::{AtomicI64, Ordering};

use focustown::core::{
    find_next_open_slot, footprint_for, session_reward_preview, BuildingKind, Command, Timestamp,
    TownState,
};
use focustown::logging::init_logging;
use focustown::sync::{InProcessServer, LocalStore, ServerAdapter, SyncConfig, SyncService};

/// Simulated wall clock, in milliseconds.
static SIM_CLOCK: AtomicI64 = AtomicI64::new(1_700_000_000_000);

fn sim_now() -> Timestamp {
    SIM_CLOCK.load(Ordering::SeqCst)
}

fn advance_minutes(minutes: Timestamp) {
    SIM_CLOCK.fetch_add(minutes * 60_000, Ordering::SeqCst);
}

fn print_town(label: &str, town: &TownState) {
    let r = &town.resources;
    println!(
        "  {label:<10} v{:<3} gold {:<5} wood {:<5} stone {:<5} food {:<5} buildings {}",
        town.version,
        r.gold,
        r.wood,
        r.stone,
        r.food,
        town.buildings.len()
    );
}

fn submit<A: ServerAdapter>(service: &SyncService<A>, command: Command) {
    let kind = command.type_name();
    match service.enqueue(command) {
        Ok(Some(message)) => println!("  + {kind:<22} applied ({message})"),
        Ok(None) => println!("  + {kind:<22} applied"),
        Err(reason) => println!("  x {kind:<22} rejected ({reason})"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::default(),
    };
    init_logging(&config);

    let server = InProcessServer::new(TownState::initial(sim_now()));
    let store = LocalStore::open_with_clock(&config, sim_now)?.shared();
    let service = SyncService::with_clock(store, server, sim_now);

    println!("═══════════════════════════════════════════════════════════════");
    println!("                    FOCUSTOWN TOWN SIMULATOR");
    println!("═══════════════════════════════════════════════════════════════");

    let report = service.bootstrap().await?;
    println!("\n[1] Bootstrapped (replayed {} pending)", report.replayed);
    print_town("local", &service.town());

    println!("\n[2] Connection lost, playing offline");
    service.adapter().set_offline(true);
    let commands = service.commands();

    submit(&service, commands.add_activity("Deep work", "Work", BuildingKind::Sawmill));
    let activity_id = service
        .town()
        .activities
        .last()
        .map(|a| a.id.clone())
        .unwrap_or_default();

    let start = commands.start_session(25 * 60, activity_id.as_str(), None);
    let session_id = start.id.clone();
    submit(&service, start);
    advance_minutes(25);
    if let Some(preview) = session_reward_preview(&service.town(), sim_now()) {
        println!(
            "  ~ session preview: {} min, {} xp, {} {}",
            preview.minutes,
            preview.xp,
            preview.reward_amount,
            preview.reward_resource.name()
        );
    }
    submit(&service, commands.complete_session(session_id));

    match find_next_open_slot(&service.town(), footprint_for(BuildingKind::Market)) {
        Some(slot) => submit(
            &service,
            commands.place_building("market-1", BuildingKind::Market, slot.x, slot.y, 0),
        ),
        None => println!("  x no free slot for a market"),
    }
    submit(&service, commands.claim_production("farm-1"));
    submit(&service, commands.upgrade_building("mine-1"));
    submit(&service, commands.update_task_progress("task-water", 250));
    submit(&service, commands.delete_building("town-hall"));
    print_town("local", &service.town());

    println!("\n[3] Sync while offline");
    if let Err(err) = service.sync_now().await {
        let pending = service.store().pending_commands().len();
        println!("  sync failed: {err} (queue kept: {pending} pending)");
    }

    println!("\n[4] Back online");
    service.adapter().set_offline(false);
    advance_minutes(1);
    let summary = service.sync_now().await?;
    println!(
        "  pushed {} | acked {} | rejected {}",
        summary.pushed, summary.acked, summary.rejected
    );
    print_town("local", &service.town());
    print_town("server", &service.adapter().snapshot());

    let converged = service.town() == service.adapter().snapshot();
    println!(
        "\n  converged: {converged} | queue: {} entries | last sync: {:?}",
        service.queue().len(),
        service.last_synced_at()
    );

    service.store().checkpoint()?;
    Ok(())
}
