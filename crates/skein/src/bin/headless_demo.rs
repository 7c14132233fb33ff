//! Headless three-loop demo.
//!
//! Spins the simulation, presentation and control contexts on their own
//! threads for a short run: the simulation moves the player from scripted
//! input and creates/destroys resources, the presentation samples
//! snapshots at a higher cadence, the control loop realizes mirrors. At
//! the end each thread reports what it saw.

use std::sync::Arc;
use std::time::Duration;

use skein::{run_at_rate, Engine, EngineConfig, StopFlag};
use skein::config::keys;
use skein_core::CursorWriter;
use skein_resource::{MirrorHandle, RealizeFuture, RealizeResource, ResourceId, ResourceKind};

const TEXTURE: ResourceKind = ResourceKind(1);
const MATERIAL: ResourceKind = ResourceKind(2);
const RUN_FOR: Duration = Duration::from_millis(1500);

/// Demo realizer: pretends to decode an asset for a few milliseconds.
struct DemoRealizer;

impl RealizeResource for DemoRealizer {
    fn realize(&self, id: ResourceId, kind: ResourceKind, props: Vec<u8>) -> RealizeFuture {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            tracing::debug!(?id, ?kind, props_len = props.len(), "mirror realized");
            Ok(MirrorHandle(u64::from(id.index()) | (u64::from(kind.0) << 32)))
        })
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = EngineConfig::default();
    let engine = match Engine::new(&config, Arc::new(DemoRealizer)) {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!(%err, "failed to build engine");
            return;
        }
    };

    let Engine { mut simulation, mut presentation, mut control } = engine;
    let stop = StopFlag::new();

    // --- simulation loop -------------------------------------------------
    let sim_stop = stop.clone();
    let sim_rate = config.simulation_tick_rate;
    let simulation_thread = std::thread::spawn(move || {
        let mut created: Vec<ResourceId> = Vec::new();
        let mut scripted_tick = 0u64;

        let ticks = run_at_rate(sim_rate, &sim_stop, || {
            scripted_tick += 1;

            // Scripted input: run right, hop every second.
            simulation.recorder.set_raw(keys::KEY_D, 1.0);
            let jumping = scripted_tick % u64::from(sim_rate) == 0;
            simulation.recorder.set_raw(keys::KEY_SPACE, if jumping { 1.0 } else { 0.0 });

            // Scripted resources: a texture + dependent material early on,
            // then drop the caller's texture ref - the material keeps it
            // alive until the material itself goes.
            if scripted_tick == 10 {
                let mut props = [0u8; 8];
                let mut writer = CursorWriter::new(&mut props);
                let _ = writer.write_u32(512); // width
                let _ = writer.write_u32(512); // height
                if let Ok(texture) = simulation.directory.create(TEXTURE, props.to_vec(), &[]) {
                    if let Ok(material) = simulation.directory.create(MATERIAL, Vec::new(), &[texture]) {
                        created.push(material);
                    }
                    simulation.directory.remove_ref(texture);
                    created.push(texture);
                }
            }
            if scripted_tick == 60 {
                if let Some(material) = created.first() {
                    simulation.directory.remove_ref(*material);
                }
            }

            match simulation.tick() {
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "simulation tick did not publish"),
            }
        });

        (ticks, simulation)
    });

    // --- presentation loop ----------------------------------------------
    let present_stop = stop.clone();
    let present_rate = config.presentation_tick_rate;
    let presentation_thread = std::thread::spawn(move || {
        let mut frames = 0u64;
        let mut fresh_frames = 0u64;
        let mut last_version = 0u64;
        let mut last_position = None;

        run_at_rate(present_rate, &present_stop, || {
            match presentation.latest() {
                Ok(view) => {
                    frames += 1;
                    if view.version > last_version {
                        fresh_frames += 1;
                        last_version = view.version;
                    }
                    if let Some((_, position)) = view.entities.first() {
                        last_position = Some(*position);
                    }
                }
                Err(_) => {
                    // Nothing committed yet - stale is fine, absent is too.
                }
            }
        });

        (frames, fresh_frames, last_position)
    });

    // --- control loop ----------------------------------------------------
    let control_stop = stop.clone();
    let control_rate = config.control_tick_rate;
    let control_thread = std::thread::spawn(move || {
        run_at_rate(control_rate, &control_stop, || control.tick());
        control
    });

    std::thread::sleep(RUN_FOR);
    stop.stop();

    let (sim_ticks, simulation) = simulation_thread.join().expect("simulation thread panicked");
    let (frames, fresh_frames, last_position) =
        presentation_thread.join().expect("presentation thread panicked");
    let control = control_thread.join().expect("control thread panicked");

    println!("=== skein headless demo ===");
    println!("simulation   : {sim_ticks} ticks, final tick {}", simulation.tick);
    println!(
        "presentation : {frames} frames sampled, {fresh_frames} fresh snapshots, last position {last_position:?}"
    );
    println!(
        "resources    : {} live in directory, {} mirrors in registry",
        simulation.directory.live_count(),
        control.registry().mirror_count(),
    );
}
