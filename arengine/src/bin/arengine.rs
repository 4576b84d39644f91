use clap::Parser;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use arengine_lib::{
    clock::{Clock, ManualClock},
    engine::{Engine, FrameInput},
    host::{FixedHits, HostRequest, RecordingHost},
    na::{Point2, Vector3},
    relay::{RelayHub, RemoteAnimation, Step},
    scenario::{Scenario, SignalKind},
    scene::MemoryNodeFactory,
};

/// Replay a scenario through the engine, headless
#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// Pace the replay to the scenario's frame rate instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Print the scene every N frames, 0 disables
    #[arg(short = 'p', long, default_value_t = 10)]
    print_every: u64,

    /// Don't loop remoted animations back through the relay; they then
    /// activate locally
    #[arg(long)]
    no_relay: bool,

    /// Scenario configuration toml file
    scenario: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let opts = Opts::parse();

    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_flag = interrupted.clone();
    ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            let exit_code = if cfg!(target_family = "unix") {
                // 128 (fatal error signal "n") + 2 (control-c is fatal error signal 2)
                130
            } else {
                // Windows code 3221225786
                // -1073741510 == C000013A
                -1073741510
            };
            std::process::exit(exit_code);
        }
    })?;

    let scenario = Scenario::load(&opts.scenario)?;
    let feed = scenario.load_feed()?;
    println!(
        "Replaying '{}': {} POIs, {} frames at {} Hz",
        scenario.display_name(),
        feed.len(),
        scenario.frame_count(),
        scenario.frame_rate
    );

    let mut engine = Engine::new(scenario.engine.clone(), Box::new(MemoryNodeFactory))?;
    engine.load_definitions(feed);

    let mut relay: RelayHub<RemoteAnimation> = RelayHub::default();
    let peer = relay.join(None);
    let mut host = if opts.no_relay {
        RecordingHost::new()
    } else {
        RecordingHost::with_relay(peer.clone())
    };

    let mut clock = ManualClock::new(scenario.minute_of_day);
    let period = scenario.frame_period();
    let mut prev = None;

    for frame_idx in 0..scenario.frame_count() {
        if interrupted.load(Ordering::SeqCst) {
            break;
        }

        let t = clock.now().as_time();

        for signal in scenario.signals_at(prev, t) {
            match signal.kind {
                SignalKind::Activated => engine.signal_activated(signal.poi),
                SignalKind::Deactivated => engine.signal_deactivated(signal.poi),
            }
        }

        let click = scenario.click_at(prev, t);
        let input = FrameInput {
            now: clock.now(),
            minute_of_day: clock.minute_of_day(),
            fix: scenario.fix_at(prev, t),
            viewer_position: Vector3::zeros(),
            click: click.map(|c| Point2::new(c.x, c.y)),
            tracked: scenario.tracked_at(t),
        };
        let hits = FixedHits {
            view: scenario.focused_at(t),
            pointer: click.map(|c| c.poi.clone()).unwrap_or_default(),
        };

        let report = engine.step(&input, &hits, &mut host);
        for id in report.destroyed.iter() {
            println!("{:>8.2}s  destroyed #{id}", t.as_secs());
        }
        for id in report.duplicated.iter() {
            println!("{:>8.2}s  duplicated -> #{id}", t.as_secs());
        }

        relay.step()?;
        while let Some(msg) = peer.recv() {
            engine.remote_activate(&msg.name, msg.start, &mut host);
        }

        for req in host.take_requests() {
            match req {
                HostRequest::Reload => {
                    engine.load_definitions(scenario.load_feed()?);
                }
                HostRequest::Remote { .. } => (),
                other => println!("{:>8.2}s  host: {other:?}", t.as_secs()),
            }
        }

        if opts.print_every != 0 && frame_idx % opts.print_every == 0 {
            print_scene(&engine, t.as_secs());
        }

        prev = Some(t);
        clock.advance(period);
        if opts.realtime {
            std::thread::sleep(Duration::from_secs_f64(period.as_secs()));
        }
    }

    println!("Stopped at\n{:#?}", engine.frame());

    Ok(())
}

fn print_scene(engine: &Engine, t: f64) {
    println!("TIME: {t:.2}s  device: {:?}", engine.device());
    for obj in engine.registry().iter() {
        let node = obj.node();
        let (offset, scale) = node.placement();
        let active: Vec<&str> = engine
            .orchestrator()
            .iter()
            .map(|(_, a)| a)
            .filter(|a| a.object_id() == obj.id && a.is_active())
            .map(|a| a.name())
            .collect();
        println!(
            "  #{:<6} {:<20} at ({:>7.2}, {:>7.2}, {:>7.2}) x{:.2} {} {:?}",
            obj.id,
            obj.definition.title,
            offset.x,
            offset.y,
            offset.z,
            scale,
            if node.is_enabled() { "on " } else { "off" },
            active,
        );
    }
}
