use arengine_lib::{
    clock::{Clock, ManualClock},
    engine::{Engine, FrameInput, FrameReport},
    host::{FixedHits, HostRequest, RecordingHost},
    na::{Point2, Vector3},
    relay::{RelayHub, RemoteAnimation, Step},
    scenario::{Scenario, SignalKind},
    scene::MemoryNodeFactory,
};
use std::path::Path;

struct Replay {
    engine: Engine,
    requests: Vec<HostRequest>,
    reports: Vec<FrameReport>,
    remote_burst_seen: bool,
}

fn replay(file: &str) -> Replay {
    let scenario = Scenario::load(Path::new("../scenarios").join(file)).unwrap();
    let mut engine = Engine::new(scenario.engine.clone(), Box::new(MemoryNodeFactory)).unwrap();
    engine.load_definitions(scenario.load_feed().unwrap());

    let mut relay: RelayHub<RemoteAnimation> = RelayHub::default();
    let peer = relay.join(None);
    let mut host = RecordingHost::with_relay(peer.clone());
    let mut clock = ManualClock::new(scenario.minute_of_day);

    let mut requests = Vec::new();
    let mut reports = Vec::new();
    let mut remote_burst_seen = false;
    let mut prev = None;
    for _ in 0..scenario.frame_count() {
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
        reports.push(engine.step(&input, &hits, &mut host));

        relay.step().unwrap();
        while let Some(msg) = peer.recv() {
            assert!(engine.remote_activate(&msg.name, msg.start, &mut host) > 0);
        }
        remote_burst_seen |= engine
            .orchestrator()
            .find(2, "burst Remoted")
            .is_some_and(|a| a.is_active());
        requests.extend(host.take_requests());

        prev = Some(t);
        clock.advance(scenario.frame_period());
    }

    Replay {
        engine,
        requests,
        reports,
        remote_burst_seen,
    }
}

#[test]
fn plaza_replay() {
    let r = replay("plaza.toml");
    let e = &r.engine;

    assert!(e.device().is_some());
    let lamp = e.registry().get(1).unwrap();
    assert!(lamp.placement.placed);
    assert!(lamp.node().is_enabled());

    let basin = e
        .registry()
        .iter()
        .find(|o| o.definition.title == "Basin")
        .unwrap();
    assert!(basin.is_synthetic());
    assert_eq!(basin.parent, Some(2));

    assert!(r
        .requests
        .contains(&HostRequest::Activity("lamp-spin".to_owned())));
    assert!(r
        .requests
        .iter()
        .any(|req| matches!(req, HostRequest::OpenUrl(u) if u.as_str() == "https://example.com/lamp")));
    assert!(r.requests.contains(&HostRequest::Screenshot));
    assert!(r.requests.contains(&HostRequest::Buzz));

    assert!(r
        .requests
        .iter()
        .any(|req| matches!(req, HostRequest::Remote { name, .. } if name == "burst Remoted")));
    assert!(r.remote_burst_seen);

    let duplicated: Vec<_> = r.reports.iter().flat_map(|rep| rep.duplicated.iter()).collect();
    assert_eq!(duplicated.len(), 1);
    let dup = e.registry().get(*duplicated[0]).unwrap();
    assert_eq!(dup.lineage_id, 4);
    assert_eq!(dup.definition.title, "Balloon");
}

#[test]
fn tiled_area_replay_stays_inside_the_tile() {
    let r = replay("tiled_area.toml");
    let e = &r.engine;

    assert!(e.registry().get(3).is_none(), "Statue is filtered out");
    for id in e.registry().placed_objects() {
        let p = e.registry().get(*id).unwrap().placement;
        assert!(p.placed);
        assert!(p.current.x.abs() <= 10.0 + 1e-9, "{id}: {:?}", p.current);
        assert!(p.current.z.abs() <= 15.0 + 1e-9, "{id}: {:?}", p.current);
        assert!((0.0..=1.0).contains(&p.scale));
    }
}

#[test]
fn tracking_replay_wakes_and_sleeps_the_statue() {
    let r = replay("tracking.toml");
    let e = &r.engine;

    let statue = e.registry().get(3).unwrap();
    assert!(statue.is_relative());
    let wake = e.orchestrator().find(3, "wake").unwrap();
    // Re-activated by the scripted signal at 10s
    assert!(wake.is_active());
    assert!(wake.started_at().is_some());
    assert!(r.requests.contains(&HostRequest::SetActive {
        name: "Radio".to_owned(),
        active: true
    }));
}
