//! Everything the engine asks of the surrounding application

use crate::relay::{Peer, RemoteAnimation};
use crate::units::Ticks;
use na::Point2;
use poitypes::prelude::PoiId;
use tracing::{debug, info, warn};
use url::Url;

/// Requests the engine cannot satisfy on its own.
pub trait EngineHost {
    /// Offers a `Remoted` animation to the multi-user relay. Returns true when
    /// the relay took it, in which case the local activation is skipped and
    /// the animation starts when the relay echoes it back.
    fn send_animation_to_remote(&mut self, _name: &str, _start: Ticks) -> bool {
        false
    }

    fn open_url(&mut self, url: &Url);

    /// Called for `SetActive` directives naming nothing in the scene.
    fn set_active_by_name(&mut self, name: &str, active: bool);

    fn report_activity(&mut self, _label: &str) {}

    fn buzz(&mut self);

    fn request_reload(&mut self);

    fn take_screenshot(&mut self);
}

/// Casts rays into the scene on behalf of the orchestrator.
pub trait HitTester {
    /// Objects hit by a ray along the viewer's facing direction.
    fn cast_view_ray(&self) -> Vec<PoiId>;

    /// Objects hit by a ray through a screen-space pointer position.
    fn cast_pointer_ray(&self, pointer: Point2<f64>) -> Vec<PoiId>;
}

/// A hit tester for frames without any ray hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHits;

impl HitTester for NoHits {
    fn cast_view_ray(&self) -> Vec<PoiId> {
        Vec::new()
    }

    fn cast_pointer_ray(&self, _pointer: Point2<f64>) -> Vec<PoiId> {
        Vec::new()
    }
}

/// Hits decided up front, e.g. from a replay script.
#[derive(Debug, Clone, Default)]
pub struct FixedHits {
    pub view: Vec<PoiId>,
    pub pointer: Vec<PoiId>,
}

impl HitTester for FixedHits {
    fn cast_view_ray(&self) -> Vec<PoiId> {
        self.view.clone()
    }

    fn cast_pointer_ray(&self, _pointer: Point2<f64>) -> Vec<PoiId> {
        self.pointer.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostRequest {
    Remote { name: String, start: Ticks },
    OpenUrl(Url),
    SetActive { name: String, active: bool },
    Activity(String),
    Buzz,
    Reload,
    Screenshot,
}

/// Logs and records every request, forwarding remoted animations to a relay
/// when one is attached.
#[derive(Debug, Default)]
pub struct RecordingHost {
    requests: Vec<HostRequest>,
    relay: Option<Peer<RemoteAnimation>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relay(relay: Peer<RemoteAnimation>) -> Self {
        RecordingHost {
            requests: Vec::new(),
            relay: Some(relay),
        }
    }

    pub fn requests(&self) -> &[HostRequest] {
        &self.requests
    }

    pub fn take_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.requests)
    }
}

impl EngineHost for RecordingHost {
    fn send_animation_to_remote(&mut self, name: &str, start: Ticks) -> bool {
        let Some(relay) = self.relay.as_ref() else {
            return false;
        };
        match relay.send(RemoteAnimation {
            name: name.to_owned(),
            start,
        }) {
            Ok(()) => {
                self.requests.push(HostRequest::Remote {
                    name: name.to_owned(),
                    start,
                });
                true
            }
            Err(e) => {
                warn!(animation = name, err = %e, "Relay rejected remoted animation");
                false
            }
        }
    }

    fn open_url(&mut self, url: &Url) {
        info!(url = %url, "Open URL");
        self.requests.push(HostRequest::OpenUrl(url.clone()));
    }

    fn set_active_by_name(&mut self, name: &str, active: bool) {
        debug!(target_name = name, active, "Set active by name");
        self.requests.push(HostRequest::SetActive {
            name: name.to_owned(),
            active,
        });
    }

    fn report_activity(&mut self, label: &str) {
        info!(activity = label, "Activity");
        self.requests.push(HostRequest::Activity(label.to_owned()));
    }

    fn buzz(&mut self) {
        debug!("Buzz");
        self.requests.push(HostRequest::Buzz);
    }

    fn request_reload(&mut self) {
        info!("Reload requested");
        self.requests.push(HostRequest::Reload);
    }

    fn take_screenshot(&mut self) {
        debug!("Screenshot requested");
        self.requests.push(HostRequest::Screenshot);
    }
}
