pub extern crate nalgebra as na;

pub mod animation;
pub mod clock;
pub mod engine;
pub mod geo;
pub mod host;
pub mod orchestrator;
pub mod random;
pub mod registry;
pub mod relay;
pub mod scenario;
pub mod scene;
pub mod tracking;
pub mod units;

pub trait FrameComponent<'a> {
    /// The type for state that is shared between multiple components; e.g. the scene object registry.
    type SharedState;

    /// The type for the environment structure that is scoped to this component.
    type Environment;

    fn init(&mut self, _env: &'a Self::Environment, _shared_state: &mut Self::SharedState) {}

    fn reset(&mut self, _env: &'a Self::Environment, _shared_state: &mut Self::SharedState) {}

    fn step(
        &mut self,
        dt: units::Time,
        env: &'a Self::Environment,
        shared_state: &mut Self::SharedState,
    );
}
