pub use filter::{FilterConfig, LocationFix, PositionFilter};
pub use math::{distance, local_offset, offset_anchor, GeoPoint, EARTH_RADIUS_METERS};
pub use projector::{GeoProjector, ProjectorConfig, ProjectorEnvironment};

pub mod filter;
pub mod math;
pub mod projector;
