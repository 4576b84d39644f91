//! Parsers for the small languages embedded in POI definition strings

extern crate nalgebra as na;

pub use crate::chain::{parse_chain, ChainEntry};
pub use crate::keyword::{BehaviorKind, Interpolation};
pub use crate::name::{Action, NameDirectives, TimeWindow, WindowSpec};
pub use crate::offset::parse_offset;
pub use crate::parser::{ParseError, ParseErrorExt};

pub mod chain;
pub mod keyword;
pub mod name;
pub mod offset;
pub mod parser;

pub const TIME_WINDOW_TOKEN: &str = "Time:";
pub const REMOTED_TOKEN: &str = "Remoted";
pub const RANDOM_DELAY_TOKEN: &str = "RandomDelay";
pub const ACTIVITY_TOKEN: &str = "Activity:";
pub const OPEN_URL_TOKEN: &str = "openUrl:";
pub const SET_ACTIVE_TOKEN: &str = "SetActive:";
pub const SET_INACTIVE_TOKEN: &str = "SetInActive:";
pub const RELOAD_TOKEN: &str = "Reload";
pub const CHAIN_DELIMITER: char = ',';
pub const MINUTES_PER_DAY: u32 = 24 * 60;
