extern crate nalgebra as na;

pub mod anchor;
pub mod animation;
pub mod category;
pub mod poi;
pub mod prelude;
