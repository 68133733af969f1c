#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub mod encoding;
pub mod geometry;
pub mod ini;
pub mod stations;
pub mod svg;
pub mod values;
pub mod vec;
