//! Speedcue Track Model
//!
//! Defines the GPS track contracts shared by the rest of the toolchain:
//! - **Points:** Timestamped fixes with latitude, longitude, and elevation
//! - **Geo:** Great-circle distance on a spherical Earth
//! - **GPX:** Loading track points from GPX 1.0/1.1 files
//!
//! Timestamps are always UTC. Points are kept in file order; ordering
//! problems are reported downstream, not repaired here.

pub mod geo;
pub mod gpx;
pub mod point;

pub use geo::*;
pub use gpx::*;
pub use point::*;
