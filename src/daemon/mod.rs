// src/daemon/mod.rs

//! Daemon supervision: one [`DaemonPen`] per block, grouped in a
//! [`DaemonWorld`].

pub mod pen;
pub mod world;

pub use pen::{DaemonPen, PenState};
pub use world::DaemonWorld;
