//! Drawing and overlay engine for interactive price charts: anchored
//! annotations in time/price space, their pixel geometry, pointer and
//! keyboard editing, frame-coalesced painting and debounced persistence.

pub mod app;
pub mod coords;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod model;
pub mod persist;
pub mod render;
pub mod settings;
pub mod store;
