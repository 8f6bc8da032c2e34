//! Background work: the two timer-driven jobs and the scene renderer.

pub mod auto_poster;
pub mod renderer;
pub mod status_poller;
