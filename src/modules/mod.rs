pub mod auth;
pub mod media;
pub mod providers;
pub mod queue;
pub mod social;
pub mod topic;
pub mod videos;
