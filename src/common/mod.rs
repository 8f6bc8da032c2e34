pub mod error;
pub mod extract;
pub mod media;
pub mod response;
pub mod scheduler;
pub mod security;
