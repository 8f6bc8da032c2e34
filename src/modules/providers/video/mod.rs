pub mod bytez;
pub mod fal;
pub mod heygen;
pub mod replicate;
pub mod skyreels;

pub use bytez::BytezVideoProvider;
pub use fal::FalVideoProvider;
pub use heygen::HeyGenProvider;
pub use replicate::ReplicateVideoProvider;
pub use skyreels::SkyReelsProvider;
