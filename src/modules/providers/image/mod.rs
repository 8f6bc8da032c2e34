pub mod openai_images;
pub mod pexels;
pub mod placeholder;
pub mod stability;

pub use openai_images::OpenAiImageProvider;
pub use pexels::PexelsImageProvider;
pub use placeholder::GradientImageProvider;
pub use stability::StabilityImageProvider;
