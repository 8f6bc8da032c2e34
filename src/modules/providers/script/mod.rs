pub mod gemini;
pub mod openai_chat;
pub mod template;

pub use gemini::GeminiScriptProvider;
pub use openai_chat::ChatCompletionsProvider;
pub use template::TemplateScriptProvider;
