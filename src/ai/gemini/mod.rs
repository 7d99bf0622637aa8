pub mod client;
pub mod theme;
pub mod types;

pub use client::GeminiHttpClient;
pub use theme::GeminiThemeClient;
