pub mod genai_client;

pub use genai_client::{AiClient, GoogleGenerativeAIClient};
