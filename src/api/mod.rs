pub mod chat_completions;
pub mod landing;
pub mod models;
