pub mod gemini;
pub mod handler;
pub mod image_reference;
pub mod matcher;

pub use gemini::GeminiFaceMatcher;
pub use handler::VerificationHandler;
