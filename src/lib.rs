pub mod chat;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod gateway_client;
pub mod replicate;
pub mod web_server;

pub use conversation::{ConversationState, ImageGateway, Role, Transcript, TranscriptEntry};
pub use error::GatewayError;
pub use gateway::Gateway;
pub use replicate::ImageOutput;
