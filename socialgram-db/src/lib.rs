pub mod blobs;
pub mod client;
pub mod codec;
pub mod content;
pub mod error;
pub mod gateway;
pub mod ids;
pub mod messages;
pub mod notifications;
pub mod record;
pub mod users;

pub use client::SocialgramClient;
pub use error::{Result, StoreError};
