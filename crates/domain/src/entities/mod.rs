//! 领域实体

pub mod message;

pub use message::Message;
