pub mod chat;
pub mod listing;
pub mod message;
pub mod report;
pub mod user;
