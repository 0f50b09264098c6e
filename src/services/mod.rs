pub mod chat;
pub mod directory;
pub mod messaging;
pub mod read_state;
pub mod report;
