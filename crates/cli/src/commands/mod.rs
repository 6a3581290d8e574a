pub mod analyze;
pub mod chat;
pub mod init;
pub mod status;
