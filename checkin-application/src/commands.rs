pub mod checkin_commands;
pub mod sync_commands;
pub mod upload_commands;
