pub mod command;
pub mod ids;
pub mod record;
pub mod time;
