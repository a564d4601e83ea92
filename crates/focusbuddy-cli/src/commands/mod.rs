pub mod categories;
pub mod daemon;
pub mod focus;
pub mod helpers;
pub mod init;
pub mod report;
