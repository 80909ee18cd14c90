// ABOUTME: Command implementations for the backup tool
// ABOUTME: Exports the backup command

pub mod backup;

pub use backup::backup;
