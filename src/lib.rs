// ABOUTME: Library module for mysql-backup
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod dump;
pub mod error;
pub mod filters;
pub mod mysql;
