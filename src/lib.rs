// lib.rs - Library root for wrapabbr

pub mod buffer;
pub mod cli;
pub mod command;
pub mod config;
pub mod content;
pub mod context;
pub mod engine;
pub mod preview;
pub mod region;
pub mod snippet;
pub mod syntax;
