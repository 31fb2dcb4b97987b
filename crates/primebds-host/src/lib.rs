//! Console host for PrimeBDS: a simulated Bedrock server that feeds plugin
//! events from stdin and applies the side effects plugins request.

pub mod config;
pub mod console;
pub mod plugin_manager;
