#![forbid(unsafe_code)]

pub mod api;
pub mod backend;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod model;
pub mod session;
pub mod store;
pub mod upload;
pub mod validation;
pub mod web;
