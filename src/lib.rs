pub mod app;
pub mod command;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod normalize;
pub mod publish;
pub mod swarm;
pub mod workspace;
