pub mod admin;
pub mod config;
pub mod credentials;
pub mod fetch;
pub mod judging;
pub mod model;
pub mod output;
pub mod provider;
pub mod scoring;
pub mod session;
pub mod stderr_buffer;
pub mod tui;
