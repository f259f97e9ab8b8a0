//! FinOps hub service: HTTP surface and configuration around `hub-lib`

pub mod api;
pub mod config;
