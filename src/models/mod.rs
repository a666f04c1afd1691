pub mod catalog;
pub mod config;
pub mod frame;
pub mod recognition;
pub mod region;
