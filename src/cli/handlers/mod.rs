// src/cli/handlers/mod.rs

pub mod add;
pub mod args;
pub mod commons;
pub mod delete;
pub mod exec;
pub mod mkdir;
pub mod run;
pub mod show;
pub mod tree;
