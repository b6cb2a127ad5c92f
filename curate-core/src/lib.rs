#![allow(clippy::new_without_default)]

pub mod config;
pub mod curator;
pub mod error;
pub mod heuristic;
pub mod item;
pub mod ledger;
pub mod projection;
pub mod promise;
pub mod propagate;
pub mod sequence;
pub mod worker;
