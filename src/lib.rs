#![recursion_limit = "256"]

//! Siamese patch similarity: train a weight-sharing two-branch
//! network on image patch pairs with Burn, predict over pair
//! archives, and score candidate patches against a target.

pub mod application;
pub mod backend;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod infra;
pub mod ml;

pub use error::{Result, SiameseError};
