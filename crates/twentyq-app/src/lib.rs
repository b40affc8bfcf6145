#![deny(warnings)]
//! Terminal front end for the twentyq engine.

pub mod console;
pub mod logging;

pub use console::{Console, Ending};
