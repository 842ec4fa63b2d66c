pub mod clock;
pub mod config;
pub mod currency;
pub mod domain;
pub mod error;
pub mod locations;
pub mod logging;
pub mod pipeline;
