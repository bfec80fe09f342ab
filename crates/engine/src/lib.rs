pub mod cli;
pub mod client;
pub mod config;
pub mod output;
pub mod reload;
pub mod shutdown;
pub mod sync;
pub mod writer;
