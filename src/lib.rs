pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod pipeline;
pub mod table;

pub use config::Config;
pub use pipeline::run;
