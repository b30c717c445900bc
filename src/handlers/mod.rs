pub mod config;
pub mod pipeline;
pub mod ui;

pub use config::*;
pub use pipeline::*;
pub use ui::*;
