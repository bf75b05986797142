// Theme Editor Services
// Business logic layer

mod color;
mod theme_config;
mod swatch;
mod theme_store;
mod css_deployer;
mod settings_manager;
mod log_manager;
mod events;

pub use color::*;
pub use theme_config::*;
pub use swatch::*;
pub use theme_store::*;
pub use css_deployer::*;
pub use settings_manager::*;
pub use log_manager::*;
pub use events::*;
