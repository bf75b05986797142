// Theme Editor Models
// Data structures for the application

mod settings;
mod theme;

pub use settings::*;
pub use theme::*;
