// Theme Editor Server
// Theme records, swatch colors and stylesheet deployment

pub mod commands;
pub mod models;
pub mod services;
