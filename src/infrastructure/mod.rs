// Infrastructure module - platform ports, settings persistence, logging
pub mod logging;
pub mod ports;
pub mod settings;
