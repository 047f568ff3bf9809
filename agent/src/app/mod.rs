//! Application wiring: settings, options and the run loop

pub mod options;
pub mod run;
pub mod settings;
