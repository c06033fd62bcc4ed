mod common;
mod config_file;
mod emergency_stop;
mod faults;
mod gating;
mod properties;
