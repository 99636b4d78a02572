pub mod agent;
pub mod cartridge;
pub mod errors;
pub mod orchestrator;
pub mod phase;
pub mod rewrite;
pub mod session;
pub mod ui;
