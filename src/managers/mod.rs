// Browser shell state managers
// Managers handle stateful operations: the download registry and the transfer engine.

pub mod download_manager;
pub mod download_registry;
