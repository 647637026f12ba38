//! Domain layer: models, persisted configuration, and the acquisition
//! state machine. Nothing in here touches the BLE stack directly.

pub mod acquisition;
pub mod models;
pub mod settings;
