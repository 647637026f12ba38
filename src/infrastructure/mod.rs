//! Infrastructure layer: the WinRT Bluetooth stack, logging setup, and the
//! console selection prompt.

pub mod bluetooth;
pub mod logging;
pub mod selection;
