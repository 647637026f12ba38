//! Interactive device selection
//!
//! Lists discovered devices on the console and reads the operator's pick.
//! Output goes to stdout rather than the log: this is the one interactive
//! surface the daemon has.

use crate::domain::acquisition::DevicePicker;
use crate::domain::models::DeviceRef;
use std::io::Write;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePicker;

impl ConsolePicker {
    pub fn new() -> Self {
        Self
    }
}

impl DevicePicker for ConsolePicker {
    async fn pick(&self, devices: &[DeviceRef]) -> Option<usize> {
        println!("Discovered devices:");
        for (index, device) in devices.iter().enumerate() {
            println!("[{index}] {} ({})", device.name, device.address);
        }
        print!("Enter target device number: ");
        let _ = std::io::stdout().flush();

        // stdin reads block; keep them off the runtime threads.
        let line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await
        .ok()?
        .ok()?;

        match line.trim().parse::<usize>() {
            Ok(index) if index < devices.len() => Some(index),
            Ok(index) => {
                warn!("selection {index} is out of range");
                None
            }
            Err(_) => {
                warn!("selection was not a device number");
                None
            }
        }
    }
}
