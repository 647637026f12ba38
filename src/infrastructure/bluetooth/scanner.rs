//! BLE Scanner Module
//!
//! Timed advertisement sweeps for peripheral discovery.

use crate::domain::acquisition::DeviceScanner;
use crate::domain::models::{DeviceRef, DiscoveryResult};
use crate::infrastructure::bluetooth::address;
use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
    BluetoothLEScanningMode,
};
use windows::Foundation::TypedEventHandler;

/// How long one sweep listens for advertisements.
const SCAN_WINDOW: Duration = Duration::from_secs(10);

/// Placeholder for peripherals that advertise no local name.
const UNKNOWN_NAME: &str = "Unknown";

/// Advertisement-watcher based scanner.
///
/// Stateless; a fresh watcher is created per sweep so the discovery and
/// calibration loops can each carry their own instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct BleScanner;

impl BleScanner {
    pub fn new() -> Self {
        Self
    }

    /// Listen for the full window, then return the distinct devices seen,
    /// in first-seen order.
    async fn collect(&self, window: Duration) -> Result<Vec<DeviceRef>> {
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let watcher = BluetoothLEAdvertisementWatcher::new()?;
        watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;

        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let name = args.Advertisement()?.LocalName()?.to_string();
                    let raw_address = args.BluetoothAddress()?;
                    let _ = sender.send((raw_address, name));
                }
                Ok(())
            },
        );
        watcher.Received(&handler)?;
        watcher.Start()?;

        tokio::time::sleep(window).await;
        watcher.Stop()?;

        let mut devices: Vec<DeviceRef> = Vec::new();
        let mut seen: HashMap<u64, usize> = HashMap::new();
        while let Ok((raw_address, name)) = receiver.try_recv() {
            match seen.get(&raw_address) {
                Some(&slot) => {
                    // A scan response may carry the name the first
                    // advertisement lacked.
                    if devices[slot].name == UNKNOWN_NAME && !name.is_empty() {
                        devices[slot].name = name;
                    }
                }
                None => {
                    seen.insert(raw_address, devices.len());
                    devices.push(DeviceRef {
                        name: if name.is_empty() {
                            UNKNOWN_NAME.to_string()
                        } else {
                            name
                        },
                        address: address::format_address(raw_address),
                    });
                }
            }
        }

        debug!("scan window closed with {} distinct devices", devices.len());
        Ok(devices)
    }
}

impl DeviceScanner for BleScanner {
    async fn scan(&self, target_address: Option<&str>) -> Option<DiscoveryResult> {
        info!("starting BLE scan ({}s window)", SCAN_WINDOW.as_secs());
        let devices = match self.collect(SCAN_WINDOW).await {
            Ok(devices) => devices,
            Err(e) => {
                warn!("BLE scan failed: {e:#}");
                return None;
            }
        };

        match target_address {
            Some(target) => match devices.into_iter().find(|d| d.matches_address(target)) {
                Some(found) => {
                    info!("found target device: {found}");
                    Some(DiscoveryResult::Match(found))
                }
                None => {
                    info!("target device not in scan range");
                    None
                }
            },
            None => {
                if devices.is_empty() {
                    info!("no BLE devices discovered");
                    None
                } else {
                    Some(DiscoveryResult::Visible(devices))
                }
            }
        }
    }
}
