//! CTS Connection Module
//!
//! Scoped GATT access to one peripheral's Current Time characteristic.

use crate::infrastructure::bluetooth::{address, protocol};
use anyhow::{Context, Result};
use tracing::debug;
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattCommunicationStatus,
};
use windows::Devices::Bluetooth::{BluetoothConnectionStatus, BluetoothLEDevice};
use windows::Storage::Streams::{DataReader, DataWriter};

/// A live connection to a peripheral's Current Time characteristic.
///
/// The device handle is closed in `Drop`, so the link is released on every
/// exit path of the session that opened it.
pub struct CtsConnection {
    device: BluetoothLEDevice,
    characteristic: GattCharacteristic,
}

impl CtsConnection {
    /// Connect to a peripheral by its rendered address and resolve the
    /// Current Time characteristic.
    pub async fn open(device_address: &str) -> Result<Self> {
        let raw_address = address::parse_address(device_address)?;
        let device = BluetoothLEDevice::FromBluetoothAddressAsync(raw_address)?
            .await
            .context("device unreachable")?;
        let characteristic = Self::current_time_characteristic(&device).await?;
        Ok(Self {
            device,
            characteristic,
        })
    }

    async fn current_time_characteristic(
        device: &BluetoothLEDevice,
    ) -> Result<GattCharacteristic> {
        let service_uuid = protocol::parse_uuid(protocol::CTS_SERVICE_UUID)?;
        let char_uuid = protocol::parse_uuid(protocol::CURRENT_TIME_CHAR_UUID)?;

        let services_result = device.GetGattServicesForUuidAsync(service_uuid)?.await?;
        if services_result.Status()? != GattCommunicationStatus::Success {
            anyhow::bail!(
                "failed to enumerate GATT services: {:?}",
                services_result.Status()?
            );
        }
        let services = services_result.Services()?;
        if services.Size()? == 0 {
            anyhow::bail!("peripheral does not expose the Current Time Service");
        }
        let service = services.GetAt(0)?;
        debug!("found Current Time Service");

        // Request access up front; unpaired GATT reads can fail without it.
        let access_status = service.RequestAccessAsync()?.await?;
        debug!("service access status: {:?}", access_status);

        let chars_result = service.GetCharacteristicsAsync()?.await?;
        if chars_result.Status()? != GattCommunicationStatus::Success {
            anyhow::bail!(
                "failed to enumerate characteristics: {:?}",
                chars_result.Status()?
            );
        }

        let characteristics = chars_result.Characteristics()?;
        for i in 0..characteristics.Size()? {
            let characteristic = characteristics.GetAt(i)?;
            if characteristic.Uuid()? == char_uuid {
                debug!("found Current Time characteristic");
                return Ok(characteristic);
            }
        }
        anyhow::bail!("Current Time characteristic not found")
    }

    /// Check the link actually came up; GATT enumeration alone can succeed
    /// from cache.
    pub fn is_connected(&self) -> bool {
        self.device
            .ConnectionStatus()
            .map(|s| s == BluetoothConnectionStatus::Connected)
            .unwrap_or(false)
    }

    /// Write one Current Time payload.
    pub async fn write_current_time(&self, payload: &[u8]) -> Result<()> {
        let writer = DataWriter::new()?;
        writer.WriteBytes(payload)?;
        let buffer = writer.DetachBuffer()?;

        let status = self.characteristic.WriteValueAsync(&buffer)?.await?;
        if status != GattCommunicationStatus::Success {
            anyhow::bail!("time write rejected: {:?}", status);
        }
        Ok(())
    }

    /// Read back the peripheral's reported Current Time bytes.
    pub async fn read_current_time(&self) -> Result<Vec<u8>> {
        let read_result = self.characteristic.ReadValueAsync()?.await?;
        if read_result.Status()? != GattCommunicationStatus::Success {
            anyhow::bail!("time read failed: {:?}", read_result.Status()?);
        }

        let buffer = read_result.Value()?;
        let reader = DataReader::FromBuffer(&buffer)?;
        let mut bytes = vec![0u8; reader.UnconsumedBufferLength()? as usize];
        reader.ReadBytes(&mut bytes)?;
        Ok(bytes)
    }
}

impl Drop for CtsConnection {
    fn drop(&mut self) {
        let _ = self.device.Close();
    }
}
