//! Device acquisition
//!
//! Decides, once per discovery tick, whether to confirm the remembered
//! target, ask the operator to pick a new one, or report that nothing is in
//! range. The machine is re-derived from the persisted config on every tick,
//! so only the config is durable state.

use crate::domain::models::{DeviceRef, DiscoveryResult};
use crate::domain::settings::SharedConfig;
use tracing::info;

/// One timed BLE sweep.
///
/// With a `target_address` the scan resolves to at most one
/// case-insensitive match; without one it returns everything visible.
/// Transport failures collapse to `None`, same as an empty scan.
pub trait DeviceScanner {
    fn scan(
        &self,
        target_address: Option<&str>,
    ) -> impl std::future::Future<Output = Option<DiscoveryResult>> + Send;
}

/// The interactive selection collaborator: given an ordered candidate list,
/// returns a zero-based index or nothing.
pub trait DevicePicker {
    fn pick(&self, devices: &[DeviceRef]) -> impl std::future::Future<Output = Option<usize>> + Send;
}

/// One best-effort calibration session against a connected-capable device.
/// Failures are logged inside, not returned.
pub trait Calibrator {
    fn calibrate(&self, device: &DeviceRef) -> impl std::future::Future<Output = ()> + Send;
}

/// How a discovery tick ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing in range to confirm or choose from
    NothingVisible,
    /// Candidates were listed but none was selected
    NoSelection,
    /// Remembered target seen again; record refreshed, no calibration
    Reconfirmed,
    /// A first or replacement target was bound and calibrated
    Selected,
}

enum AcquisitionState {
    NoTarget,
    TargetKnown(DeviceRef),
    AwaitingSelection(Vec<DeviceRef>),
    TargetConfirmed {
        device: DeviceRef,
        first_binding: bool,
    },
}

/// Run one acquisition tick.
///
/// A confirmation of the remembered device refreshes the persisted record
/// but deliberately does not calibrate; only a first or replacement
/// selection triggers the immediate calibration pass. Drift correction is
/// the calibration loop's job.
pub async fn run_tick<S, P, C>(
    config: &SharedConfig,
    scanner: &S,
    picker: &P,
    calibrator: &C,
) -> TickOutcome
where
    S: DeviceScanner,
    P: DevicePicker,
    C: Calibrator,
{
    let mut state = match config.last_device() {
        Some(device) => AcquisitionState::TargetKnown(device),
        None => AcquisitionState::NoTarget,
    };

    loop {
        state = match state {
            AcquisitionState::NoTarget => {
                info!("no target device configured; scanning for candidates");
                match scanner.scan(None).await {
                    Some(DiscoveryResult::Visible(devices)) if !devices.is_empty() => {
                        AcquisitionState::AwaitingSelection(devices)
                    }
                    _ => {
                        info!("no devices available to choose from");
                        return TickOutcome::NothingVisible;
                    }
                }
            }
            AcquisitionState::TargetKnown(remembered) => {
                match scanner.scan(Some(&remembered.address)).await {
                    Some(DiscoveryResult::Match(found)) => AcquisitionState::TargetConfirmed {
                        device: found,
                        first_binding: false,
                    },
                    _ => {
                        info!("remembered device {remembered} not in range; choosing a replacement");
                        match scanner.scan(None).await {
                            Some(DiscoveryResult::Visible(devices)) if !devices.is_empty() => {
                                AcquisitionState::AwaitingSelection(devices)
                            }
                            _ => {
                                info!("no devices available to choose from");
                                return TickOutcome::NothingVisible;
                            }
                        }
                    }
                }
            }
            AcquisitionState::AwaitingSelection(devices) => match picker.pick(&devices).await {
                Some(index) if index < devices.len() => AcquisitionState::TargetConfirmed {
                    device: devices[index].clone(),
                    first_binding: true,
                },
                _ => {
                    info!("no device selected");
                    return TickOutcome::NoSelection;
                }
            },
            AcquisitionState::TargetConfirmed {
                device,
                first_binding,
            } => {
                config.set_last_device(device.clone());
                if first_binding {
                    calibrator.calibrate(&device).await;
                    return TickOutcome::Selected;
                }
                info!("confirmed target device {device}");
                return TickOutcome::Reconfirmed;
            }
        };
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::Mutex;

    /// Scripted scanner: targeted scans match against `targeted`, broad
    /// scans return `visible`. Every call is recorded.
    pub struct FakeScanner {
        pub targeted: Option<DeviceRef>,
        pub visible: Vec<DeviceRef>,
        pub calls: Mutex<Vec<Option<String>>>,
    }

    impl FakeScanner {
        pub fn new(targeted: Option<DeviceRef>, visible: Vec<DeviceRef>) -> Self {
            Self {
                targeted,
                visible,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl DeviceScanner for FakeScanner {
        async fn scan(&self, target_address: Option<&str>) -> Option<DiscoveryResult> {
            self.calls
                .lock()
                .unwrap()
                .push(target_address.map(str::to_string));
            match target_address {
                Some(address) => self
                    .targeted
                    .clone()
                    .filter(|d| d.matches_address(address))
                    .map(DiscoveryResult::Match),
                None => {
                    if self.visible.is_empty() {
                        None
                    } else {
                        Some(DiscoveryResult::Visible(self.visible.clone()))
                    }
                }
            }
        }
    }

    pub struct FakePicker {
        pub selection: Option<usize>,
    }

    impl DevicePicker for FakePicker {
        async fn pick(&self, _devices: &[DeviceRef]) -> Option<usize> {
            self.selection
        }
    }

    #[derive(Default)]
    pub struct FakeCalibrator {
        pub calibrated: Mutex<Vec<DeviceRef>>,
    }

    impl Calibrator for FakeCalibrator {
        async fn calibrate(&self, device: &DeviceRef) {
            self.calibrated.lock().unwrap().push(device.clone());
        }
    }

    pub fn device(name: &str, address: &str) -> DeviceRef {
        DeviceRef {
            name: name.to_string(),
            address: address.to_string(),
        }
    }

    pub fn temp_shared_config(tag: &str) -> SharedConfig {
        let path = std::env::temp_dir().join(format!(
            "cts_time_sync_acq_{}_{tag}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        SharedConfig::new(crate::domain::settings::ConfigStore::load_from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;

    #[tokio::test]
    async fn empty_scan_with_no_target_changes_nothing() {
        let config = temp_shared_config("empty_scan");
        let scanner = FakeScanner::new(None, Vec::new());
        let picker = FakePicker { selection: Some(0) };
        let calibrator = FakeCalibrator::default();

        let outcome = run_tick(&config, &scanner, &picker, &calibrator).await;

        assert_eq!(outcome, TickOutcome::NothingVisible);
        assert_eq!(config.last_device(), None);
        assert!(calibrator.calibrated.lock().unwrap().is_empty());
        assert_eq!(*scanner.calls.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn first_selection_persists_and_calibrates_once() {
        let config = temp_shared_config("first_selection");
        let device_a = device("Watch A", "AA:BB:CC:DD:EE:FF");
        let device_b = device("Watch B", "11:22:33:44:55:66");
        let scanner = FakeScanner::new(None, vec![device_a.clone(), device_b]);
        let picker = FakePicker { selection: Some(0) };
        let calibrator = FakeCalibrator::default();

        let outcome = run_tick(&config, &scanner, &picker, &calibrator).await;

        assert_eq!(outcome, TickOutcome::Selected);
        assert_eq!(config.last_device(), Some(device_a.clone()));
        assert_eq!(*calibrator.calibrated.lock().unwrap(), vec![device_a]);
    }

    #[tokio::test]
    async fn reconfirmation_updates_record_without_calibrating() {
        let config = temp_shared_config("reconfirm");
        config.set_last_device(device("Watch", "AA:BB:CC:DD:EE:FF"));
        // The peripheral now advertises a refreshed name and lowercase
        // address; the stored record must still match and be replaced.
        let refreshed = device("Watch v2", "aa:bb:cc:dd:ee:ff");
        let scanner = FakeScanner::new(Some(refreshed.clone()), Vec::new());
        let picker = FakePicker { selection: None };
        let calibrator = FakeCalibrator::default();

        let outcome = run_tick(&config, &scanner, &picker, &calibrator).await;

        assert_eq!(outcome, TickOutcome::Reconfirmed);
        assert_eq!(config.last_device(), Some(refreshed));
        assert!(calibrator.calibrated.lock().unwrap().is_empty());
        assert_eq!(
            *scanner.calls.lock().unwrap(),
            vec![Some("AA:BB:CC:DD:EE:FF".to_string())]
        );
    }

    #[tokio::test]
    async fn lost_target_forces_repick_and_calibrates_once() {
        let config = temp_shared_config("lost_target");
        config.set_last_device(device("Old Watch", "AA:BB:CC:DD:EE:FF"));
        let replacement = device("New Watch", "11:22:33:44:55:66");
        let scanner = FakeScanner::new(None, vec![replacement.clone()]);
        let picker = FakePicker { selection: Some(0) };
        let calibrator = FakeCalibrator::default();

        let outcome = run_tick(&config, &scanner, &picker, &calibrator).await;

        assert_eq!(outcome, TickOutcome::Selected);
        assert_eq!(config.last_device(), Some(replacement.clone()));
        assert_eq!(*calibrator.calibrated.lock().unwrap(), vec![replacement]);
        // Targeted miss first, then the broad rescan.
        assert_eq!(
            *scanner.calls.lock().unwrap(),
            vec![Some("AA:BB:CC:DD:EE:FF".to_string()), None]
        );
    }

    #[tokio::test]
    async fn out_of_range_selection_leaves_config_untouched() {
        let config = temp_shared_config("bad_index");
        let scanner = FakeScanner::new(
            None,
            vec![device("A", "AA:AA:AA:AA:AA:AA"), device("B", "BB:BB:BB:BB:BB:BB")],
        );
        let picker = FakePicker { selection: Some(7) };
        let calibrator = FakeCalibrator::default();

        let outcome = run_tick(&config, &scanner, &picker, &calibrator).await;

        assert_eq!(outcome, TickOutcome::NoSelection);
        assert_eq!(config.last_device(), None);
        assert!(calibrator.calibrated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn declined_selection_leaves_config_untouched() {
        let config = temp_shared_config("no_pick");
        let scanner = FakeScanner::new(None, vec![device("A", "AA:AA:AA:AA:AA:AA")]);
        let picker = FakePicker { selection: None };
        let calibrator = FakeCalibrator::default();

        let outcome = run_tick(&config, &scanner, &picker, &calibrator).await;

        assert_eq!(outcome, TickOutcome::NoSelection);
        assert_eq!(config.last_device(), None);
        assert!(calibrator.calibrated.lock().unwrap().is_empty());
    }
}
