//! Scheduler
//!
//! The two periodic tasks that drive the daemon: the discovery loop
//! (acquire/confirm the target) and the calibration loop (re-verify
//! presence and push the host time). They coordinate only through the
//! shared configuration handle.

use crate::domain::acquisition::{self, Calibrator, DevicePicker, DeviceScanner};
use crate::domain::models::DiscoveryResult;
use crate::domain::settings::SharedConfig;
use crate::infrastructure::bluetooth::{BleScanner, CtsCalibrator};
use crate::infrastructure::selection::ConsolePicker;
use anyhow::Result;
use tracing::{debug, info, warn};

/// Spawn both loops and run until interrupted.
pub async fn run(config: SharedConfig) -> Result<()> {
    let discovery = tokio::spawn(discovery_loop(
        config.clone(),
        BleScanner::new(),
        ConsolePicker::new(),
        CtsCalibrator::new(),
    ));
    let calibration = tokio::spawn(calibration_loop(
        config.clone(),
        BleScanner::new(),
        CtsCalibrator::new(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("interrupt received; shutting down");
    discovery.abort();
    calibration.abort();
    Ok(())
}

async fn discovery_loop<S, P, C>(config: SharedConfig, scanner: S, picker: P, calibrator: C)
where
    S: DeviceScanner + Send + 'static,
    P: DevicePicker + Send + 'static,
    C: Calibrator + Send + 'static,
{
    loop {
        let outcome = acquisition::run_tick(&config, &scanner, &picker, &calibrator).await;
        debug!("discovery tick finished: {outcome:?}");
        tokio::time::sleep(config.scan_interval()).await;
    }
}

async fn calibration_loop<S, C>(config: SharedConfig, scanner: S, calibrator: C)
where
    S: DeviceScanner + Send + 'static,
    C: Calibrator + Send + 'static,
{
    loop {
        calibration_tick(&config, &scanner, &calibrator).await;
        tokio::time::sleep(config.sync_interval()).await;
    }
}

/// One calibration tick: confirm the remembered target is still reachable,
/// then run a session against the freshly observed handle.
async fn calibration_tick<S, C>(config: &SharedConfig, scanner: &S, calibrator: &C)
where
    S: DeviceScanner,
    C: Calibrator,
{
    let target = match config.last_device() {
        Some(target) => target,
        None => {
            info!("no target device configured yet; waiting for discovery");
            return;
        }
    };

    info!("verifying {target} is in range before calibration");
    match scanner.scan(Some(&target.address)).await {
        Some(DiscoveryResult::Match(found)) => calibrator.calibrate(&found).await,
        _ => warn!("target device not visible; will retry next interval"),
    }
}
