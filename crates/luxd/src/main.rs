//! luxd daemon
//!
//! Wires the hardware layers together and runs the control loop:
//! - enumerate displays from DRM sysfs, poll for hotplug every 2 s
//! - built-in panel via the sysfs backlight, externals via RandR gamma
//! - sub-zero dimming overlays on X11
//! - persisted brightness restored at startup, attach and wake
//! - hotkeys as unix signals: SIGUSR1 = down, SIGUSR2 = up, SIGHUP = tint
//!
//! `luxd --probe` runs a one-shot DDC/CI brightness read against every
//! external display and exits, for checking whether monitors answer on
//! their control channel.

use anyhow::{Context, Result};
use luxd_config::LuxConfig;
use luxd_control::{
    BrightnessController, ControlEvent, ControlLoop, ExternalDisplayDriver, InternalDisplayDriver,
};
use luxd_ddc::DdcTransport;
use luxd_gamma::GammaEngine;
use luxd_hal::{
    DisplayEnumerator, DisplayId, DisplayInfo, DrmEnumerator, LinuxChannelSource, locate_backlight,
};
use luxd_overlay::OverlayManager;
use luxd_store::BrightnessStore;
use luxd_x11::{DpmsMonitor, X11GammaBackend, X11OverlayProvider};
use std::collections::HashMap;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const HOTPLUG_POLL_INTERVAL: Duration = Duration::from_secs(2);
const POWER_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wall-clock drift beyond this during one poll tick means the machine was
/// suspended rather than merely busy.
const SUSPEND_JUMP_THRESHOLD: Duration = Duration::from_secs(3);

fn main() -> Result<()> {
    setup_logging();

    if std::env::args().any(|a| a == "--probe") {
        return probe();
    }

    let config = match LuxConfig::load_default() {
        Ok(config) => config,
        Err(e) => {
            warn!("Configuration unreadable ({}), using defaults", e);
            LuxConfig::default()
        }
    };
    debug!("Configuration: {:?}", config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    runtime.block_on(run(config))
}

fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

async fn run(config: LuxConfig) -> Result<()> {
    info!("luxd starting");

    let enumerator = DrmEnumerator::new();
    let displays = enumerator.enumerate().context("display enumeration")?;
    for d in &displays {
        info!(
            "Display {}: {} ({})",
            d.id,
            d.connector,
            if d.builtin { "built-in" } else { "external" }
        );
    }

    let gamma_backend =
        X11GammaBackend::connect().map_err(|e| anyhow::anyhow!("X11 gamma backend: {e}"))?;
    let overlay_provider =
        X11OverlayProvider::connect().map_err(|e| anyhow::anyhow!("X11 overlay provider: {e}"))?;

    let store = BrightnessStore::open(&config.state_path)
        .with_context(|| format!("opening state file {}", config.state_path.display()))?;

    let mut controller = BrightnessController::new(
        InternalDisplayDriver::new(locate_backlight()),
        ExternalDisplayDriver::new(GammaEngine::new(Box::new(gamma_backend))),
        OverlayManager::new(Box::new(overlay_provider)),
        store,
    );
    // Initial snapshot; attach handling restores persisted brightness
    controller.update_displays(displays.clone());

    let ddc = DdcTransport::new(Box::new(LinuxChannelSource::new()));
    let control_loop = ControlLoop::new(
        controller,
        Some(ddc),
        config.step,
        config.link_displays,
    );
    let tx = control_loop.sender();

    tokio::spawn(watch_hotplug(enumerator, displays, tx.clone()));
    tokio::spawn(watch_power(DpmsMonitor::connect().ok(), tx.clone()));
    tokio::spawn(watch_signals(tx));

    control_loop.run().await;
    info!("luxd stopped");
    Ok(())
}

/// Poll DRM sysfs and translate connector changes into control events.
async fn watch_hotplug(
    enumerator: DrmEnumerator,
    initial: Vec<DisplayInfo>,
    tx: mpsc::Sender<ControlEvent>,
) {
    let mut known: HashMap<DisplayId, DisplayInfo> =
        initial.into_iter().map(|d| (d.id, d)).collect();

    loop {
        tokio::time::sleep(HOTPLUG_POLL_INTERVAL).await;

        let current = match enumerator.enumerate() {
            Ok(displays) => displays,
            Err(e) => {
                debug!("Hotplug poll failed: {}", e);
                continue;
            }
        };
        let current: HashMap<DisplayId, DisplayInfo> =
            current.into_iter().map(|d| (d.id, d)).collect();

        for id in known.keys().copied().collect::<Vec<_>>() {
            if !current.contains_key(&id) {
                known.remove(&id);
                if tx.send(ControlEvent::DisplayRemoved(id)).await.is_err() {
                    return;
                }
            }
        }
        for (id, display) in &current {
            if !known.contains_key(id) {
                known.insert(*id, display.clone());
                let event = ControlEvent::DisplayAdded(display.clone());
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Detect screen and system wake.
///
/// Screens: DPMS power level polled for an off-to-on transition. System:
/// a wall-clock jump across one poll tick means we were suspended.
async fn watch_power(dpms: Option<DpmsMonitor>, tx: mpsc::Sender<ControlEvent>) {
    let mut screens_were_on = dpms.as_ref().map(|d| d.screens_on()).unwrap_or(true);
    let mut last_wall = std::time::SystemTime::now();

    loop {
        tokio::time::sleep(POWER_POLL_INTERVAL).await;

        let now = std::time::SystemTime::now();
        let jumped = now
            .duration_since(last_wall)
            .map(|d| d > POWER_POLL_INTERVAL + SUSPEND_JUMP_THRESHOLD)
            .unwrap_or(false);
        last_wall = now;
        if jumped {
            info!("Resume from suspend detected");
            if tx.send(ControlEvent::SystemWake).await.is_err() {
                return;
            }
        }

        if let Some(dpms) = &dpms {
            let on = dpms.screens_on();
            if on && !screens_were_on {
                info!("Screens woke from DPMS");
                if tx.send(ControlEvent::ScreensWake).await.is_err() {
                    return;
                }
            }
            screens_were_on = on;
        }
    }
}

/// Map unix signals onto control events until the loop goes away.
async fn watch_signals(tx: mpsc::Sender<ControlEvent>) {
    let mut down = match signal(SignalKind::user_defined1()) {
        Ok(s) => s,
        Err(e) => {
            warn!("SIGUSR1 handler unavailable: {}", e);
            return;
        }
    };
    let mut up = match signal(SignalKind::user_defined2()) {
        Ok(s) => s,
        Err(e) => {
            warn!("SIGUSR2 handler unavailable: {}", e);
            return;
        }
    };
    let mut tint = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            warn!("SIGHUP handler unavailable: {}", e);
            return;
        }
    };
    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("SIGTERM handler unavailable: {}", e);
            return;
        }
    };

    loop {
        let event = tokio::select! {
            _ = down.recv() => ControlEvent::BrightnessDelta { display: None, steps: -1 },
            _ = up.recv() => ControlEvent::BrightnessDelta { display: None, steps: 1 },
            _ = tint.recv() => ControlEvent::ToggleTint { display: None },
            _ = term.recv() => ControlEvent::Shutdown,
            _ = tokio::signal::ctrl_c() => ControlEvent::Shutdown,
        };
        let stop = matches!(event, ControlEvent::Shutdown);
        if tx.send(event).await.is_err() || stop {
            return;
        }
    }
}

/// One-shot DDC/CI diagnostic over every external display.
fn probe() -> Result<()> {
    let displays = DrmEnumerator::new().enumerate().context("display enumeration")?;
    let mut transport = DdcTransport::new(Box::new(LinuxChannelSource::new()));
    let mut externals = 0;

    for display in displays.iter().filter(|d| !d.builtin) {
        externals += 1;
        match transport.read_brightness(display) {
            Ok(reply) => println!(
                "{}: brightness {}/{}",
                display.connector, reply.current, reply.max
            ),
            Err(e) => println!("{}: no DDC response ({})", display.connector, e),
        }
    }

    if externals == 0 {
        println!("no external displays connected");
    }
    Ok(())
}
