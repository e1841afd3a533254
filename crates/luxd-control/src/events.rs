//! Control event loop
//!
//! A single-threaded async consumer over an mpsc channel. Hotkeys, hotplug
//! and wake notifications all arrive as `ControlEvent`s; the loop routes
//! them into the controller one at a time, so no controller state is ever
//! shared across tasks. The DDC settle wait inside a brightness transaction
//! blocks the loop for its fixed 40 ms, which is acceptable for a control
//! surface driven by human-scale events.
//!
//! Wake handling: displays tend to come back from DPMS/suspend before their
//! hardware accepts commands, so the persisted brightness is re-applied on a
//! ladder of delays. Each wake bumps a generation counter and tags its
//! scheduled re-applies with it; a newer wake makes older schedules stale and
//! they are dropped on arrival. Re-applying an unchanged value is idempotent,
//! so overlapping ladders are harmless either way.

use crate::controller::BrightnessController;
use luxd_ddc::DdcTransport;
use luxd_hal::{DisplayId, DisplayInfo};
use std::time::Duration;
use tokio::sync::mpsc;

/// Re-apply delays after the screens wake from DPMS, in seconds.
pub const SCREEN_WAKE_DELAYS: [f64; 3] = [0.5, 1.5, 3.0];
/// Re-apply delays after the system resumes from suspend, in seconds.
pub const SYSTEM_WAKE_DELAYS: [f64; 3] = [1.0, 2.5, 5.0];

const EVENT_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub enum ControlEvent {
    DisplayAdded(DisplayInfo),
    DisplayRemoved(DisplayId),
    ScreensWake,
    SystemWake,
    /// Hotkey step; `display: None` targets the linked set or the default
    /// display depending on configuration.
    BrightnessDelta {
        display: Option<DisplayId>,
        steps: i32,
    },
    ToggleTint {
        display: Option<DisplayId>,
    },
    /// Scheduled wake re-apply; dropped when `generation` is stale.
    RestoreAll {
        generation: u64,
    },
    Shutdown,
}

pub struct ControlLoop {
    controller: BrightnessController,
    /// Kept for channel-cache maintenance on hotplug; brightness routing
    /// itself never goes through DDC.
    ddc: Option<DdcTransport>,
    step: f64,
    link_displays: bool,
    tx: mpsc::Sender<ControlEvent>,
    rx: mpsc::Receiver<ControlEvent>,
    wake_generation: u64,
}

impl ControlLoop {
    pub fn new(
        controller: BrightnessController,
        ddc: Option<DdcTransport>,
        step: f64,
        link_displays: bool,
    ) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        Self {
            controller,
            ddc,
            step,
            link_displays,
            tx,
            rx,
            wake_generation: 0,
        }
    }

    /// Sender half for event producers (signal handlers, hotplug watcher).
    pub fn sender(&self) -> mpsc::Sender<ControlEvent> {
        self.tx.clone()
    }

    /// Consume events until `Shutdown` or every sender is gone.
    pub async fn run(mut self) {
        tracing::info!("Control loop started");
        while let Some(event) = self.rx.recv().await {
            if !self.handle(event) {
                break;
            }
        }
        self.controller.release_all();
        tracing::info!("Control loop stopped");
    }

    /// Apply one event; false means shut down.
    fn handle(&mut self, event: ControlEvent) -> bool {
        match event {
            ControlEvent::DisplayAdded(display) => {
                let mut snapshot = self.controller.snapshot();
                snapshot.retain(|d| d.id != display.id);
                snapshot.push(display);
                self.apply_snapshot(snapshot);
            }
            ControlEvent::DisplayRemoved(display) => {
                let mut snapshot = self.controller.snapshot();
                snapshot.retain(|d| d.id != display);
                self.apply_snapshot(snapshot);
            }
            ControlEvent::ScreensWake => {
                tracing::info!("Screens woke up, scheduling brightness re-apply");
                self.schedule_restores(&SCREEN_WAKE_DELAYS);
            }
            ControlEvent::SystemWake => {
                tracing::info!("System resumed, scheduling brightness re-apply");
                self.schedule_restores(&SYSTEM_WAKE_DELAYS);
            }
            ControlEvent::BrightnessDelta { display, steps } => {
                let delta = f64::from(steps) * self.step;
                for target in self.targets(display) {
                    self.controller.adjust_brightness(target, delta);
                }
            }
            ControlEvent::ToggleTint { display } => {
                for target in self.targets(display) {
                    self.controller.toggle_warm_tint(target);
                }
            }
            ControlEvent::RestoreAll { generation } => {
                if generation == self.wake_generation {
                    self.controller.restore_all();
                } else {
                    tracing::debug!(
                        "Dropping stale wake re-apply (generation {} < {})",
                        generation,
                        self.wake_generation
                    );
                }
            }
            ControlEvent::Shutdown => {
                tracing::info!("Shutdown requested");
                return false;
            }
        }
        true
    }

    fn apply_snapshot(&mut self, snapshot: Vec<DisplayInfo>) {
        let present: Vec<DisplayId> = snapshot.iter().map(|d| d.id).collect();
        self.controller.update_displays(snapshot);
        if let Some(ddc) = &mut self.ddc {
            ddc.resolver_mut().retain_present(&present);
        }
    }

    fn targets(&self, display: Option<DisplayId>) -> Vec<DisplayId> {
        match display {
            Some(id) => vec![id],
            None if self.link_displays => self.controller.display_ids(),
            None => self.controller.default_target().into_iter().collect(),
        }
    }

    fn schedule_restores(&mut self, delays: &[f64]) {
        self.wake_generation += 1;
        let generation = self.wake_generation;

        for &delay in delays {
            let tx = self.tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                // The loop may already be gone at shutdown
                let _ = tx.send(ControlEvent::RestoreAll { generation }).await;
            });
        }
    }
}
