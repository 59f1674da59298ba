//! Link clock activity monitor.
//!
//! The link domain emits a pulse every [`ACTIVITY_DIVIDER`] link cycles. The
//! pulses cross into the control domain, where they are counted over a fixed
//! window; at the end of each window the clock is declared active if any pulse
//! arrived.

/// Link cycles between activity pulses.
pub const ACTIVITY_DIVIDER: u32 = 16;

/// Link-domain side: divides the link clock into activity pulses.
#[derive(Debug, Clone, Default)]
pub struct ActivityDivider {
    count: u32,
}

impl ActivityDivider {
    /// Creates a divider at count 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clocks the divider; returns `true` once every [`ACTIVITY_DIVIDER`] cycles.
    pub fn tick(&mut self) -> bool {
        self.count = (self.count + 1) % ACTIVITY_DIVIDER;
        self.count == 0
    }
}

/// Control-domain side: windowed, saturating pulse counter.
#[derive(Debug, Clone)]
pub struct ClockActivityMonitor {
    window: u64,
    elapsed: u64,
    pulses: u32,
    active: bool,
}

impl ClockActivityMonitor {
    /// Creates a monitor with a window of `window` control cycles (at least 1).
    ///
    /// The clock reads inactive until the first window completes.
    pub fn new(window: u64) -> Self {
        Self {
            window: window.max(1),
            elapsed: 0,
            pulses: 0,
            active: false,
        }
    }

    /// Clocks the monitor with this cycle's synchronized pulse.
    pub fn tick(&mut self, pulse: bool) {
        if pulse {
            self.pulses = self.pulses.saturating_add(1);
        }
        self.elapsed += 1;
        if self.elapsed >= self.window {
            let active = self.pulses != 0;
            if active != self.active {
                tracing::debug!(active, pulses = self.pulses, "link clock activity changed");
            }
            self.active = active;
            self.pulses = 0;
            self.elapsed = 0;
        }
    }

    /// Activity decided at the last window boundary.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Window length in control cycles.
    pub fn window(&self) -> u64 {
        self.window
    }
}
