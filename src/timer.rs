//! Rest timer - countdown between sets

/// Timer presets: (seconds, label)
pub const PRESETS: &[(u32, &str)] = &[
    (60, "Rest - 1 minute"),
    (90, "Rest - 1.5 minutes"),
    (120, "Rest - 2 minutes"),
    (300, "Quick workout - 5 minutes"),
    (600, "Medium workout - 10 minutes"),
    (1200, "Full workout - 20 minutes"),
];

pub const DEFAULT_SECS: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestTimer {
    preset: u32,
    remaining: u32,
    running: bool,
}

impl Default for RestTimer {
    fn default() -> Self {
        Self::new(DEFAULT_SECS)
    }
}

impl RestTimer {
    pub fn new(secs: u32) -> Self {
        Self {
            preset: secs,
            remaining: secs,
            running: false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn preset(&self) -> u32 {
        self.preset
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        if self.remaining > 0 {
            self.running = true;
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) {
        if self.running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Stop and go back to the preset
    pub fn reset(&mut self) {
        self.running = false;
        self.remaining = self.preset;
    }

    /// Switch preset; always resets
    pub fn set_preset(&mut self, secs: u32) {
        self.preset = secs;
        self.reset();
    }

    /// Move to the next entry of [`PRESETS`], wrapping around
    pub fn cycle_preset(&mut self) {
        let idx = PRESETS.iter().position(|(secs, _)| *secs == self.preset);
        let next = match idx {
            Some(i) => PRESETS[(i + 1) % PRESETS.len()].0,
            None => PRESETS[0].0,
        };
        self.set_preset(next);
    }

    /// Advance one second. Returns true on the tick that finishes the countdown.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            return true;
        }
        false
    }

    /// Remaining time as `MM:SS`
    pub fn display(&self) -> String {
        format_clock(self.remaining)
    }
}

pub fn format_clock(total_secs: u32) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

pub fn preset_label(secs: u32) -> Option<&'static str> {
    PRESETS.iter().find(|(s, _)| *s == secs).map(|(_, label)| *label)
}
