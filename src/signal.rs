//! Status signaling engine.
//!
//! Maps combined system state to a pattern pair for the two bi-color
//! indicators plus the buzzer alarm flag, then renders those patterns on a
//! fixed tick with a phase counter.
//!
//! The mapping is a priority-ordered decision table — an explicit slice of
//! `(predicate, Selection)` rows, first match wins — so tests can enumerate
//! it directly.
//!
//! ## Rendering
//!
//! A phase counter increments on every render and wraps modulo 4.
//!
//! | Pattern      | Output                                       |
//! |--------------|----------------------------------------------|
//! | Off          | both anodes off                              |
//! | Red / Green  | solid                                        |
//! | FlashRed/Grn | on while phase ≥ 2                           |
//! | FastRed/Grn  | toggles every render tick                    |
//!
//! The buzzer sounds on phase ≥ 2 while the alarm is asserted or a Fast
//! pattern is active. A render is forced immediately (bypassing the period)
//! whenever the selected pattern pair differs from the last rendered pair,
//! so genuine state changes reach the indicators without lag.

use crate::sensors::battery::VoltageAlarmLevel;

/// Pattern code for one bi-color indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedPattern {
    Off,
    Red,
    Green,
    FlashRed,
    FlashGreen,
    FastRed,
    FastGreen,
}

impl LedPattern {
    fn is_fast(self) -> bool {
        matches!(self, Self::FastRed | Self::FastGreen)
    }
}

/// Inputs to the decision table — one row of combined system state.
#[derive(Debug, Clone, Copy)]
pub struct SignalInputs {
    pub power_present: bool,
    pub output_enabled: bool,
    pub charging: bool,
    pub fan_running: bool,
    pub alarm_level: VoltageAlarmLevel,
}

/// One decision table outcome: the two indicator patterns and the alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Power indicator pattern.
    pub power_led: LedPattern,
    /// Status indicator pattern.
    pub status_led: LedPattern,
    /// Audible alarm asserted.
    pub alarm: bool,
}

const OFF: Selection = Selection {
    power_led: LedPattern::Off,
    status_led: LedPattern::Off,
    alarm: false,
};

/// Priority-ordered decision table, highest priority first.
///
/// External power rows come before battery rows; within each group the more
/// specific condition wins. The final catch-all covers the switch-off,
/// fan-off idle state.
pub const DECISION_TABLE: &[(fn(&SignalInputs) -> bool, Selection)] = &[
    // Output on, external power.
    (
        |s| s.power_present && s.output_enabled,
        Selection {
            power_led: LedPattern::Green,
            status_led: LedPattern::Green,
            alarm: false,
        },
    ),
    // Output off, external power, charging.
    (
        |s| s.power_present && s.charging,
        Selection {
            power_led: LedPattern::FlashRed,
            status_led: LedPattern::Off,
            alarm: false,
        },
    ),
    // Output off, external power, fan running.
    (
        |s| s.power_present && s.fan_running,
        Selection {
            power_led: LedPattern::Off,
            status_led: LedPattern::FlashGreen,
            alarm: false,
        },
    ),
    // Output off, external power, idle.
    (|s| s.power_present, OFF),
    // Output on, battery power, battery very low — sound the alarm.
    (
        |s| s.output_enabled && s.alarm_level == VoltageAlarmLevel::VeryLow,
        Selection {
            power_led: LedPattern::FastRed,
            status_led: LedPattern::Off,
            alarm: true,
        },
    ),
    // Output on, battery power, battery low.
    (
        |s| s.output_enabled && s.alarm_level == VoltageAlarmLevel::Low,
        Selection {
            power_led: LedPattern::FlashRed,
            status_led: LedPattern::Off,
            alarm: false,
        },
    ),
    // Output on, battery power.
    (
        |s| s.output_enabled,
        Selection {
            power_led: LedPattern::Red,
            status_led: LedPattern::Off,
            alarm: false,
        },
    ),
    // Output off, battery power, fan still running.
    (
        |s| s.fan_running,
        Selection {
            power_led: LedPattern::FlashRed,
            status_led: LedPattern::Off,
            alarm: false,
        },
    ),
];

/// Evaluate the table: first matching row wins, fallback all-off.
pub fn select(inputs: &SignalInputs) -> Selection {
    for (predicate, selection) in DECISION_TABLE {
        if predicate(inputs) {
            return *selection;
        }
    }
    OFF
}

// ───────────────────────────────────────────────────────────────
// Renderer
// ───────────────────────────────────────────────────────────────

/// Concrete line levels for one render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorFrame {
    pub power_red: bool,
    pub power_green: bool,
    pub status_red: bool,
    pub status_green: bool,
    pub buzzer: bool,
}

/// Renders pattern pairs into line levels on a fixed tick.
pub struct PatternRenderer {
    period_ms: u32,
    phase: u8,
    last_pair: Option<(LedPattern, LedPattern)>,
    last_render_ms: u32,
    levels: IndicatorFrame,
}

impl PatternRenderer {
    pub fn new(period_ms: u32, now_ms: u32) -> Self {
        Self {
            period_ms,
            phase: 0,
            last_pair: None,
            last_render_ms: now_ms,
            levels: IndicatorFrame::default(),
        }
    }

    /// Advance the renderer. Returns `Some(frame)` when the indicators must
    /// be rewritten this pass: either the render period elapsed, or the
    /// selected pattern pair changed since the last render (forced).
    pub fn update(&mut self, now_ms: u32, selection: &Selection) -> Option<IndicatorFrame> {
        let pair = (selection.power_led, selection.status_led);
        let forced = self.last_pair != Some(pair);
        let periodic = now_ms.wrapping_sub(self.last_render_ms) >= self.period_ms;
        if !forced && !periodic {
            return None;
        }
        if forced {
            log::debug!("signal: forcing render, pattern pair changed");
        }
        if periodic {
            self.last_render_ms = now_ms;
        }

        self.phase = (self.phase + 1) & 0x03;
        self.last_pair = Some(pair);

        let (power_red, power_green) = self.channel(
            selection.power_led,
            self.levels.power_red,
            self.levels.power_green,
        );
        let (status_red, status_green) = self.channel(
            selection.status_led,
            self.levels.status_red,
            self.levels.status_green,
        );

        let fast_active = selection.power_led.is_fast() || selection.status_led.is_fast();
        let buzzer = (selection.alarm || fast_active) && self.phase >= 2;

        self.levels = IndicatorFrame {
            power_red,
            power_green,
            status_red,
            status_green,
            buzzer,
        };
        Some(self.levels)
    }

    fn channel(&self, pattern: LedPattern, prev_red: bool, prev_green: bool) -> (bool, bool) {
        match pattern {
            LedPattern::Off => (false, false),
            LedPattern::Red => (true, false),
            LedPattern::Green => (false, true),
            LedPattern::FlashRed => (self.phase >= 2, false),
            LedPattern::FlashGreen => (false, self.phase >= 2),
            LedPattern::FastRed => (!prev_red, false),
            LedPattern::FastGreen => (false, !prev_green),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> SignalInputs {
        SignalInputs {
            power_present: false,
            output_enabled: false,
            charging: false,
            fan_running: false,
            alarm_level: VoltageAlarmLevel::Normal,
        }
    }

    #[test]
    fn external_power_output_on_is_green_green() {
        let sel = select(&SignalInputs {
            power_present: true,
            output_enabled: true,
            ..inputs()
        });
        assert_eq!(sel.power_led, LedPattern::Green);
        assert_eq!(sel.status_led, LedPattern::Green);
        assert!(!sel.alarm);
    }

    #[test]
    fn charging_beats_fan() {
        let sel = select(&SignalInputs {
            power_present: true,
            charging: true,
            fan_running: true,
            ..inputs()
        });
        assert_eq!(sel.power_led, LedPattern::FlashRed);
        assert_eq!(sel.status_led, LedPattern::Off);
    }

    #[test]
    fn battery_idle_is_red_off() {
        let sel = select(&SignalInputs {
            output_enabled: true,
            ..inputs()
        });
        assert_eq!(sel.power_led, LedPattern::Red);
        assert_eq!(sel.status_led, LedPattern::Off);
        assert!(!sel.alarm);
    }

    #[test]
    fn very_low_on_battery_sounds_alarm() {
        let sel = select(&SignalInputs {
            output_enabled: true,
            alarm_level: VoltageAlarmLevel::VeryLow,
            ..inputs()
        });
        assert_eq!(sel.power_led, LedPattern::FastRed);
        assert!(sel.alarm);
    }

    #[test]
    fn very_low_outranks_low() {
        // A VeryLow input must never hit the Low row.
        let very_low = SignalInputs {
            output_enabled: true,
            alarm_level: VoltageAlarmLevel::VeryLow,
            ..inputs()
        };
        let low = SignalInputs {
            alarm_level: VoltageAlarmLevel::Low,
            ..very_low
        };
        assert_ne!(select(&very_low), select(&low));
        assert_eq!(select(&low).power_led, LedPattern::FlashRed);
    }

    #[test]
    fn undefined_state_falls_through_to_off() {
        let sel = select(&inputs());
        assert_eq!(sel.power_led, LedPattern::Off);
        assert_eq!(sel.status_led, LedPattern::Off);
        assert!(!sel.alarm);
    }

    #[test]
    fn table_rows_are_exhaustive_over_priorities() {
        // Every row must be reachable: for each row, build an input that
        // matches it and no earlier row.
        let cases: &[(SignalInputs, usize)] = &[
            (
                SignalInputs {
                    power_present: true,
                    output_enabled: true,
                    ..inputs()
                },
                0,
            ),
            (
                SignalInputs {
                    power_present: true,
                    charging: true,
                    ..inputs()
                },
                1,
            ),
            (
                SignalInputs {
                    power_present: true,
                    fan_running: true,
                    ..inputs()
                },
                2,
            ),
            (
                SignalInputs {
                    power_present: true,
                    ..inputs()
                },
                3,
            ),
            (
                SignalInputs {
                    output_enabled: true,
                    alarm_level: VoltageAlarmLevel::VeryLow,
                    ..inputs()
                },
                4,
            ),
            (
                SignalInputs {
                    output_enabled: true,
                    alarm_level: VoltageAlarmLevel::Low,
                    ..inputs()
                },
                5,
            ),
            (
                SignalInputs {
                    output_enabled: true,
                    ..inputs()
                },
                6,
            ),
            (
                SignalInputs {
                    fan_running: true,
                    ..inputs()
                },
                7,
            ),
        ];
        for (input, expected_row) in cases {
            let matched = DECISION_TABLE
                .iter()
                .position(|(p, _)| p(input))
                .expect("row must match");
            assert_eq!(matched, *expected_row, "wrong priority for {input:?}");
        }
    }

    // ── Renderer ──────────────────────────────────────────────

    fn red_sel(pattern: LedPattern) -> Selection {
        Selection {
            power_led: pattern,
            status_led: LedPattern::Off,
            alarm: false,
        }
    }

    #[test]
    fn first_update_is_forced() {
        let mut r = PatternRenderer::new(500, 0);
        let frame = r.update(0, &red_sel(LedPattern::Red));
        assert!(frame.is_some(), "no previous pair — must render");
        assert!(frame.unwrap().power_red);
    }

    #[test]
    fn steady_pattern_renders_on_period_only() {
        let mut r = PatternRenderer::new(500, 0);
        let sel = red_sel(LedPattern::Red);
        assert!(r.update(0, &sel).is_some());
        assert!(r.update(100, &sel).is_none());
        assert!(r.update(499, &sel).is_none());
        assert!(r.update(500, &sel).is_some());
    }

    #[test]
    fn pattern_change_forces_render_mid_period() {
        let mut r = PatternRenderer::new(500, 0);
        assert!(r.update(0, &red_sel(LedPattern::Red)).is_some());
        let frame = r.update(50, &red_sel(LedPattern::Green));
        assert!(frame.is_some(), "pair changed — render immediately");
        let frame = frame.unwrap();
        assert!(!frame.power_red);
        assert!(frame.power_green);
    }

    #[test]
    fn flash_follows_phase() {
        let mut r = PatternRenderer::new(500, 0);
        let sel = red_sel(LedPattern::FlashRed);
        let mut on_count = 0;
        let mut frames = Vec::new();
        for i in 0..8 {
            let frame = r.update(i * 500, &sel).expect("periodic render");
            frames.push(frame.power_red);
            if frame.power_red {
                on_count += 1;
            }
        }
        // Phase 2 and 3 of each 4-cycle are on: half the renders.
        assert_eq!(on_count, 4, "flash duty cycle must be 50%: {frames:?}");
        // And on-phases come in adjacent pairs, not alternating.
        assert!(frames.windows(4).any(|w| w == [true, true, false, false]
            || w == [false, false, true, true]));
    }

    #[test]
    fn fast_toggles_every_render() {
        let mut r = PatternRenderer::new(500, 0);
        let sel = red_sel(LedPattern::FastRed);
        let mut prev = None;
        for i in 0..6 {
            let frame = r.update(i * 500, &sel).expect("periodic render");
            if let Some(p) = prev {
                assert_ne!(frame.power_red, p, "fast pattern must toggle each tick");
            }
            prev = Some(frame.power_red);
        }
    }

    #[test]
    fn alarm_buzzes_on_high_phase_only() {
        let mut r = PatternRenderer::new(500, 0);
        let sel = Selection {
            power_led: LedPattern::FastRed,
            status_led: LedPattern::Off,
            alarm: true,
        };
        let mut buzz_count = 0;
        for i in 0..8 {
            let frame = r.update(i * 500, &sel).expect("periodic render");
            if frame.buzzer {
                buzz_count += 1;
            }
        }
        assert_eq!(buzz_count, 4, "buzzer gated to phase >= 2");
    }

    #[test]
    fn no_alarm_no_fast_means_silent() {
        let mut r = PatternRenderer::new(500, 0);
        let sel = red_sel(LedPattern::FlashRed);
        for i in 0..8 {
            let frame = r.update(i * 500, &sel).expect("periodic render");
            assert!(!frame.buzzer);
        }
    }
}
