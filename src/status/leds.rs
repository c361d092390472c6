//! Indicator colors derived from the active screen and cached metrics.

use super::screens::Screen;
use crate::config::HealthThresholds;
use crate::types::{Led, LedColor, MetricsSnapshot};

/// Colors for the three indicators: info (top), health (middle) and home (bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedState {
    pub info: LedColor,
    pub health: LedColor,
    pub home: LedColor,
}

impl LedState {
    pub fn colors(&self) -> [(Led, LedColor); 3] {
        [(Led::Top, self.info), (Led::Middle, self.health), (Led::Bottom, self.home)]
    }
}

/// Red above the critical thresholds, orange above the warning thresholds,
/// green otherwise. Values equal to a threshold fall to the lower tier.
pub fn health_color(cpu: f64, mem_percent: f64, thresholds: &HealthThresholds) -> LedColor {
    if cpu > thresholds.cpu_crit || mem_percent > thresholds.mem_crit {
        LedColor::Red
    } else if cpu > thresholds.cpu_warn || mem_percent > thresholds.mem_warn {
        LedColor::Orange
    } else {
        LedColor::Green
    }
}

pub fn led_states(
    screen: Screen,
    metrics: &MetricsSnapshot,
    thresholds: &HealthThresholds,
) -> LedState {
    let info = match screen {
        Screen::Logo => LedColor::Green,
        s if s.is_traffic() => LedColor::Orange,
        _ => LedColor::Off,
    };
    let home = if screen == Screen::Logo {
        LedColor::Green
    } else {
        LedColor::Off
    };
    LedState {
        info,
        health: health_color(metrics.cpu, metrics.mem_percent(), thresholds),
        home,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(cpu: f64, mem_percent: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            cpu,
            mem_used: mem_percent,
            mem_total: 100,
            ..Default::default()
        }
    }

    #[test]
    fn health_thresholds_are_exclusive() {
        let t = HealthThresholds::default();
        assert_eq!(health_color(70.0, 50.0, &t), LedColor::Green);
        assert_eq!(health_color(71.0, 50.0, &t), LedColor::Orange);
        assert_eq!(health_color(95.0, 50.0, &t), LedColor::Red);
        assert_eq!(health_color(90.0, 50.0, &t), LedColor::Orange);
        assert_eq!(health_color(10.0, 80.0, &t), LedColor::Green);
        assert_eq!(health_color(10.0, 81.0, &t), LedColor::Orange);
        assert_eq!(health_color(10.0, 91.0, &t), LedColor::Red);
    }

    #[test]
    fn screen_drives_info_and_home() {
        let t = HealthThresholds::default();
        let m = metrics(10.0, 10);

        let logo = led_states(Screen::Logo, &m, &t);
        assert_eq!((logo.info, logo.home), (LedColor::Green, LedColor::Green));

        for screen in [Screen::WanTraffic, Screen::TunnelTraffic, Screen::LanTraffic] {
            let state = led_states(screen, &m, &t);
            assert_eq!((state.info, state.home), (LedColor::Orange, LedColor::Off));
        }

        for screen in [Screen::Cpu, Screen::Memory, Screen::Interfaces] {
            let state = led_states(screen, &m, &t);
            assert_eq!((state.info, state.home), (LedColor::Off, LedColor::Off));
        }
    }

    #[test]
    fn memory_percentage_feeds_health() {
        let t = HealthThresholds::default();
        assert_eq!(led_states(Screen::Cpu, &metrics(5.0, 95), &t).health, LedColor::Red);
        // Unknown total memory reads as 0%
        let unknown = MetricsSnapshot {
            cpu: 5.0,
            mem_used: 10,
            mem_total: 0,
            ..Default::default()
        };
        assert_eq!(led_states(Screen::Cpu, &unknown, &t).health, LedColor::Green);
    }

    #[test]
    fn colors_map_to_indicators_in_order() {
        let state = LedState {
            info: LedColor::Green,
            health: LedColor::Red,
            home: LedColor::Off,
        };
        assert_eq!(
            state.colors(),
            [
                (Led::Top, LedColor::Green),
                (Led::Middle, LedColor::Red),
                (Led::Bottom, LedColor::Off),
            ]
        );
    }
}
