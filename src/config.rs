// TiltCue - Hardware & System Configuration
// Target: ESP32-C3 handheld with MPU6050 + SSD1306 on a shared I2C bus

use std::time::Duration;

use crate::drivers::imu::{AccelRange, GyroRange};
use crate::motion::{AccelTrigger, ClassifierConfig};

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 8;
pub const PIN_I2C_SCL: i32 = 9;

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MPU6050: u8 = 0x68;
pub const I2C_ADDR_OLED: u8 = 0x3C;
pub const I2C_BAUDRATE_KHZ: u32 = 400;
pub const I2C_TIMEOUT_TICKS: u32 = 10; // FreeRTOS ticks, keeps the sampler from stalling

// ---------------------------------------------------------------------------
// Display (SSD1306 OLED)
// ---------------------------------------------------------------------------
pub const SCREEN_WIDTH: u32 = 128;
pub const SCREEN_HEIGHT: u32 = 64;
pub const DISPLAY_BUFFER_SIZE: usize = (SCREEN_WIDTH as usize * SCREEN_HEIGHT as usize) / 8; // 1024
pub const IDLE_VARIANT_COUNT: u8 = 10;

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes) & Priorities
// ---------------------------------------------------------------------------
pub const STACK_SENSOR: usize = 4096;
pub const STACK_APP: usize = 8192;
pub const STACK_TIMER: usize = 4096;
pub const PRIORITY_SENSOR: u8 = 6; // one above the default task priority

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const SAMPLE_PERIOD_MS: u64 = 20;             // 50 Hz fusion loop
pub const UI_ROTATION_PERIOD_MS: u64 = 60_000;    // idle screen rotation
pub const EXIT_HOLD_MS: u64 = 1000;               // end-animation hold

// ---------------------------------------------------------------------------
// Event Channel
// ---------------------------------------------------------------------------
pub const EVENT_QUEUE_CAPACITY: usize = 10;

// ---------------------------------------------------------------------------
// Attitude & Motion Thresholds
// ---------------------------------------------------------------------------
pub const COMPLEMENTARY_ALPHA: f32 = 0.99;
pub const TURN_ENTER_DEG: f32 = 30.0;
pub const TURN_EXIT_DEG: f32 = 15.0;
pub const HARD_TURN_RATE_DPS: f32 = 100.0;
pub const ACCELERATE_THRESHOLD_G: f32 = 1.2;

/// Runtime parameters threaded through the tasks at startup.
#[derive(Debug, Clone, Copy)]
pub struct SystemConfig {
    pub sample_period: Duration,
    pub alpha: f32,
    pub classifier: ClassifierConfig,
    pub queue_capacity: usize,
    pub rotation_period: Duration,
    pub exit_hold: Duration,
    pub accel_range: AccelRange,
    pub gyro_range: GyroRange,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            sample_period: Duration::from_millis(SAMPLE_PERIOD_MS),
            alpha: COMPLEMENTARY_ALPHA,
            classifier: ClassifierConfig::default(),
            queue_capacity: EVENT_QUEUE_CAPACITY,
            rotation_period: Duration::from_millis(UI_ROTATION_PERIOD_MS),
            exit_hold: Duration::from_millis(EXIT_HOLD_MS),
            accel_range: AccelRange::G4,
            gyro_range: GyroRange::Dps500,
        }
    }
}

impl SystemConfig {
    /// Defaults with build-time overrides (`TILTCUE_*` variables seen by cargo).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(mode) = option_env!("TILTCUE_ACCEL_TRIGGER") {
            config.classifier.accel_trigger = match mode.to_lowercase().as_str() {
                "edge" => AccelTrigger::Edge,
                "level" => AccelTrigger::Level,
                other => {
                    log::warn!("Unknown TILTCUE_ACCEL_TRIGGER '{}', keeping level", other);
                    AccelTrigger::Level
                }
            };
        }

        if let Some(ms) = parse_override::<u64>("TILTCUE_ROTATION_MS", option_env!("TILTCUE_ROTATION_MS")) {
            config.rotation_period = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_override::<u64>("TILTCUE_HOLD_MS", option_env!("TILTCUE_HOLD_MS")) {
            config.exit_hold = Duration::from_millis(ms);
        }
        if let Some(deg) = parse_override("TILTCUE_TURN_ENTER_DEG", option_env!("TILTCUE_TURN_ENTER_DEG")) {
            config.classifier.turn_enter_deg = deg;
        }
        if let Some(deg) = parse_override("TILTCUE_TURN_EXIT_DEG", option_env!("TILTCUE_TURN_EXIT_DEG")) {
            config.classifier.turn_exit_deg = deg;
        }
        if let Some(dps) = parse_override("TILTCUE_HARD_TURN_DPS", option_env!("TILTCUE_HARD_TURN_DPS")) {
            config.classifier.hard_turn_rate_dps = dps;
        }
        if let Some(g) = parse_override("TILTCUE_ACCEL_G", option_env!("TILTCUE_ACCEL_G")) {
            config.classifier.accelerate_g = g;
        }

        if config.classifier.turn_exit_deg >= config.classifier.turn_enter_deg {
            log::warn!(
                "Turn exit threshold {} >= enter threshold {}, restoring defaults",
                config.classifier.turn_exit_deg,
                config.classifier.turn_enter_deg
            );
            config.classifier.turn_enter_deg = TURN_ENTER_DEG;
            config.classifier.turn_exit_deg = TURN_EXIT_DEG;
        }

        config
    }
}

/// Parse an override value, warning (and ignoring it) when malformed.
fn parse_override<T: std::str::FromStr>(name: &str, value: Option<&str>) -> Option<T> {
    let raw = value?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring malformed {}='{}'", name, raw);
            None
        }
    }
}
