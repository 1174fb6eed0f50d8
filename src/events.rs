// TiltCue - System Events & Data Types

// ---------------------------------------------------------------------------
// Sensor Data (6-axis IMU reading from MPU6050)
// ---------------------------------------------------------------------------

/// Raw register counts, big-endian decoded, before unit conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

/// Acceleration in g, angular rate in degrees/second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhysicalSample {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
}

/// Two-axis tilt estimate in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attitude {
    pub roll: f32,
    pub pitch: f32,
}

// ---------------------------------------------------------------------------
// Motion Events - sent to the application state machine via channel
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    TurnLeftNormal,
    TurnLeftHard,
    TurnRightNormal,
    TurnRightHard,
    Accelerate,
    /// Reserved: no detector emits this yet.
    Brake,
    /// Device returned to straight after a turn.
    MotionEnded,
    /// Idle screen rotation timer fired.
    UniformUiTimerTick,
}

impl MotionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TurnLeftNormal => "turn-left",
            Self::TurnLeftHard => "turn-left-hard",
            Self::TurnRightNormal => "turn-right",
            Self::TurnRightHard => "turn-right-hard",
            Self::Accelerate => "accelerate",
            Self::Brake => "brake",
            Self::MotionEnded => "motion-ended",
            Self::UniformUiTimerTick => "ui-timer-tick",
        }
    }
}

// ---------------------------------------------------------------------------
// Display Cues - fire-and-forget commands for the display service
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayCue {
    /// Idle screen, variant index `0..IDLE_VARIANT_COUNT`.
    Idle(u8),
    TurnLeftStart,
    TurnLeftHard,
    TurnLeftEnd,
    TurnRightStart,
    TurnRightHard,
    TurnRightEnd,
    AccelerateStart,
    AccelerateEnd,
    BrakeStart,
    BrakeEnd,
}

const IDLE_LABELS: [&str; 10] = [
    "cruising",
    "steady",
    "smooth ride",
    "keep going",
    "all calm",
    "eyes ahead",
    "easy does it",
    "on course",
    "rolling",
    "enjoy the ride",
];

impl DisplayCue {
    /// Text shown for the cue.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle(variant) => IDLE_LABELS[*variant as usize % IDLE_LABELS.len()],
            Self::TurnLeftStart => "turning left",
            Self::TurnLeftHard => "HARD LEFT",
            Self::TurnLeftEnd => "left done",
            Self::TurnRightStart => "turning right",
            Self::TurnRightHard => "HARD RIGHT",
            Self::TurnRightEnd => "right done",
            Self::AccelerateStart => "speeding up",
            Self::AccelerateEnd => "speed set",
            Self::BrakeStart => "braking",
            Self::BrakeEnd => "brake off",
        }
    }
}
