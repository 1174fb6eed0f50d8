// TiltCue - Firmware Entry Point
//
// Startup:
//   1. Bring up logging and the runtime configuration.
//   2. Open the shared I2C bus, probe both devices, configure the MPU6050.
//   3. Initialise the OLED (a dead display is logged, not fatal).
//   4. Wire the event channel, idle-rotation timer and state machine.
//   5. Spawn the sensor task (raised priority) and the app task.
//
// On a host build the MPU6050 is replaced by a scripted ride and cues go to
// the log; the process exits once the ride is over.

use std::thread;

use tiltcue::attitude::ComplementaryFilter;
use tiltcue::channel::event_channel;
use tiltcue::config::*;
use tiltcue::motion::MotionClassifier;
use tiltcue::sampler::{InertialSensor, Sampler};
use tiltcue::tasks::sensor::MotionPipeline;

fn pipeline<S: InertialSensor>(sampler: Sampler<S>, config: &SystemConfig) -> MotionPipeline<S> {
    MotionPipeline::new(
        sampler,
        ComplementaryFilter::new(config.alpha),
        MotionClassifier::new(config.classifier),
        config.sample_period,
    )
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use std::sync::Mutex;
    use std::time::Duration;

    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_hal::task::thread::ThreadSpawnConfiguration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use tiltcue::drivers::display::OledDisplay;
    use tiltcue::drivers::imu::Mpu6050;
    use tiltcue::statemachine::{AppState, StateMachine};
    use tiltcue::tasks;
    use tiltcue::tasks::timer::PeriodicTimer;

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("TiltCue firmware starting");

    let config = SystemConfig::from_env();
    log::info!("{:?}", config);

    // ---- I2C bus (shared between OLED and MPU6050) ------------------------
    let peripherals = Peripherals::take()?;
    let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
    let i2c: I2cDriver<'static> = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8, // SDA
        peripherals.pins.gpio9, // SCL
        &i2c_config,
    )?;
    log::info!("I2C up on SDA={} SCL={} @ {} kHz", PIN_I2C_SDA, PIN_I2C_SCL, I2C_BAUDRATE_KHZ);
    let i2c_bus: &'static Mutex<I2cDriver<'static>> = Box::leak(Box::new(Mutex::new(i2c)));

    // ---- Boot probe -------------------------------------------------------
    let imu = Mpu6050::new(i2c_bus);
    let mut display = OledDisplay::new(i2c_bus);
    let imu_ok = imu.is_connected();
    let oled_ok = display.is_connected();
    if imu_ok && oled_ok {
        log::info!("Boot check OK (IMU 0x{:02x}, OLED 0x{:02x})", I2C_ADDR_MPU6050, I2C_ADDR_OLED);
    } else {
        log::error!("Boot check FAILED - IMU:{} OLED:{}", imu_ok, oled_ok);
    }

    // ---- IMU --------------------------------------------------------------
    imu.init(config.accel_range, config.gyro_range)?;
    let sampler = Sampler::new(imu)?;

    // ---- Display ----------------------------------------------------------
    if let Err(e) = display.init() {
        log::error!("OLED init failed: {} (continuing without display)", e);
    }

    // ---- Wiring -----------------------------------------------------------
    let (events_tx, events_rx) = event_channel(config.queue_capacity);
    let timer = PeriodicTimer::ui_rotation(config.rotation_period, events_tx.clone())?;
    let machine = StateMachine::new(
        AppState::UniformSpeed,
        display,
        timer,
        StdRng::from_os_rng(),
        config.exit_hold,
    );

    // ---- Tasks ------------------------------------------------------------
    // Sensor task above the app task so sampling never waits on a redraw.
    ThreadSpawnConfiguration {
        priority: PRIORITY_SENSOR,
        stack_size: STACK_SENSOR,
        ..Default::default()
    }
    .set()?;
    let pipeline = pipeline(sampler, &config);
    let period = config.sample_period;
    thread::Builder::new()
        .name("sensor".into())
        .stack_size(STACK_SENSOR)
        .spawn(move || tasks::sensor::sensor_task(pipeline, events_tx, period))?;
    ThreadSpawnConfiguration::default().set()?;

    thread::Builder::new()
        .name("app".into())
        .stack_size(STACK_APP)
        .spawn(move || {
            tasks::app::app_task(machine, events_rx);
        })?;

    // Main thread has nothing left to do.
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

// ---------------------------------------------------------------------------
// Host simulation
// ---------------------------------------------------------------------------
#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use tiltcue::drivers::display::LogDisplay;
    use tiltcue::sim::SimulatedImu;
    use tiltcue::statemachine::{AppState, StateMachine};
    use tiltcue::tasks;
    use tiltcue::tasks::timer::PeriodicTimer;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("TiltCue host simulation starting");

    let config = SystemConfig::from_env();
    log::info!("{:?}", config);

    let imu = SimulatedImu::demo(config.sample_period, 0x5EED);
    let ride = imu.script_duration();
    let sampler = Sampler::new(imu)?;

    let (events_tx, events_rx) = event_channel(config.queue_capacity);
    let timer = PeriodicTimer::ui_rotation(config.rotation_period, events_tx.clone())?;
    let machine = StateMachine::new(
        AppState::UniformSpeed,
        LogDisplay,
        timer,
        StdRng::from_os_rng(),
        config.exit_hold,
    );

    let pipeline = pipeline(sampler, &config);
    let period = config.sample_period;
    let diagnostics = events_tx.clone();
    thread::Builder::new()
        .name("sensor".into())
        .stack_size(STACK_SENSOR)
        .spawn(move || tasks::sensor::sensor_task(pipeline, events_tx, period))?;

    thread::Builder::new()
        .name("app".into())
        .stack_size(STACK_APP)
        .spawn(move || {
            tasks::app::app_task(machine, events_rx);
        })?;

    // Let the last end-cue hold play out before exiting.
    thread::sleep(ride + config.exit_hold);
    log::info!("Ride finished, {} events dropped", diagnostics.dropped());
    Ok(())
}
