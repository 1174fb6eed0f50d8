pub mod bus;
pub mod display;
pub mod imu;
