pub mod app;
pub mod sensor;
pub mod timer;
