pub mod temperature;

pub use temperature::{Temperature, TemperatureError, TemperatureReading};
