pub mod host;
pub mod sensor_http;
