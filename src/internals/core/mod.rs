pub mod cache;
pub mod poller;
pub mod ports;
pub mod query;
pub mod system;

#[cfg(test)]
pub(crate) mod testing;
