pub mod error;
pub mod host;
pub mod model;
pub mod svc;

#[cfg(test)]
pub(crate) mod mock;
