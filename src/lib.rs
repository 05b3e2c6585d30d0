#![doc = include_str!("RUSTDOC.md")]

pub mod dom;
pub mod logger;
pub mod platform;
pub mod router;
pub mod tracker;

#[cfg(test)]
pub mod test_support;
