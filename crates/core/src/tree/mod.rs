#![forbid(unsafe_code)]

mod build;
mod cache;
mod node;

pub use build::*;
pub use cache::*;
pub use node::*;

#[cfg(test)]
mod tests;
