pub mod error;
pub mod node;
pub mod record;
pub mod serialization;
pub mod storage;
pub mod tree;

pub use error::{TreeError, TreeResult};
pub use storage::TreeConf;
pub use tree::Tree;

#[cfg(test)]
mod node_test;
