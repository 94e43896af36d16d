pub mod batch;
pub mod error;
pub mod keys;
pub mod plan;
pub mod state;
