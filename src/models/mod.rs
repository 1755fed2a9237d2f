pub mod modernbert;

pub use modernbert::{ModernBertOracle, ModernBertSize};
