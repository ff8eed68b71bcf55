pub mod indicators;
pub mod series;

pub use series::EngineState;
