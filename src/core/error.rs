use thiserror::Error;

/// Structural failures the engine refuses to compute around.
///
/// Missing players, unparsable scores and empty candidate pools are not
/// errors: they degrade to empty or defaulted results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("pairing pool must have an even number of players, got {size}")]
    OddPool { size: usize },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}
