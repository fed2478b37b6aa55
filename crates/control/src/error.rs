/// Why a control command did not take effect.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no player specified and none is playing or paused")]
    NoTarget,

    #[error("player {player} is not reachable: {source}")]
    Unreachable {
        player: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("player {0} does not support seeking")]
    SeekUnsupported(String),

    #[error("player {0} does not report its position")]
    PositionUnavailable(String),

    #[error("player {0} does not report a usable track length")]
    LengthUnavailable(String),

    #[error("percentage {0} is outside 0..=100")]
    InvalidPercentage(f64),

    #[error("bus call failed: {0}")]
    Call(#[source] anyhow::Error),
}
