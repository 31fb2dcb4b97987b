use thiserror::Error;

use crate::rank::Rank;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("player {0} not found")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("player {name} is already muted")]
    AlreadyMuted {
        name: String,
        reason: String,
        expiration: Option<i64>,
    },

    #[error("player {0} is not muted")]
    NotMuted(String),

    #[error("player {name} is already banned")]
    AlreadyBanned {
        name: String,
        reason: String,
        expiration: Option<i64>,
    },

    #[error("player {0} is not banned")]
    NotBanned(String),

    #[error("player {name} already has the rank {rank}")]
    SameRank { name: String, rank: Rank },

    #[error("{actor} ({actor_rank}) cannot act on {target} ({target_rank})")]
    Unauthorized {
        actor: String,
        actor_rank: Rank,
        target: String,
        target_rank: Rank,
    },

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
