use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cryptography error: {0}")]
    Crypto(String),
}

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Why an inbound winner vote was not admitted. Peer scoring is decided by
/// the gossip layer from these kinds; the store itself never scores.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoteRejection {
    #[error("chain not synced")]
    NotSynced,
    #[error("malformed winner payload")]
    Decode,
    #[error("unknown voting masternode")]
    UnknownVoter,
    #[error("vote height outside retention window")]
    StaleWindow,
    #[error("winner already seen")]
    DuplicateVote,
    #[error("masternode already voted for this height and tier")]
    AlreadyVoted,
    #[error("voter rank {rank} outside payment quorum")]
    BadRank { rank: u32 },
    #[error("invalid winner signature")]
    BadSignature,
    #[error("voter protocol {version} below required {required}")]
    ProtocolTooOld { version: u32, required: u32 },
    #[error("chain state unavailable")]
    ChainBusy,
}

/// Distinct failure kinds for the snapshot read path; callers recreate the
/// file on `FileError` and `IncorrectFormat`, everything else is surfaced.
#[derive(Debug, Error)]
pub enum SnapshotReadError {
    #[error("failed to open snapshot: {0}")]
    FileError(#[from] io::Error),
    #[error("snapshot truncated before checksum")]
    HashReadError,
    #[error("snapshot checksum mismatch")]
    IncorrectHash,
    #[error("snapshot magic message mismatch")]
    IncorrectMagicMessage,
    #[error("snapshot network magic mismatch")]
    IncorrectMagicNumber,
    #[error("snapshot body malformed: {0}")]
    IncorrectFormat(String),
}
