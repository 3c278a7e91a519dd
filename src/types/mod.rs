mod outpoint;
mod transaction;
mod vote;

pub use outpoint::{Amount, OutPoint, Script, Tier, TxInput, COIN, OP_ZEROCOIN_MINT};
pub use transaction::{Block, RewardTransaction, TxOut};
pub use vote::WinnerVote;
