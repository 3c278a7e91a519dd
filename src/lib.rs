//! Masternode payment consensus for a tiered proof-of-stake overlay.
//!
//! Each block height runs an independent payee election per service tier:
//! the top-ranked masternodes sign winner votes, peers tally them, and a
//! payee with six votes becomes enforceable against produced blocks. The
//! crate owns the election tables, the block validator and builder that act
//! on them, the gossip and initial-sync flow for winner votes, and the
//! checksummed on-disk snapshot of the tables.
//!
//! The chain database, the masternode registry, the budget/treasury
//! subsystem and the transport are reached only through the capability
//! traits in [`interfaces`]; [`engine::PaymentsEngine`] wires them together.

pub mod builder;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod errors;
pub mod gossip;
pub mod interfaces;
pub mod producer;
pub mod snapshot;
pub mod store;
pub mod tally;
pub mod types;
pub mod validator;

pub use config::{OperatorConfig, PaymentsConfig};
pub use engine::{Collaborators, PaymentsEngine};
pub use errors::{PaymentError, PaymentResult, SnapshotReadError, VoteRejection};
pub use store::ElectionStore;
pub use tally::{BlockTally, PayeeRecord, SIGNATURES_REQUIRED, SIGNATURES_TOTAL};
pub use types::WinnerVote;
