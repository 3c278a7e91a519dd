use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Monetary amount in the chain's base unit.
pub type Amount = i64;

pub const COIN: Amount = 100_000_000;

/// Reference to a transaction output, the anchor of a masternode collateral.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], index: u32) -> Self {
        Self { txid, index }
    }

    /// Compact `<txid-hex>-<index>` rendering; part of the vote signature
    /// domain, so the format is consensus-relevant.
    pub fn short_form(&self) -> String {
        format!("{}-{}", hex::encode(self.txid), self.index)
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_form())
    }
}

/// Transaction input identifying a masternode by its collateral outpoint.
/// The default (all-zero) input doubles as the "no collateral" marker used
/// by legacy winner messages.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TxInput {
    pub prevout: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    pub fn from_outpoint(prevout: OutPoint) -> Self {
        Self {
            prevout,
            script_sig: Vec::new(),
            sequence: u32::MAX,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prevout == OutPoint::default() && self.script_sig.is_empty()
    }
}

/// Opcode tagging an output as a zerocoin mint; such stake outputs are never
/// charged for masternode payments.
pub const OP_ZEROCOIN_MINT: u8 = 0xc1;

/// Opaque output script, compared bytewise.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Script(pub Vec<u8>);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_zerocoin_mint(&self) -> bool {
        self.0.first() == Some(&OP_ZEROCOIN_MINT)
    }
}

impl Ord for Script {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Script {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Masternode service tier. Each tier runs an independent payee election and
/// earns an independent share of the block reward.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    T1,
    T2,
    T3,
}

impl Tier {
    pub const MIN: Tier = Tier::T1;
    pub const MAX: Tier = Tier::T3;

    pub fn value(self) -> u8 {
        match self {
            Tier::T1 => 1,
            Tier::T2 => 2,
            Tier::T3 => 3,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Tier::T1),
            2 => Some(Tier::T2),
            3 => Some(Tier::T3),
            _ => None,
        }
    }

    pub fn ascending() -> impl Iterator<Item = Tier> {
        [Tier::T1, Tier::T2, Tier::T3].into_iter()
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::MAX
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
