use serde::{Deserialize, Serialize};

use super::{Amount, Script};

/// A single transaction output.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxOut {
    pub value: Amount,
    pub script: Script,
}

impl TxOut {
    pub fn new(value: Amount, script: Script) -> Self {
        Self { value, script }
    }

    pub fn is_zerocoin_mint(&self) -> bool {
        self.script.is_zerocoin_mint()
    }
}

/// The coinbase or coinstake transaction carrying the block reward. Only the
/// output side matters to payment consensus; inputs are summarised by the
/// zerocoin-spend flag that feeds the reward curve.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardTransaction {
    pub outputs: Vec<TxOut>,
    pub zerocoin_spend: bool,
}

impl RewardTransaction {
    pub fn new(outputs: Vec<TxOut>) -> Self {
        Self {
            outputs,
            zerocoin_spend: false,
        }
    }

    pub fn total_output_value(&self) -> Amount {
        self.outputs.iter().map(|out| out.value).sum()
    }

    pub fn push_output(&mut self, value: Amount, script: Script) {
        self.outputs.push(TxOut::new(value, script));
    }
}

/// The slice of a candidate block that payment consensus inspects.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub previous_hash: String,
    pub time: u64,
    pub coinbase: RewardTransaction,
    pub coinstake: Option<RewardTransaction>,
}

impl Block {
    pub fn is_proof_of_stake(&self) -> bool {
        self.coinstake.is_some()
    }

    /// The transaction whose outputs carry the reward: the coinstake on
    /// proof-of-stake blocks, the coinbase otherwise.
    pub fn reward_transaction(&self) -> &RewardTransaction {
        self.coinstake.as_ref().unwrap_or(&self.coinbase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OP_ZEROCOIN_MINT;

    #[test]
    fn reward_transaction_prefers_coinstake() {
        let coinbase = RewardTransaction::new(vec![TxOut::new(10, Script::new(vec![1]))]);
        let coinstake = RewardTransaction::new(vec![TxOut::new(20, Script::new(vec![2]))]);
        let pos = Block {
            previous_hash: "00".repeat(32),
            time: 0,
            coinbase: coinbase.clone(),
            coinstake: Some(coinstake.clone()),
        };
        assert!(pos.is_proof_of_stake());
        assert_eq!(pos.reward_transaction(), &coinstake);

        let pow = Block {
            previous_hash: "00".repeat(32),
            time: 0,
            coinbase: coinbase.clone(),
            coinstake: None,
        };
        assert!(!pow.is_proof_of_stake());
        assert_eq!(pow.reward_transaction(), &coinbase);
    }

    #[test]
    fn zerocoin_mint_detected_from_leading_opcode() {
        let mint = TxOut::new(5, Script::new(vec![OP_ZEROCOIN_MINT, 0x20]));
        assert!(mint.is_zerocoin_mint());
        let plain = TxOut::new(5, Script::new(vec![0x76, 0xa9]));
        assert!(!plain.is_zerocoin_mint());
    }
}
