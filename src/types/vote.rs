use ed25519_dalek::{Keypair, PublicKey};
use serde::{Deserialize, Serialize};

use crate::crypto::{sign_message, signature_from_hex, signature_to_hex, verify_signature};
use crate::errors::PaymentResult;

use super::{Script, Tier, TxInput};

/// A masternode's signed nomination of the payee for one height and tier.
///
/// Legacy peers emit votes without a payee collateral reference; those decode
/// with an empty `payee_input` and the receiving side backfills tier and
/// collateral from the overlay registry.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinnerVote {
    pub voter: TxInput,
    pub height: u64,
    pub payee_script: Script,
    pub payee_tier: Tier,
    pub payee_input: TxInput,
    pub signature: String,
}

impl WinnerVote {
    pub fn new(voter: TxInput, height: u64, payee_script: Script, payee_tier: Tier) -> Self {
        Self {
            voter,
            height,
            payee_script,
            payee_tier,
            payee_input: TxInput::default(),
            signature: String::new(),
        }
    }

    /// ASCII signature domain: voter outpoint short form, decimal height and
    /// the payee script hex, concatenated without separators.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(self.voter.prevout.short_form().as_bytes());
        data.extend_from_slice(self.height.to_string().as_bytes());
        data.extend_from_slice(self.payee_script.to_string().as_bytes());
        data
    }

    // the hash must survive the legacy backfill of tier and payee
    // collateral, so it covers only voter, height and payee script
    fn content_bytes(&self) -> Vec<u8> {
        bincode::serialize(&(&self.voter, self.height, &self.payee_script))
            .expect("serializing winner vote content")
    }

    /// Content hash identifying this vote for dedup, inventory and sync.
    pub fn hash(&self) -> String {
        hex::encode(blake3::hash(&self.content_bytes()).as_bytes())
    }

    pub fn sign(&mut self, keypair: &Keypair) {
        let signature = sign_message(keypair, &self.signing_payload());
        self.signature = signature_to_hex(&signature);
    }

    pub fn verify_signature(&self, public_key: &PublicKey) -> PaymentResult<()> {
        let signature = signature_from_hex(&self.signature)?;
        verify_signature(public_key, &self.signing_payload(), &signature)
    }
}
