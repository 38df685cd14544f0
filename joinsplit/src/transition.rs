use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::note::{Account, AssetId, Note, NoteCommitment, OwnerKey};
use crate::proof::TransitionRoot;

/// The owner-side view of a join-split transition, with plaintext note
/// values. Never submitted to the registry; the registry only ever sees the
/// committed [`JoinSplitTransition`].
///
/// `public_value_delta` is the signed amount crossing the public/private
/// boundary: negative moves public value into the output notes (deposit),
/// positive moves input-note value out to the public ledger (redeem), zero
/// is a fully private transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionWitness {
    pub asset: AssetId,
    pub inputs: Vec<Note>,
    pub outputs: Vec<Note>,
    pub public_value_delta: i128,
    pub sender: Account,
    pub public_token_owner: Account,
}

impl TransitionWitness {
    /// Public value into fresh private notes. The sender is converting
    /// their own tokens, so they are also the public token owner.
    pub fn deposit(asset: AssetId, outputs: Vec<Note>, sender: Account) -> Self {
        let deposited: i128 = outputs.iter().map(|n| n.value as i128).sum();
        Self {
            asset,
            inputs: vec![],
            outputs,
            public_value_delta: -deposited,
            sender,
            public_token_owner: sender,
        }
    }

    /// Fully private note-for-note exchange; no public value moves.
    pub fn transfer(
        asset: AssetId,
        inputs: Vec<Note>,
        outputs: Vec<Note>,
        sender: Account,
    ) -> Self {
        Self {
            asset,
            inputs,
            outputs,
            public_value_delta: 0,
            sender,
            public_token_owner: sender,
        }
    }

    /// Consume private notes back into public value for the sender.
    pub fn redeem(asset: AssetId, inputs: Vec<Note>, sender: Account) -> Self {
        let redeemed: i128 = inputs.iter().map(|n| n.value as i128).sum();
        Self {
            asset,
            inputs,
            outputs: vec![],
            public_value_delta: redeemed,
            sender,
            public_token_owner: sender,
        }
    }

    /// `sum(outputs) - sum(inputs)`; a balanced transition satisfies
    /// `balance_delta() + public_value_delta == 0`.
    pub fn balance_delta(&self) -> i128 {
        let in_sum: i128 = self.inputs.iter().map(|n| n.value as i128).sum();
        let out_sum: i128 = self.outputs.iter().map(|n| n.value as i128).sum();

        out_sum - in_sum
    }

    /// Local fail-fast validation, run before any proof is requested.
    pub fn check(&self) -> Result<()> {
        if self.inputs.is_empty() && self.outputs.is_empty() {
            return Err(Error::EmptyTransition);
        }
        if self
            .inputs
            .iter()
            .chain(self.outputs.iter())
            .any(|n| n.asset != self.asset)
        {
            return Err(Error::AssetMismatch);
        }

        let input_comms: Vec<NoteCommitment> = self.inputs.iter().map(Note::commit).collect();
        if let Some(dup) = input_comms.iter().duplicates().next() {
            return Err(Error::DuplicateInput(*dup));
        }
        for out in &self.outputs {
            let cm = out.commit();
            if input_comms.contains(&cm) {
                return Err(Error::NoteReused(cm));
            }
        }

        if self.balance_delta() + self.public_value_delta != 0 {
            return Err(Error::ConservationViolation {
                inputs: self.inputs.iter().map(|n| n.value as u128).sum(),
                outputs: self.outputs.iter().map(|n| n.value as u128).sum(),
                public_value_delta: self.public_value_delta,
            });
        }

        Ok(())
    }

    pub fn commit(&self) -> JoinSplitTransition {
        JoinSplitTransition {
            asset: self.asset,
            inputs: self.inputs.iter().map(Note::commit).collect(),
            outputs: self
                .outputs
                .iter()
                .map(|n| OutputDescriptor {
                    commitment: n.commit(),
                    owner: n.owner,
                })
                .collect(),
            public_value_delta: self.public_value_delta,
            sender: self.sender,
            public_token_owner: self.public_token_owner,
        }
    }
}

/// A newly minted note as the registry will record it: its commitment plus
/// the owner the registry registers for it. The value stays with the
/// creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    pub commitment: NoteCommitment,
    pub owner: OwnerKey,
}

/// The committed form of a transition, submitted alongside its proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSplitTransition {
    pub asset: AssetId,
    pub inputs: Vec<NoteCommitment>,
    pub outputs: Vec<OutputDescriptor>,
    pub public_value_delta: i128,
    pub sender: Account,
    pub public_token_owner: Account,
}

impl JoinSplitTransition {
    /// Binds every field of the transition. Proofs and per-note signatures
    /// commit to this root, so neither can be replayed against an altered
    /// transition.
    pub fn root(&self) -> TransitionRoot {
        let mut hasher = Sha256::new();
        hasher.update(b"ZKASSET_TRANSITION_ROOT");
        hasher.update(self.asset.0);
        hasher.update((self.inputs.len() as u32).to_le_bytes());
        for cm in &self.inputs {
            hasher.update(cm.as_bytes());
        }
        hasher.update((self.outputs.len() as u32).to_le_bytes());
        for out in &self.outputs {
            hasher.update(out.commitment.as_bytes());
            hasher.update(out.owner.0);
        }
        hasher.update(self.public_value_delta.to_le_bytes());
        hasher.update(self.sender.0);
        hasher.update(self.public_token_owner.0);
        TransitionRoot(hasher.finalize().into())
    }
}
