use joinsplit::{
    JoinSplitTransition, NoteSignature, ProofBackend, ProofObject, ProvedTransition,
    TransitionWitness,
};
use tracing::debug;

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::ledger::PublicLedger;
use crate::registry::{NoteState, RegistryDelta};

/// Progress of one join-split transaction. `Applied` and `Rejected` are
/// terminal; a rejected transaction is never retried, a fresh one must be
/// built from current registry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Building,
    ProofRequested,
    ProofReady,
    PublicApprovalPending,
    Submitted,
    Applied,
    Rejected,
}

/// Orchestrates one value transition end to end: local validation, proof
/// construction, public-value approval, and submission to the registry.
///
/// Everything before [`submit`](Self::submit) runs off the registry's
/// critical path — in particular, abandoning a transaction mid-proof leaves
/// no registry-visible effect.
#[derive(Debug, Clone)]
pub struct JoinSplitTransaction {
    witness: TransitionWitness,
    transition: JoinSplitTransition,
    state: TxState,
    proof: Option<ProofObject>,
    signatures: Vec<NoteSignature>,
}

impl JoinSplitTransaction {
    /// Validate the witness locally and against the engine's current
    /// snapshot: conservation, duplicate-free input set, and every input
    /// currently unspent. Fails fast, before any proof is requested.
    pub fn build<B: ProofBackend, L: PublicLedger>(
        witness: TransitionWitness,
        engine: &Engine<B, L>,
    ) -> Result<Self> {
        witness.check().map_err(Error::Build)?;
        for note in &witness.inputs {
            let commitment = note.commit();
            if engine.note_state(&commitment) != NoteState::Unspent {
                return Err(Error::DoubleSpend(commitment));
            }
        }
        let transition = witness.commit();
        Ok(Self {
            witness,
            transition,
            state: TxState::Building,
            proof: None,
            signatures: Vec::new(),
        })
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn transition(&self) -> &JoinSplitTransition {
        &self.transition
    }

    /// The proved form, once proof construction succeeded.
    pub fn proved(&self) -> Option<ProvedTransition> {
        self.proof.as_ref().map(|proof| ProvedTransition {
            transition: self.transition.clone(),
            proof: proof.clone(),
            signatures: self.signatures.clone(),
        })
    }

    /// Delegate to the proof backend for the balancing proof and one
    /// consumption signature per input note.
    pub fn request_proof(&mut self, backend: &impl ProofBackend) -> Result<()> {
        self.expect_state(TxState::Building)?;
        self.state = TxState::ProofRequested;

        match backend.construct_proof(&self.witness) {
            Ok((proof, signatures)) => {
                self.proof = Some(proof);
                self.signatures = signatures;
                self.state = TxState::ProofReady;
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "proof construction failed");
                self.state = TxState::Rejected;
                Err(e.into())
            }
        }
    }

    /// Confirm that both approval layers cover the public value this
    /// transition moves: the registry's own gate and the token-side
    /// allowance held by the public token owner in the operator's favor.
    /// Check-only; the consuming debit happens atomically inside apply.
    ///
    /// A fully private transfer (zero delta) needs no approval and stays in
    /// `ProofReady`.
    pub fn approve_public<B: ProofBackend, L: PublicLedger>(
        &mut self,
        engine: &Engine<B, L>,
    ) -> Result<()> {
        self.expect_state(TxState::ProofReady)?;

        let required = match u64::try_from(self.transition.public_value_delta.unsigned_abs()) {
            Ok(0) => return Ok(()),
            Ok(required) => required,
            Err(_) => {
                self.state = TxState::Rejected;
                return Err(Error::InvalidAmount {
                    holder: self.transition.public_token_owner,
                });
            }
        };

        let holder = self.transition.public_token_owner;
        let operator = engine.operator();
        for available in [engine.public_allowance(holder), engine.token_allowance(holder)] {
            if available < required {
                self.state = TxState::Rejected;
                return Err(Error::InsufficientAllowance {
                    holder,
                    spender: operator,
                    required,
                    available,
                });
            }
        }

        self.state = TxState::PublicApprovalPending;
        Ok(())
    }

    /// Submit for atomic validation and commit. Success is terminal
    /// (`Applied`); any registry rejection is terminal too (`Rejected`) and
    /// leaves no partial state behind.
    pub fn submit<B: ProofBackend, L: PublicLedger>(
        &mut self,
        engine: &Engine<B, L>,
    ) -> Result<RegistryDelta> {
        let expected = if self.transition.public_value_delta == 0 {
            TxState::ProofReady
        } else {
            TxState::PublicApprovalPending
        };
        self.expect_state(expected)?;

        let Some(proved) = self.proved() else {
            return Err(Error::InvalidState {
                expected,
                actual: self.state,
            });
        };

        self.state = TxState::Submitted;
        match engine.apply(&proved) {
            Ok(delta) => {
                self.state = TxState::Applied;
                Ok(delta)
            }
            Err(e) => {
                self.state = TxState::Rejected;
                Err(e)
            }
        }
    }

    fn expect_state(&self, expected: TxState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }
}
