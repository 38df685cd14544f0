use std::collections::HashMap;

use joinsplit::{
    Account, AssetId, NoteCommitment, OwnerKey, ProofBackend, ProvedTransition,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::allowance::AllowanceGate;
use crate::error::{Error, Result};
use crate::ledger::PublicLedger;

/// Lifecycle state of a commitment as the registry reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteState {
    Unspent,
    Spent,
    Unknown,
}

#[derive(Debug, Clone, Copy)]
struct NoteRecord {
    asset: AssetId,
    owner: OwnerKey,
    spent: bool,
}

/// The durable effects of one applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDelta {
    pub asset: AssetId,
    pub spent: Vec<NoteCommitment>,
    pub registered: Vec<NoteCommitment>,
    pub public_value_delta: i128,
    pub private_supply_after: u64,
}

/// The authoritative private-value ledger: per-note lifecycle state, the
/// running private supply per asset, and the allowance gate. The registry
/// never learns a note's plaintext value; its public surface deals in
/// commitments, owners, and aggregates only.
///
/// This is the trust boundary. Submitters are untrusted, so every claim a
/// [`ProvedTransition`] makes is re-verified here before anything mutates,
/// regardless of what the builder already checked locally.
#[derive(Debug, Clone)]
pub struct NoteRegistry {
    operator: Account,
    notes: HashMap<NoteCommitment, NoteRecord>,
    supply: HashMap<AssetId, u64>,
    gate: AllowanceGate,
}

impl NoteRegistry {
    /// `operator` is the account the registry debits and credits public
    /// value through; holders grant it allowances. Injected explicitly,
    /// never read from ambient configuration.
    pub fn new(operator: Account) -> Self {
        Self {
            operator,
            notes: HashMap::new(),
            supply: HashMap::new(),
            gate: AllowanceGate::new(),
        }
    }

    pub fn operator(&self) -> Account {
        self.operator
    }

    pub fn note_state(&self, commitment: &NoteCommitment) -> NoteState {
        match self.notes.get(commitment) {
            Some(record) if record.spent => NoteState::Spent,
            Some(_) => NoteState::Unspent,
            None => NoteState::Unknown,
        }
    }

    pub fn note_owner(&self, commitment: &NoteCommitment) -> Option<OwnerKey> {
        self.notes.get(commitment).map(|record| record.owner)
    }

    /// Total private supply for the asset: the sum of all unspent note
    /// values, maintained as an aggregate.
    pub fn supply(&self, asset: AssetId) -> u64 {
        self.supply.get(&asset).copied().unwrap_or(0)
    }

    /// Grant the registry operator the right to move up to `amount` of
    /// `holder`'s public value. Increase-only.
    pub fn public_approve(&mut self, holder: Account, amount: u64) -> Result<()> {
        self.gate.approve(holder, self.operator, amount)
    }

    pub fn public_allowance(&self, holder: Account) -> u64 {
        self.gate.allowance(holder, self.operator)
    }

    /// The sole mutating entry point: validate and atomically commit one
    /// proved transition.
    ///
    /// All registry-side checks run before the single fallible external
    /// call (the public ledger debit/credit), and that call runs before any
    /// registry state changes, so a failure at any point leaves no partial
    /// state. Overlapping submissions are decided first-applier-wins: the
    /// loser observes its input as spent and is rejected.
    pub fn apply(
        &mut self,
        proved: &ProvedTransition,
        backend: &impl ProofBackend,
        ledger: &mut impl PublicLedger,
    ) -> Result<RegistryDelta> {
        let transition = &proved.transition;

        if transition.inputs.is_empty() && transition.outputs.is_empty() {
            return Err(Error::ProofInvalid {
                reason: "transition has no inputs and no outputs",
            });
        }

        // The proof must bind the transition it was submitted with, and its
        // arithmetic claims must hold under independent verification.
        let root = transition.root();
        if proved.proof.root != root {
            return Err(Error::ProofInvalid {
                reason: "proof does not bind the submitted transition",
            });
        }
        if !backend.verify_proof(&proved.proof) {
            return Err(Error::ProofInvalid {
                reason: "balancing proof failed verification",
            });
        }

        // Inputs: known, unspent, of this asset, consumed at most once.
        let mut input_owners = Vec::with_capacity(transition.inputs.len());
        for (idx, input) in transition.inputs.iter().enumerate() {
            if transition.inputs[..idx].contains(input) {
                return Err(Error::DuplicateInput(*input));
            }
            match self.notes.get(input) {
                Some(record) if !record.spent && record.asset == transition.asset => {
                    input_owners.push(record.owner);
                }
                _ => return Err(Error::DoubleSpend(*input)),
            }
        }

        // One signature per input, bound to it, valid for the owner the
        // registry has on record.
        if proved.signatures.len() != transition.inputs.len() {
            return Err(Error::ProofInvalid {
                reason: "signature count does not match input count",
            });
        }
        for ((input, owner), signature) in transition
            .inputs
            .iter()
            .zip(&input_owners)
            .zip(&proved.signatures)
        {
            if signature.input != *input
                || !backend.verify_signature(signature, owner, input, &root)
            {
                return Err(Error::SignatureInvalid(*input));
            }
        }

        // Outputs: fresh commitments, distinct among themselves, never one
        // of this transition's own inputs.
        for (idx, output) in transition.outputs.iter().enumerate() {
            let cm = output.commitment;
            if self.notes.contains_key(&cm)
                || transition.inputs.contains(&cm)
                || transition.outputs[..idx].iter().any(|o| o.commitment == cm)
            {
                return Err(Error::DuplicateCommitment(cm));
            }
        }

        let supply_change = transition
            .public_value_delta
            .checked_neg()
            .and_then(|neg| i64::try_from(neg).ok())
            .ok_or(Error::ProofInvalid {
                reason: "public value delta out of range",
            })?;
        let supply_after = self
            .supply(transition.asset)
            .checked_add_signed(supply_change)
            .ok_or(Error::ProofInvalid {
                reason: "private supply out of range",
            })?;

        // Public value movement: the gate check, the ledger delta, and the
        // gate decrement form one atomic step under the registry's
        // serialized ownership of both.
        if transition.public_value_delta != 0 {
            let required = u64::try_from(transition.public_value_delta.unsigned_abs())
                .map_err(|_| Error::ProofInvalid {
                    reason: "public value delta out of range",
                })?;
            self.gate
                .authorize(transition.public_token_owner, self.operator, required)?;
            ledger.apply_delta(
                transition.public_token_owner,
                transition.asset,
                transition.public_value_delta,
            )?;
            self.gate
                .consume(transition.public_token_owner, self.operator, required)?;
        }

        // Commit: inputs spent, outputs registered, supply adjusted.
        for input in &transition.inputs {
            if let Some(record) = self.notes.get_mut(input) {
                record.spent = true;
            }
        }
        for output in &transition.outputs {
            self.notes.insert(
                output.commitment,
                NoteRecord {
                    asset: transition.asset,
                    owner: output.owner,
                    spent: false,
                },
            );
        }
        self.supply.insert(transition.asset, supply_after);

        info!(
            asset = %transition.asset,
            inputs = transition.inputs.len(),
            outputs = transition.outputs.len(),
            public_value_delta = transition.public_value_delta,
            private_supply = supply_after,
            "transition applied"
        );

        Ok(RegistryDelta {
            asset: transition.asset,
            spent: transition.inputs.clone(),
            registered: transition.outputs.iter().map(|o| o.commitment).collect(),
            public_value_delta: transition.public_value_delta,
            private_supply_after: supply_after,
        })
    }
}

#[cfg(test)]
mod test {
    use joinsplit::{derive_asset, Note, TransitionWitness};

    use super::*;
    use crate::mock::{MockLedger, MockProofBackend};

    struct Fixture {
        registry: NoteRegistry,
        ledger: MockLedger,
        backend: MockProofBackend,
        asset: AssetId,
        depositor: Account,
        owner: OwnerKey,
    }

    fn fixture() -> Fixture {
        let mut rng = rand::thread_rng();
        let operator = Account::random(&mut rng);
        let depositor = Account::random(&mut rng);
        let asset = derive_asset("CUSD");

        let mut ledger = MockLedger::new(operator);
        ledger.mint(depositor, asset, 100);
        ledger.increase_allowance(depositor, operator, 100);

        let mut registry = NoteRegistry::new(operator);
        registry.public_approve(depositor, 100).unwrap();

        Fixture {
            registry,
            ledger,
            backend: MockProofBackend,
            asset,
            depositor,
            owner: OwnerKey::random(&mut rng),
        }
    }

    fn prove(fx: &Fixture, witness: &TransitionWitness) -> ProvedTransition {
        let (proof, signatures) = fx.backend.construct_proof(witness).unwrap();
        ProvedTransition {
            transition: witness.commit(),
            proof,
            signatures,
        }
    }

    fn deposit(fx: &mut Fixture, values: &[u64]) -> Vec<Note> {
        let mut rng = rand::thread_rng();
        let outputs: Vec<Note> = values
            .iter()
            .map(|&v| Note::new(fx.asset, fx.owner, v, &mut rng))
            .collect();
        let witness = TransitionWitness {
            asset: fx.asset,
            inputs: vec![],
            outputs: outputs.clone(),
            public_value_delta: -(values.iter().sum::<u64>() as i128),
            sender: fx.depositor,
            public_token_owner: fx.depositor,
        };
        let proved = prove(fx, &witness);
        fx.registry
            .apply(&proved, &fx.backend, &mut fx.ledger)
            .unwrap();
        outputs
    }

    #[test]
    fn test_deposit_registers_outputs() {
        let mut fx = fixture();
        let notes = deposit(&mut fx, &[5, 5]);

        assert_eq!(fx.registry.supply(fx.asset), 10);
        assert_eq!(fx.ledger.balance_of(fx.depositor), 90);
        for note in &notes {
            assert_eq!(fx.registry.note_state(&note.commit()), NoteState::Unspent);
            assert_eq!(fx.registry.note_owner(&note.commit()), Some(fx.owner));
        }
        // gate consumed exactly the moved value
        assert_eq!(fx.registry.public_allowance(fx.depositor), 90);
    }

    #[test]
    fn test_unknown_input_is_double_spend() {
        let mut rng = rand::thread_rng();
        let mut fx = fixture();
        let stranger = Note::new(fx.asset, fx.owner, 3, &mut rng);

        let witness = TransitionWitness {
            asset: fx.asset,
            inputs: vec![stranger],
            outputs: vec![],
            public_value_delta: 3,
            sender: fx.depositor,
            public_token_owner: fx.depositor,
        };
        let proved = prove(&fx, &witness);
        assert_eq!(
            fx.registry.apply(&proved, &fx.backend, &mut fx.ledger),
            Err(Error::DoubleSpend(stranger.commit()))
        );
    }

    #[test]
    fn test_spent_input_is_double_spend() {
        let mut fx = fixture();
        let notes = deposit(&mut fx, &[10]);

        let spend = |fx: &Fixture, out_value: u64| -> ProvedTransition {
            let witness = TransitionWitness {
                asset: fx.asset,
                inputs: notes.clone(),
                outputs: vec![Note::new(fx.asset, fx.owner, out_value, &mut rand::thread_rng())],
                public_value_delta: 10 - out_value as i128,
                sender: fx.depositor,
                public_token_owner: fx.depositor,
            };
            prove(fx, &witness)
        };

        let first = spend(&fx, 10);
        fx.registry
            .apply(&first, &fx.backend, &mut fx.ledger)
            .unwrap();
        assert_eq!(fx.registry.note_state(&notes[0].commit()), NoteState::Spent);

        let second = spend(&fx, 10);
        assert_eq!(
            fx.registry.apply(&second, &fx.backend, &mut fx.ledger),
            Err(Error::DoubleSpend(notes[0].commit()))
        );

        // resubmitting the identical rejected proof fails identically
        assert_eq!(
            fx.registry.apply(&second, &fx.backend, &mut fx.ledger),
            Err(Error::DoubleSpend(notes[0].commit()))
        );
    }

    #[test]
    fn test_output_collision_rejected() {
        let mut rng = rand::thread_rng();
        let mut fx = fixture();
        let existing = deposit(&mut fx, &[4]);

        // craft a transition re-registering an already-known commitment
        let witness = TransitionWitness {
            asset: fx.asset,
            inputs: vec![],
            outputs: vec![existing[0], Note::new(fx.asset, fx.owner, 4, &mut rng)],
            public_value_delta: -8,
            sender: fx.depositor,
            public_token_owner: fx.depositor,
        };
        let proved = prove(&fx, &witness);
        assert_eq!(
            fx.registry.apply(&proved, &fx.backend, &mut fx.ledger),
            Err(Error::DuplicateCommitment(existing[0].commit()))
        );
    }

    #[test]
    fn test_tampered_proof_rejected() {
        let mut fx = fixture();
        let witness = TransitionWitness {
            asset: fx.asset,
            inputs: vec![],
            outputs: vec![Note::new(
                fx.asset,
                fx.owner,
                5,
                &mut rand::thread_rng(),
            )],
            public_value_delta: -5,
            sender: fx.depositor,
            public_token_owner: fx.depositor,
        };
        let mut proved = prove(&fx, &witness);
        proved.proof.seal[0] ^= 0xff;

        assert_eq!(
            fx.registry.apply(&proved, &fx.backend, &mut fx.ledger),
            Err(Error::ProofInvalid {
                reason: "balancing proof failed verification"
            })
        );
        // rejection left no state behind
        assert_eq!(fx.registry.supply(fx.asset), 0);
        assert_eq!(fx.ledger.balance_of(fx.depositor), 100);
    }

    #[test]
    fn test_mutated_transition_breaks_proof_binding() {
        let mut rng = rand::thread_rng();
        let mut fx = fixture();

        let witness = TransitionWitness {
            asset: fx.asset,
            inputs: vec![],
            outputs: vec![Note::new(fx.asset, fx.owner, 5, &mut rng)],
            public_value_delta: -5,
            sender: fx.depositor,
            public_token_owner: fx.depositor,
        };
        let mut proved = prove(&fx, &witness);
        // the proof was constructed over delta -5; altering the submitted
        // transition must break the root binding
        proved.transition.public_value_delta = 0;

        assert_eq!(
            fx.registry.apply(&proved, &fx.backend, &mut fx.ledger),
            Err(Error::ProofInvalid {
                reason: "proof does not bind the submitted transition"
            })
        );
        assert_eq!(fx.registry.supply(fx.asset), 0);
        assert_eq!(fx.ledger.balance_of(fx.depositor), 100);
    }

    #[test]
    fn test_missing_signature_rejected() {
        let mut fx = fixture();
        let notes = deposit(&mut fx, &[6]);

        let witness = TransitionWitness {
            asset: fx.asset,
            inputs: notes.clone(),
            outputs: vec![],
            public_value_delta: 6,
            sender: fx.depositor,
            public_token_owner: fx.depositor,
        };
        let mut proved = prove(&fx, &witness);
        proved.signatures.clear();

        assert_eq!(
            fx.registry.apply(&proved, &fx.backend, &mut fx.ledger),
            Err(Error::ProofInvalid {
                reason: "signature count does not match input count"
            })
        );
        // the unsigned input stays spendable and no value moved
        assert_eq!(fx.registry.note_state(&notes[0].commit()), NoteState::Unspent);
        assert_eq!(fx.registry.supply(fx.asset), 6);
        assert_eq!(fx.ledger.balance_of(fx.depositor), 94);
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let mut rng = rand::thread_rng();
        let mut fx = fixture();
        let notes = deposit(&mut fx, &[6]);

        let witness = TransitionWitness {
            asset: fx.asset,
            inputs: notes,
            outputs: vec![Note::new(fx.asset, fx.owner, 6, &mut rng)],
            public_value_delta: 0,
            sender: fx.depositor,
            public_token_owner: fx.depositor,
        };
        let mut proved = prove(&fx, &witness);
        proved.signatures[0].bytes[0] ^= 0xff;

        assert_eq!(
            fx.registry.apply(&proved, &fx.backend, &mut fx.ledger),
            Err(Error::SignatureInvalid(proved.transition.inputs[0]))
        );
    }

    #[test]
    fn test_deposit_without_allowance_rejected() {
        let mut rng = rand::thread_rng();
        let operator = Account::random(&mut rng);
        let depositor = Account::random(&mut rng);
        let asset = derive_asset("CUSD");

        let mut ledger = MockLedger::new(operator);
        ledger.mint(depositor, asset, 100);
        ledger.increase_allowance(depositor, operator, 100);

        // ERC20-side allowance is in place, but the gate grant falls short
        let mut registry = NoteRegistry::new(operator);
        registry.public_approve(depositor, 4).unwrap();

        let backend = MockProofBackend;
        let witness = TransitionWitness {
            asset,
            inputs: vec![],
            outputs: vec![Note::new(asset, OwnerKey::random(&mut rng), 5, &mut rng)],
            public_value_delta: -5,
            sender: depositor,
            public_token_owner: depositor,
        };
        let (proof, signatures) = backend.construct_proof(&witness).unwrap();
        let proved = ProvedTransition {
            transition: witness.commit(),
            proof,
            signatures,
        };

        assert_eq!(
            registry.apply(&proved, &backend, &mut ledger),
            Err(Error::InsufficientAllowance {
                holder: depositor,
                spender: operator,
                required: 5,
                available: 4,
            })
        );
        // nothing moved
        assert_eq!(ledger.balance_of(depositor), 100);
        assert_eq!(registry.supply(asset), 0);
    }
}
