//! Deterministic stand-ins for the two external collaborators, used by the
//! test suites and by anyone simulating the protocol without a real proving
//! system or token contract.

use std::collections::HashMap;

use joinsplit::{
    Account, AssetId, Note, NoteCommitment, NoteSignature, OwnerKey, ProofBackend,
    ProofConstructionError, ProofObject, TransitionRoot, TransitionWitness,
};
use sha2::{Digest, Sha256};

use crate::ledger::{LedgerError, PublicLedger};

fn seal_bytes(root: &TransitionRoot) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(b"ZKASSET_MOCK_SEAL");
    hasher.update(root.as_bytes());
    hasher.finalize().to_vec()
}

fn signature_bytes(owner: &OwnerKey, input: &NoteCommitment, root: &TransitionRoot) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(b"ZKASSET_MOCK_NOTE_SIG");
    hasher.update(owner.as_bytes());
    hasher.update(input.as_bytes());
    hasher.update(root.as_bytes());
    hasher.finalize().to_vec()
}

/// Proof backend that seals transitions with tagged hashes instead of real
/// zero-knowledge proofs. Like a sound backend, it refuses to prove a
/// witness that does not balance.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProofBackend;

impl ProofBackend for MockProofBackend {
    fn construct_proof(
        &self,
        witness: &TransitionWitness,
    ) -> Result<(ProofObject, Vec<NoteSignature>), ProofConstructionError> {
        witness
            .check()
            .map_err(|e| ProofConstructionError(e.to_string()))?;

        let root = witness.commit().root();
        let proof = ProofObject {
            root,
            seal: seal_bytes(&root),
        };
        let signatures = witness
            .inputs
            .iter()
            .map(|note: &Note| {
                let input = note.commit();
                NoteSignature {
                    bytes: signature_bytes(&note.owner, &input, &root),
                    input,
                }
            })
            .collect();

        Ok((proof, signatures))
    }

    fn verify_proof(&self, proof: &ProofObject) -> bool {
        proof.seal == seal_bytes(&proof.root)
    }

    fn verify_signature(
        &self,
        signature: &NoteSignature,
        owner: &OwnerKey,
        input: &NoteCommitment,
        root: &TransitionRoot,
    ) -> bool {
        signature.input == *input && signature.bytes == signature_bytes(owner, input, root)
    }
}

/// In-memory ERC20-equivalent: balances, per-asset public supply, and
/// holder/spender allowances, with debits gated on both balance and the
/// holder's allowance toward the configured operator.
#[derive(Debug, Clone)]
pub struct MockLedger {
    operator: Account,
    balances: HashMap<Account, u64>,
    supply: HashMap<AssetId, u64>,
    allowances: HashMap<(Account, Account), u64>,
}

impl MockLedger {
    pub fn new(operator: Account) -> Self {
        Self {
            operator,
            balances: HashMap::new(),
            supply: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Authorized mint: the one operation allowed to change the combined
    /// public-plus-private supply. Saturates at `u64::MAX`.
    pub fn mint(&mut self, account: Account, asset: AssetId, amount: u64) {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
        let supply = self.supply.entry(asset).or_insert(0);
        *supply = supply.saturating_add(amount);
    }

    /// Saturates at `u64::MAX`.
    pub fn increase_allowance(&mut self, holder: Account, spender: Account, amount: u64) {
        let grant = self.allowances.entry((holder, spender)).or_insert(0);
        *grant = grant.saturating_add(amount);
    }
}

impl PublicLedger for MockLedger {
    fn balance_of(&self, account: Account) -> u64 {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    fn total_supply(&self, asset: AssetId) -> u64 {
        self.supply.get(&asset).copied().unwrap_or(0)
    }

    fn allowance(&self, holder: Account, spender: Account) -> u64 {
        self.allowances.get(&(holder, spender)).copied().unwrap_or(0)
    }

    fn apply_delta(
        &mut self,
        account: Account,
        asset: AssetId,
        delta: i128,
    ) -> Result<(), LedgerError> {
        let amount = u64::try_from(delta.unsigned_abs())
            .map_err(|_| LedgerError::BalanceOutOfRange { account })?;

        if delta < 0 {
            let allowed = self.allowance(account, self.operator);
            if allowed < amount {
                return Err(LedgerError::InsufficientAllowance {
                    holder: account,
                    spender: self.operator,
                    required: amount,
                    available: allowed,
                });
            }
            let balance = self.balance_of(account);
            if balance < amount {
                return Err(LedgerError::InsufficientBalance {
                    account,
                    required: amount,
                    available: balance,
                });
            }
            let supply = self
                .total_supply(asset)
                .checked_sub(amount)
                .ok_or(LedgerError::BalanceOutOfRange { account })?;
            self.balances.insert(account, balance - amount);
            self.allowances
                .insert((account, self.operator), allowed - amount);
            self.supply.insert(asset, supply);
        } else if delta > 0 {
            let balance = self
                .balance_of(account)
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOutOfRange { account })?;
            let supply = self
                .total_supply(asset)
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOutOfRange { account })?;
            self.balances.insert(account, balance);
            self.supply.insert(asset, supply);
        }
        Ok(())
    }
}
