use std::sync::RwLock;

use joinsplit::{Account, AssetId, NoteCommitment, OwnerKey, ProofBackend, ProvedTransition};
use tracing::warn;

use crate::conservation::{self, SupplySnapshot};
use crate::error::Result;
use crate::ledger::PublicLedger;
use crate::registry::{NoteRegistry, NoteState, RegistryDelta};

struct State<L> {
    registry: NoteRegistry,
    ledger: L,
}

/// Serialized owner of the authoritative state: the note registry (with its
/// allowance gate) and the public ledger handle.
///
/// The source system leaned on a blockchain's total transaction ordering;
/// here a single-writer lock plays that role. Mutations (`apply`,
/// `public_approve`) take the write lock and are atomic; reads take the
/// read lock and observe a consistent snapshot, never a half-applied
/// transition. Racing submissions over the same note are ordered by the
/// lock: the first to apply wins, the second is rejected as a double spend.
pub struct Engine<B, L> {
    backend: B,
    state: RwLock<State<L>>,
}

impl<B: ProofBackend, L: PublicLedger> Engine<B, L> {
    pub fn new(operator: Account, backend: B, ledger: L) -> Self {
        Self {
            backend,
            state: RwLock::new(State {
                registry: NoteRegistry::new(operator),
                ledger,
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn operator(&self) -> Account {
        self.read().registry.operator()
    }

    /// Validate and commit one proved transition, then audit the supply
    /// movement against the conservation law before reporting success.
    pub fn apply(&self, proved: &ProvedTransition) -> Result<RegistryDelta> {
        let asset = proved.transition.asset;
        let mut guard = self.state.write().expect("engine lock poisoned");
        let state = &mut *guard;

        let pre = snapshot(state, asset);
        let delta = state
            .registry
            .apply(proved, &self.backend, &mut state.ledger)
            .map_err(|e| {
                warn!(asset = %asset, error = %e, "transition rejected");
                e
            })?;
        let post = snapshot(state, asset);

        conservation::verify(asset, pre, post, proved.transition.public_value_delta)?;
        Ok(delta)
    }

    /// Grant the registry operator spend authority over `holder`'s public
    /// value.
    pub fn public_approve(&self, holder: Account, amount: u64) -> Result<()> {
        self.state
            .write()
            .expect("engine lock poisoned")
            .registry
            .public_approve(holder, amount)
    }

    pub fn note_state(&self, commitment: &NoteCommitment) -> NoteState {
        self.read().registry.note_state(commitment)
    }

    pub fn note_owner(&self, commitment: &NoteCommitment) -> Option<OwnerKey> {
        self.read().registry.note_owner(commitment)
    }

    pub fn private_supply(&self, asset: AssetId) -> u64 {
        self.read().registry.supply(asset)
    }

    pub fn public_supply(&self, asset: AssetId) -> u64 {
        self.read().ledger.total_supply(asset)
    }

    pub fn balance_of(&self, account: Account) -> u64 {
        self.read().ledger.balance_of(account)
    }

    /// Gate allowance from `holder` toward the operator.
    pub fn public_allowance(&self, holder: Account) -> u64 {
        self.read().registry.public_allowance(holder)
    }

    /// ERC20-side allowance from `holder` toward the operator.
    pub fn token_allowance(&self, holder: Account) -> u64 {
        let state = self.read();
        let operator = state.registry.operator();
        state.ledger.allowance(holder, operator)
    }

    /// Both supplies for `asset` under one read lock.
    pub fn supply_snapshot(&self, asset: AssetId) -> SupplySnapshot {
        let state = self.read();
        SupplySnapshot {
            public_supply: state.ledger.total_supply(asset),
            private_supply: state.registry.supply(asset),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State<L>> {
        self.state.read().expect("engine lock poisoned")
    }
}

fn snapshot<L: PublicLedger>(state: &State<L>, asset: AssetId) -> SupplySnapshot {
    SupplySnapshot {
        public_supply: state.ledger.total_supply(asset),
        private_supply: state.registry.supply(asset),
    }
}
