use joinsplit::{Account, AssetId, NoteCommitment, ProofConstructionError};

use crate::ledger::LedgerError;
use crate::transaction::TxState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Local witness validation failure (conservation, duplicate inputs,
    /// note reuse, asset mismatch), raised before any external call.
    #[error(transparent)]
    Build(#[from] joinsplit::Error),

    /// The post-apply supply audit failed; the conservation law between the
    /// public and private supplies no longer holds.
    #[error(
        "conservation violated for asset {asset}: public supply {pre_public} -> {post_public}, \
         private supply {pre_private} -> {post_private}, declared delta {public_value_delta}"
    )]
    ConservationViolation {
        asset: AssetId,
        pre_public: u64,
        post_public: u64,
        pre_private: u64,
        post_private: u64,
        public_value_delta: i128,
    },

    #[error("double spend: input note {0} is already spent or unknown to the registry")]
    DoubleSpend(NoteCommitment),

    #[error("duplicate input note {0}")]
    DuplicateInput(NoteCommitment),

    #[error("output note {0} collides with an existing commitment")]
    DuplicateCommitment(NoteCommitment),

    #[error("signature for input note {0} failed verification")]
    SignatureInvalid(NoteCommitment),

    #[error("proof rejected: {reason}")]
    ProofInvalid { reason: &'static str },

    #[error(
        "allowance of {holder} toward {spender} is {available}, \
         transition requires {required}"
    )]
    InsufficientAllowance {
        holder: Account,
        spender: Account,
        required: u64,
        available: u64,
    },

    #[error("allowance amount for {holder} is out of range")]
    InvalidAmount { holder: Account },

    #[error(transparent)]
    ProofConstruction(#[from] ProofConstructionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("transaction is {actual:?}, operation requires {expected:?}")]
    InvalidState { expected: TxState, actual: TxState },
}
