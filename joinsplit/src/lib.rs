pub mod error;
pub mod note;
pub mod proof;
pub mod transition;

pub use error::Error;
pub use note::{derive_asset, Account, AssetId, Note, NoteCommitment, NoteNonce, OwnerKey};
pub use proof::{
    NoteSignature, ProofBackend, ProofConstructionError, ProofObject, ProvedTransition,
    TransitionRoot,
};
pub use transition::{JoinSplitTransition, OutputDescriptor, TransitionWitness};
