use std::fmt;

use serde::{Deserialize, Serialize};

use crate::note::{NoteCommitment, OwnerKey};
use crate::transition::{JoinSplitTransition, TransitionWitness};

/// Commitment to a full transition; see [`JoinSplitTransition::root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionRoot(pub [u8; 32]);

impl TransitionRoot {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TransitionRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.hex()[..8])
    }
}

/// An opaque join-split proof. The seal's contents are the backend's
/// concern; this core only checks that the proof binds the transition it
/// was submitted with and lets the backend verify the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofObject {
    pub root: TransitionRoot,
    pub seal: Vec<u8>,
}

/// Authorizes consumption of one input note, signed by the note's owner
/// over the transition root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSignature {
    pub input: NoteCommitment,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("proof backend failed: {0}")]
pub struct ProofConstructionError(pub String);

/// The external proving system. Implementations own all cryptography:
/// commitments, range proofs, and owner signatures. The registry treats
/// proofs and signatures as black boxes and consults the backend to verify
/// them.
pub trait ProofBackend {
    /// Produce a proof of the transition's balancing equation plus one
    /// authorization signature per input note. A sound backend refuses a
    /// witness that does not balance.
    fn construct_proof(
        &self,
        witness: &TransitionWitness,
    ) -> Result<(ProofObject, Vec<NoteSignature>), ProofConstructionError>;

    /// Verify the proof's arithmetic claims.
    fn verify_proof(&self, proof: &ProofObject) -> bool;

    /// Verify that `signature` authorizes consuming `input` within the
    /// transition identified by `root`, under the claimed owner key.
    fn verify_signature(
        &self,
        signature: &NoteSignature,
        owner: &OwnerKey,
        input: &NoteCommitment,
        root: &TransitionRoot,
    ) -> bool;
}

/// A transition bundled with its proof and signatures: the unit an
/// untrusted submitter hands to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvedTransition {
    pub transition: JoinSplitTransition,
    pub proof: ProofObject,
    pub signatures: Vec<NoteSignature>,
}
