use std::fmt;

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifies one confidential asset. Each asset has its own private supply
/// in the registry and its own public supply on the linked token ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub [u8; 32]);

pub fn derive_asset(unit: &str) -> AssetId {
    let mut hasher = Sha256::new();
    hasher.update(b"ZKASSET_ASSET_ID");
    hasher.update(unit.as_bytes());
    AssetId(hasher.finalize().into())
}

impl AssetId {
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.hex()[..8])
    }
}

/// A note owner's public key. Opaque to the ledger core; only the
/// ProofBackend interprets these bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerKey(pub [u8; 32]);

impl OwnerKey {
    pub fn random(mut rng: impl CryptoRngCore) -> Self {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// An account on the public token ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Account(pub [u8; 20]);

impl Account {
    pub fn random(mut rng: impl CryptoRngCore) -> Self {
        let mut addr = [0u8; 20];
        rng.fill_bytes(&mut addr);
        Self(addr)
    }

    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", &self.hex()[..8])
    }
}

/// Blinds the note commitment so that notes of equal value and owner remain
/// unlinkable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteNonce([u8; 32]);

impl NoteNonce {
    pub fn random(mut rng: impl CryptoRngCore) -> Self {
        let mut nonce = [0u8; 32];
        rng.fill_bytes(&mut nonce);
        Self(nonce)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// The registered identifier of a note. This is all the registry ever sees
/// of a note's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteCommitment([u8; 32]);

impl NoteCommitment {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for NoteCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.hex()[..8])
    }
}

/// A note's plaintext witness: a single-owner, single-use value commitment.
/// Known only to the party that created it and anyone they disclose it to
/// off-registry. The value never crosses the registry boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub asset: AssetId,
    pub owner: OwnerKey,
    pub value: u64,
    pub nonce: NoteNonce,
}

impl Note {
    pub fn new(asset: AssetId, owner: OwnerKey, value: u64, rng: impl CryptoRngCore) -> Self {
        Self {
            asset,
            owner,
            value,
            nonce: NoteNonce::random(rng),
        }
    }

    pub fn commit(&self) -> NoteCommitment {
        let mut hasher = Sha256::new();
        hasher.update(b"ZKASSET_NOTE_COMMIT");
        hasher.update(self.asset.0);
        hasher.update(self.owner.0);
        hasher.update(self.value.to_le_bytes());
        hasher.update(self.nonce.0);
        NoteCommitment(hasher.finalize().into())
    }
}
