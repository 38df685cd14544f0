use joinsplit::AssetId;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An asset's public and private supplies at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplySnapshot {
    pub public_supply: u64,
    pub private_supply: u64,
}

/// Audit the conservation law across one applied transition: whatever left
/// the public supply entered the private supply (and vice versa), and the
/// public-side movement matches the transition's declared delta exactly.
///
/// Runs as a post-apply guard on the engine and doubles as the test oracle.
pub fn verify(
    asset: AssetId,
    pre: SupplySnapshot,
    post: SupplySnapshot,
    public_value_delta: i128,
) -> Result<()> {
    let public_change = post.public_supply as i128 - pre.public_supply as i128;
    let private_change = post.private_supply as i128 - pre.private_supply as i128;

    if public_change + private_change != 0 || public_change != public_value_delta {
        return Err(Error::ConservationViolation {
            asset,
            pre_public: pre.public_supply,
            post_public: post.public_supply,
            pre_private: pre.private_supply,
            post_private: post.private_supply,
            public_value_delta,
        });
    }
    Ok(())
}
