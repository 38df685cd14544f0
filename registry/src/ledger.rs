use joinsplit::{Account, AssetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("public balance of {account} is {available}, debit requires {required}")]
    InsufficientBalance {
        account: Account,
        required: u64,
        available: u64,
    },
    #[error("public allowance of {holder} toward {spender} is {available}, debit requires {required}")]
    InsufficientAllowance {
        holder: Account,
        spender: Account,
        required: u64,
        available: u64,
    },
    #[error("public balance of {account} out of range")]
    BalanceOutOfRange { account: Account },
}

/// The ERC20-equivalent public balance and supply store. An external
/// collaborator: this core only reads balances and instructs signed deltas,
/// it never reimplements token mechanics.
pub trait PublicLedger {
    fn balance_of(&self, account: Account) -> u64;

    fn total_supply(&self, asset: AssetId) -> u64;

    fn allowance(&self, holder: Account, spender: Account) -> u64;

    /// Apply a signed delta to `account`'s balance and the asset's public
    /// total supply: a debit (negative) moves value out of public
    /// circulation into the private note set, a credit (positive) the other
    /// way. Debits require the account's balance, and its allowance toward
    /// the registry operator, to cover the amount.
    fn apply_delta(
        &mut self,
        account: Account,
        asset: AssetId,
        delta: i128,
    ) -> Result<(), LedgerError>;
}
