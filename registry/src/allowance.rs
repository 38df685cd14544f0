use std::collections::HashMap;

use joinsplit::Account;

use crate::error::{Error, Result};

/// Holder-granted, spender-scoped ceilings on public value movement.
///
/// Grants only ever increase through [`approve`](Self::approve) and only
/// ever decrease by exactly the value a transition consumes, inside the
/// registry's atomic apply.
#[derive(Debug, Clone, Default)]
pub struct AllowanceGate {
    grants: HashMap<(Account, Account), u64>,
}

impl AllowanceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowance(&self, holder: Account, spender: Account) -> u64 {
        self.grants.get(&(holder, spender)).copied().unwrap_or(0)
    }

    /// Top up the grant. Increase-only, so a stale approval can never be
    /// replayed to widen a later one.
    pub fn approve(&mut self, holder: Account, spender: Account, amount: u64) -> Result<()> {
        let grant = self.grants.entry((holder, spender)).or_insert(0);
        *grant = grant
            .checked_add(amount)
            .ok_or(Error::InvalidAmount { holder })?;
        Ok(())
    }

    /// Check-only: does the grant cover `required`?
    pub fn authorize(&self, holder: Account, spender: Account, required: u64) -> Result<()> {
        let available = self.allowance(holder, spender);
        if available < required {
            return Err(Error::InsufficientAllowance {
                holder,
                spender,
                required,
                available,
            });
        }
        Ok(())
    }

    /// Re-check and decrement in one step. Called only from the registry's
    /// apply, in the same serialized step as the public ledger debit.
    pub fn consume(&mut self, holder: Account, spender: Account, amount: u64) -> Result<()> {
        self.authorize(holder, spender, amount)?;
        if let Some(grant) = self.grants.get_mut(&(holder, spender)) {
            *grant -= amount;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_approve_accumulates() {
        let mut rng = rand::thread_rng();
        let holder = Account::random(&mut rng);
        let spender = Account::random(&mut rng);

        let mut gate = AllowanceGate::new();
        assert_eq!(gate.allowance(holder, spender), 0);

        gate.approve(holder, spender, 10).unwrap();
        gate.approve(holder, spender, 6).unwrap();
        assert_eq!(gate.allowance(holder, spender), 16);
    }

    #[test]
    fn test_consume_decrements_exactly() {
        let mut rng = rand::thread_rng();
        let holder = Account::random(&mut rng);
        let spender = Account::random(&mut rng);

        let mut gate = AllowanceGate::new();
        gate.approve(holder, spender, 10).unwrap();

        gate.consume(holder, spender, 7).unwrap();
        assert_eq!(gate.allowance(holder, spender), 3);

        assert_eq!(
            gate.consume(holder, spender, 4),
            Err(Error::InsufficientAllowance {
                holder,
                spender,
                required: 4,
                available: 3,
            })
        );
        // a failed consume leaves the grant untouched
        assert_eq!(gate.allowance(holder, spender), 3);
    }

    #[test]
    fn test_authorize_does_not_consume() {
        let mut rng = rand::thread_rng();
        let holder = Account::random(&mut rng);
        let spender = Account::random(&mut rng);

        let mut gate = AllowanceGate::new();
        gate.approve(holder, spender, 5).unwrap();

        gate.authorize(holder, spender, 5).unwrap();
        assert_eq!(gate.allowance(holder, spender), 5);
    }

    #[test]
    fn test_approve_overflow_rejected() {
        let mut rng = rand::thread_rng();
        let holder = Account::random(&mut rng);
        let spender = Account::random(&mut rng);

        let mut gate = AllowanceGate::new();
        gate.approve(holder, spender, u64::MAX).unwrap();
        assert_eq!(
            gate.approve(holder, spender, 1),
            Err(Error::InvalidAmount { holder })
        );
    }

    #[test]
    fn test_grants_are_scoped_per_pair() {
        let mut rng = rand::thread_rng();
        let holder = Account::random(&mut rng);
        let spender = Account::random(&mut rng);
        let other = Account::random(&mut rng);

        let mut gate = AllowanceGate::new();
        gate.approve(holder, spender, 9).unwrap();

        assert_eq!(gate.allowance(holder, other), 0);
        assert_eq!(gate.allowance(other, spender), 0);
    }
}
