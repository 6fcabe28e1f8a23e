//! Liquidity-share sub-ledger embedded in each pool

use crate::error::{MathError, PoolError};
use crate::types::Address;
use std::collections::HashMap;

/// Prior value of one entry, recorded before it is overwritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareEdit {
    Supply(u128),
    Balance(Address, Option<u128>),
    Allowance(Address, Address, Option<u128>),
}

/// Fungible claim ledger: balances, allowances and total supply
///
/// While journaling, every write records the value it replaces, so an
/// operation can be undone in time proportional to what it touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareLedger {
    total_supply: u128,
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
    journal: Option<Vec<ShareEdit>>,
}

impl ShareLedger {
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: Address) -> u128 {
        self.balances.get(&holder).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    pub fn mint(&mut self, to: Address, amount: u128) -> Result<(), PoolError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(MathError::Overflow)?;
        self.set_supply(supply);
        // Bounded by total_supply, cannot overflow
        self.set_balance(to, self.balance_of(to) + amount);
        Ok(())
    }

    pub fn burn(&mut self, from: Address, amount: u128) -> Result<(), PoolError> {
        self.debit(from, amount)?;
        self.set_supply(self.total_supply - amount);
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), PoolError> {
        self.debit(from, amount)?;
        self.set_balance(to, self.balance_of(to) + amount);
        Ok(())
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) {
        self.set_allowance(owner, spender, amount);
    }

    /// Consume allowance; an allowance of `u128::MAX` is unlimited
    pub fn spend_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        amount: u128,
    ) -> Result<(), PoolError> {
        let allowed = self.allowance(owner, spender);
        if allowed == u128::MAX {
            return Ok(());
        }
        if allowed < amount {
            return Err(PoolError::InsufficientAllowance {
                needed: amount,
                allowed,
            });
        }
        self.set_allowance(owner, spender, allowed - amount);
        Ok(())
    }

    /// Start recording prior values; any unfinished journal is discarded
    pub fn begin_journal(&mut self) {
        self.journal = Some(Vec::new());
    }

    /// Stop recording and hand back the edits, oldest first
    pub fn take_journal(&mut self) -> Vec<ShareEdit> {
        self.journal.take().unwrap_or_default()
    }

    /// Restore the values recorded in `edits`
    pub fn revert(&mut self, edits: Vec<ShareEdit>) {
        for edit in edits.into_iter().rev() {
            match edit {
                ShareEdit::Supply(supply) => self.total_supply = supply,
                ShareEdit::Balance(holder, Some(balance)) => {
                    self.balances.insert(holder, balance);
                }
                ShareEdit::Balance(holder, None) => {
                    self.balances.remove(&holder);
                }
                ShareEdit::Allowance(owner, spender, Some(allowed)) => {
                    self.allowances.insert((owner, spender), allowed);
                }
                ShareEdit::Allowance(owner, spender, None) => {
                    self.allowances.remove(&(owner, spender));
                }
            }
        }
    }

    fn debit(&mut self, from: Address, amount: u128) -> Result<(), PoolError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(PoolError::InsufficientShareBalance {
                needed: amount,
                available,
            });
        }
        self.set_balance(from, available - amount);
        Ok(())
    }

    fn record(&mut self, edit: ShareEdit) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(edit);
        }
    }

    fn set_supply(&mut self, supply: u128) {
        self.record(ShareEdit::Supply(self.total_supply));
        self.total_supply = supply;
    }

    fn set_balance(&mut self, holder: Address, balance: u128) {
        let previous = self.balances.insert(holder, balance);
        self.record(ShareEdit::Balance(holder, previous));
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, allowed: u128) {
        let previous = self.allowances.insert((owner, spender), allowed);
        self.record(ShareEdit::Allowance(owner, spender, previous));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_transfer_burn() {
        let alice = Address::from_low_u64(1);
        let bob = Address::from_low_u64(2);
        let mut shares = ShareLedger::default();

        shares.mint(alice, 100).unwrap();
        shares.transfer(alice, bob, 30).unwrap();
        shares.burn(bob, 10).unwrap();

        assert_eq!(shares.balance_of(alice), 70);
        assert_eq!(shares.balance_of(bob), 20);
        assert_eq!(shares.total_supply(), 90);
        assert_eq!(
            shares.burn(bob, 21),
            Err(PoolError::InsufficientShareBalance {
                needed: 21,
                available: 20
            })
        );
    }

    #[test]
    fn test_allowance_spending() {
        let owner = Address::from_low_u64(1);
        let spender = Address::from_low_u64(2);
        let mut shares = ShareLedger::default();

        shares.approve(owner, spender, 50);
        shares.spend_allowance(owner, spender, 20).unwrap();
        assert_eq!(shares.allowance(owner, spender), 30);
        assert!(matches!(
            shares.spend_allowance(owner, spender, 31),
            Err(PoolError::InsufficientAllowance { .. })
        ));

        shares.approve(owner, spender, u128::MAX);
        shares.spend_allowance(owner, spender, 1_000).unwrap();
        assert_eq!(shares.allowance(owner, spender), u128::MAX);
    }

    #[test]
    fn test_journal_reverts_only_touched_entries() {
        let alice = Address::from_low_u64(1);
        let bob = Address::from_low_u64(2);
        let carol = Address::from_low_u64(3);
        let mut shares = ShareLedger::default();
        shares.mint(alice, 100).unwrap();
        shares.approve(alice, bob, 40);
        let before = shares.clone();

        shares.begin_journal();
        shares.spend_allowance(alice, bob, 25).unwrap();
        shares.transfer(alice, carol, 25).unwrap();
        shares.mint(bob, 10).unwrap();
        shares.burn(carol, 5).unwrap();
        shares.approve(carol, bob, 7);
        let edits = shares.take_journal();
        assert_eq!(edits.len(), 8);

        shares.revert(edits);
        assert_eq!(shares, before);
        assert_eq!(shares.balance_of(carol), 0);
        assert_eq!(shares.allowance(alice, bob), 40);
    }

    #[test]
    fn test_writes_outside_journal_are_not_recorded() {
        let mut shares = ShareLedger::default();
        shares.mint(Address::from_low_u64(1), 5).unwrap();
        assert!(shares.take_journal().is_empty());
    }
}
