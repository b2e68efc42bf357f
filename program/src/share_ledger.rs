//! Ownership accounting for the member arena.
//!
//! A member's share is expressed in percentage points of the pooled asset. How a
//! deposit turns into points is decided by a [`SharePolicy`]; the ledger only
//! applies the policy and keeps the arena consistent. Policies must be additive
//! (two deposits earn the same points as their sum), which is what lets the
//! ledger check the total against the pool balance after every change.

use crate::{
    constants::{SHARE_EPSILON, SHARE_TOTAL},
    error::TokenPoolError,
    state::{MemberList, MemberSlot, PoolStage},
};
use solana_program::{msg, pubkey::Pubkey};

pub trait SharePolicy {
    /// Percentage points earned by depositing `amount` toward `target_amount`.
    fn share_for_deposit(&self, amount: u64, target_amount: u64) -> Result<f64, TokenPoolError>;

    /// Points withheld from a reduced-cost entrant whose deposit earned `base_share`.
    fn exemption_share(&self, base_share: f64) -> f64;
}

/// Shares proportional to the deposit's fraction of the pool target.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProRataPolicy {
    /// Points withheld from reduced-cost entrants and handed to earlier members.
    pub exemption_share: f64,
}

impl SharePolicy for ProRataPolicy {
    fn share_for_deposit(&self, amount: u64, target_amount: u64) -> Result<f64, TokenPoolError> {
        if target_amount == 0 {
            return Err(TokenPoolError::ArithmeticOverflow);
        }
        let share = amount as f64 * SHARE_TOTAL / target_amount as f64;
        if !share.is_finite() || share > SHARE_TOTAL + SHARE_EPSILON {
            return Err(TokenPoolError::ShareInvariantViolated);
        }
        Ok(share)
    }

    fn exemption_share(&self, base_share: f64) -> f64 {
        if !self.exemption_share.is_finite() {
            return 0.0;
        }
        self.exemption_share.max(0.0).min(base_share)
    }
}

pub fn total_share(list: &MemberList) -> f64 {
    list.occupied().map(|slot| slot.share).sum()
}

/// Occupies `index` with a new member. A reduced-cost entrant gives up the
/// policy's exemption share, which is spread over earlier members pro rata.
pub fn admit(
    list: &mut MemberList,
    index: usize,
    member_key: Pubkey,
    amount: u64,
    target_amount: u64,
    reduced_cost: bool,
    policy: &dyn SharePolicy,
) -> Result<f64, TokenPoolError> {
    if list.members.get(index).map_or(true, |slot| slot.is_occupied()) {
        return Err(TokenPoolError::NoMemberSpaceLeft);
    }
    let base = policy.share_for_deposit(amount, target_amount)?;
    let earlier_total = total_share(list);
    let withheld = if reduced_cost && earlier_total > 0.0 {
        policy.exemption_share(base)
    } else {
        0.0
    };
    if withheld > 0.0 {
        msg!("Redistributing {} exemption points", withheld);
        for slot in list.members.iter_mut().filter(|slot| slot.is_occupied()) {
            slot.share += withheld * slot.share / earlier_total;
        }
    }
    let share = base - withheld;
    list.members[index] = MemberSlot::held(member_key, amount, share);
    Ok(share)
}

/// Adds a further deposit to an existing slot. Returns the slot's new share.
pub fn top_up(
    slot: &mut MemberSlot,
    amount: u64,
    target_amount: u64,
    policy: &dyn SharePolicy,
) -> Result<f64, TokenPoolError> {
    let extra = policy.share_for_deposit(amount, target_amount)?;
    slot.amount_deposited = slot
        .amount_deposited
        .checked_add(amount)
        .ok_or(TokenPoolError::ArithmeticOverflow)?;
    slot.share += extra;
    Ok(slot.share)
}

/// Moves the stake held at `seller_index` to `buyer`, merging with the buyer's
/// slot when there is one. The seller's slot is released. Returns the buyer's index.
pub fn transfer_stake(
    list: &mut MemberList,
    seller_index: usize,
    buyer: Pubkey,
) -> Result<usize, TokenPoolError> {
    let sold = *list
        .members
        .get(seller_index)
        .filter(|slot| slot.is_occupied())
        .ok_or(TokenPoolError::MemberNotInPool)?;
    if let Some(index) = list.position_of(&buyer) {
        if list.members[index].is_escrowed() {
            return Err(TokenPoolError::ShareAlreadyEscrowed);
        }
    }
    list.members[seller_index].release();
    match list.position_of(&buyer) {
        Some(index) => {
            let slot = &mut list.members[index];
            slot.amount_deposited = slot
                .amount_deposited
                .checked_add(sold.amount_deposited)
                .ok_or(TokenPoolError::ArithmeticOverflow)?;
            slot.share += sold.share;
            Ok(index)
        }
        None => {
            let index = list.first_free().ok_or(TokenPoolError::NoMemberSpaceLeft)?;
            list.members[index] = MemberSlot::held(buyer, sold.amount_deposited, sold.share);
            Ok(index)
        }
    }
}

/// Share total the arena must hold for a pool in `stage`.
pub fn expected_total(
    stage: PoolStage,
    current_balance: u64,
    target_amount: u64,
    policy: &dyn SharePolicy,
) -> Result<f64, TokenPoolError> {
    match stage {
        PoolStage::Fundraising => policy.share_for_deposit(current_balance, target_amount),
        PoolStage::AssetHeld | PoolStage::Sold => Ok(SHARE_TOTAL),
        PoolStage::Uninitialized => Ok(0.0),
    }
}

pub fn verify(list: &MemberList, expected: f64) -> Result<(), TokenPoolError> {
    if list.members.len() != list.header.max_members as usize {
        return Err(TokenPoolError::InvalidRecordData);
    }
    let mut total = 0.0;
    for slot in list.occupied() {
        if !slot.share.is_finite() || slot.share < -SHARE_EPSILON {
            return Err(TokenPoolError::ShareInvariantViolated);
        }
        total += slot.share;
    }
    if (total - expected).abs() > SHARE_EPSILON || total > SHARE_TOTAL + SHARE_EPSILON {
        msg!("Shares add up to {}, expected {}", total, expected);
        return Err(TokenPoolError::ShareInvariantViolated);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn list_of(capacity: u32) -> MemberList {
        MemberList::with_capacity(capacity)
    }

    #[test]
    fn test_first_member_gets_fraction_of_target() {
        let mut list = list_of(4);
        let share = admit(
            &mut list,
            0,
            Pubkey::new_unique(),
            1,
            5,
            false,
            &ProRataPolicy::default(),
        )
        .unwrap();
        assert_eq!(share, 20.0);
        verify(&list, 20.0).unwrap();
    }

    #[test]
    fn test_reduced_cost_entry_redistributes() {
        let policy = ProRataPolicy {
            exemption_share: 2.0,
        };
        let mut list = list_of(3);
        admit(&mut list, 0, Pubkey::new_unique(), 2, 10, false, &policy).unwrap();
        admit(&mut list, 1, Pubkey::new_unique(), 6, 10, false, &policy).unwrap();
        let share = admit(&mut list, 2, Pubkey::new_unique(), 2, 10, true, &policy).unwrap();

        assert!((share - 18.0).abs() < SHARE_EPSILON);
        assert!((list.members[0].share - 20.5).abs() < SHARE_EPSILON);
        assert!((list.members[1].share - 61.5).abs() < SHARE_EPSILON);
        verify(&list, 100.0).unwrap();
    }

    #[test]
    fn test_exemption_never_exceeds_base() {
        let policy = ProRataPolicy {
            exemption_share: 50.0,
        };
        assert_eq!(policy.exemption_share(10.0), 10.0);
        assert_eq!(policy.exemption_share(80.0), 50.0);
        let broken = ProRataPolicy {
            exemption_share: f64::NAN,
        };
        assert_eq!(broken.exemption_share(10.0), 0.0);
    }

    #[test]
    fn test_first_reduced_cost_entrant_keeps_base() {
        let policy = ProRataPolicy {
            exemption_share: 2.0,
        };
        let mut list = list_of(2);
        let share = admit(&mut list, 0, Pubkey::new_unique(), 1, 4, true, &policy).unwrap();
        assert_eq!(share, 25.0);
    }

    #[test]
    fn test_admit_into_occupied_slot_fails() {
        let policy = ProRataPolicy::default();
        let mut list = list_of(1);
        admit(&mut list, 0, Pubkey::new_unique(), 1, 5, false, &policy).unwrap();
        assert_eq!(
            admit(&mut list, 0, Pubkey::new_unique(), 1, 5, false, &policy),
            Err(TokenPoolError::NoMemberSpaceLeft)
        );
    }

    #[test]
    fn test_top_up_grows_proportionally() {
        let mut slot = MemberSlot::held(Pubkey::new_unique(), 1, 20.0);
        let share = top_up(&mut slot, 2, 5, &ProRataPolicy::default()).unwrap();
        assert!((share - 60.0).abs() < SHARE_EPSILON);
        assert_eq!(slot.amount_deposited, 3);
    }

    #[test]
    fn test_transfer_to_new_member_reuses_slot() {
        let mut list = list_of(2);
        let seller = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        list.members[0] = MemberSlot::held(seller, 1, 50.0);
        list.members[1] = MemberSlot::held(other, 1, 50.0);

        let buyer = Pubkey::new_unique();
        let index = transfer_stake(&mut list, 0, buyer).unwrap();
        assert_eq!(index, 0);
        assert_eq!(list.members[0].member_key, buyer);
        assert_eq!(list.members[0].share, 50.0);
        verify(&list, 100.0).unwrap();
    }

    #[test]
    fn test_transfer_merges_into_existing_member() {
        let mut list = list_of(3);
        let seller = Pubkey::new_unique();
        let buyer = Pubkey::new_unique();
        list.members[0] = MemberSlot::held(seller, 2, 40.0);
        list.members[1] = MemberSlot::held(buyer, 3, 60.0);

        let index = transfer_stake(&mut list, 0, buyer).unwrap();
        assert_eq!(index, 1);
        assert!(!list.members[0].is_occupied());
        assert_eq!(list.members[1].amount_deposited, 5);
        assert_eq!(list.members[1].share, 100.0);
        assert_eq!(list.members.len(), 3);
    }

    #[test]
    fn test_transfer_into_escrowed_slot_fails() {
        let mut list = list_of(2);
        let seller = Pubkey::new_unique();
        let buyer = Pubkey::new_unique();
        list.members[0] = MemberSlot::held(seller, 2, 40.0);
        list.members[1] = MemberSlot::held(buyer, 3, 60.0);
        list.members[1].share_stage = crate::state::ShareStage::Escrowed;

        let before = list.clone();
        assert_eq!(
            transfer_stake(&mut list, 0, buyer),
            Err(TokenPoolError::ShareAlreadyEscrowed)
        );
        assert_eq!(list, before);
    }

    #[test]
    fn test_verify_detects_drift() {
        let mut list = list_of(2);
        list.members[0] = MemberSlot::held(Pubkey::new_unique(), 1, 60.0);
        list.members[1] = MemberSlot::held(Pubkey::new_unique(), 1, 50.0);
        assert_eq!(
            verify(&list, 100.0),
            Err(TokenPoolError::ShareInvariantViolated)
        );
    }

    proptest! {
        #[test]
        fn prop_deposits_keep_total_in_step(
            deposits in proptest::collection::vec(1u64..1_000, 1..8),
            exemption in 0.0f64..5.0,
        ) {
            let target: u64 = deposits.iter().sum();
            let policy = ProRataPolicy { exemption_share: exemption };
            let mut list = list_of(deposits.len() as u32);
            let mut balance = 0u64;
            for (index, amount) in deposits.iter().enumerate() {
                let reduced_cost = index % 2 == 1;
                admit(&mut list, index, Pubkey::new_unique(), *amount, target, reduced_cost, &policy).unwrap();
                balance += amount;
                let expected = expected_total(PoolStage::Fundraising, balance, target, &policy).unwrap();
                prop_assert!(verify(&list, expected).is_ok());
            }
            prop_assert!((total_share(&list) - SHARE_TOTAL).abs() <= SHARE_EPSILON);
            prop_assert_eq!(list.members.len(), deposits.len());
        }
    }
}
