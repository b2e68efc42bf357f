use super::MemberList;
use crate::{
    common::derive_address,
    constants::{MAX_DESCRIPTION_LEN, TREASURY_SEED, VAULT_SEED},
    error::TokenPoolError,
};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, msg, program_error::ProgramError,
    pubkey::Pubkey,
};

#[repr(u8)]
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PoolStage {
    #[default]
    Uninitialized,
    Fundraising,
    AssetHeld,
    Sold,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq)]
pub struct Pool {
    pub stage: PoolStage,
    /// Amount the members have to raise before the asset can be bought
    pub target_amount: u64,
    /// Paid to the manager when the pool buys its asset
    pub minimum_exemption_amount: u64,
    /// Smallest regular deposit accepted from a member
    pub minimum_amount: u64,
    /// Sum of member deposits while fundraising
    pub current_balance: u64,
    /// Mint of the asset the pool is raising for
    pub target_asset: Pubkey,
    pub description: String,
    /// Custody address of the asset, a pda of the pool
    pub vault: Pubkey,
    pub manager: Pubkey,
    /// Custody address of pooled funds, a pda of the pool
    pub treasury: Pubkey,
    pub member_list: MemberList,
}

/// Terms fixed at initialization.
#[derive(Clone, Debug, PartialEq)]
pub struct PoolTerms {
    pub target_amount: u64,
    pub minimum_amount: u64,
    pub minimum_exemption_amount: u64,
    pub description: String,
    pub max_members: u32,
}

impl PoolTerms {
    pub fn validate(&self) -> Result<(), TokenPoolError> {
        if self.max_members == 0 {
            return Err(TokenPoolError::InvalidCapacity);
        }
        if self.target_amount == 0 {
            return Err(TokenPoolError::InvalidAmount);
        }
        if self.minimum_amount > self.target_amount {
            return Err(TokenPoolError::WrongAmountData);
        }
        if self.minimum_exemption_amount > self.target_amount {
            return Err(TokenPoolError::InvalidAmount);
        }
        if self.description.len() > MAX_DESCRIPTION_LEN {
            return Err(TokenPoolError::DescriptionTooLong);
        }
        Ok(())
    }
}

impl Pool {
    const FIXED_LEN: usize = 1 + 8 + 8 + 8 + 8 + 32 + 4 + 32 + 32 + 32;

    /// Exact encoded size of a pool record.
    pub fn space(description_len: usize, max_members: u32) -> usize {
        Self::FIXED_LEN + description_len + MemberList::space(max_members)
    }

    pub fn find_vault_address(pool: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
        derive_address(&[VAULT_SEED, pool.as_ref()], program_id)
    }

    pub fn find_treasury_address(pool: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
        derive_address(&[TREASURY_SEED, pool.as_ref()], program_id)
    }

    pub fn get_vault_signer_seeds<'a>(pool: &'a Pubkey, bump: &'a u8) -> [&'a [u8]; 3] {
        [VAULT_SEED, pool.as_ref(), bytemuck::bytes_of(bump)]
    }

    pub fn get_treasury_signer_seeds<'a>(pool: &'a Pubkey, bump: &'a u8) -> [&'a [u8]; 3] {
        [TREASURY_SEED, pool.as_ref(), bytemuck::bytes_of(bump)]
    }

    /// Opens a pool in the fundraising stage.
    pub fn open(
        terms: &PoolTerms,
        manager: Pubkey,
        target_asset: Pubkey,
        vault: Pubkey,
        treasury: Pubkey,
    ) -> Result<Self, TokenPoolError> {
        terms.validate()?;
        Ok(Self {
            stage: PoolStage::Fundraising,
            target_amount: terms.target_amount,
            minimum_exemption_amount: terms.minimum_exemption_amount,
            minimum_amount: terms.minimum_amount,
            current_balance: 0,
            target_asset,
            description: terms.description.clone(),
            vault,
            manager,
            treasury,
            member_list: MemberList::with_capacity(terms.max_members),
        })
    }

    pub fn max_members(&self) -> u32 {
        self.member_list.header.max_members
    }

    pub fn require_stage(&self, stage: PoolStage) -> Result<(), TokenPoolError> {
        if self.stage != stage {
            msg!("Pool stage is {:?}, expected {:?}", self.stage, stage);
            return Err(TokenPoolError::InvalidPoolStage);
        }
        Ok(())
    }

    pub fn remaining_target(&self) -> u64 {
        self.target_amount.saturating_sub(self.current_balance)
    }

    pub fn target_reached(&self) -> bool {
        self.current_balance >= self.target_amount
    }

    /// Checks a deposit against the fundraising target. Returns whether the
    /// deposit is a reduced-cost entry: below the minimum, but exactly completing
    /// a remainder that is itself below the minimum.
    pub fn check_deposit(&self, amount: u64) -> Result<bool, TokenPoolError> {
        if amount == 0 {
            return Err(TokenPoolError::InvalidAmount);
        }
        if self.target_reached() {
            return Err(TokenPoolError::TargetBalanceReached);
        }
        let remaining = self.remaining_target();
        if amount > remaining {
            msg!("Deposit {} exceeds remaining target {}", amount, remaining);
            return Err(TokenPoolError::DepositExceedsTarget);
        }
        if amount < self.minimum_amount {
            if amount == remaining {
                return Ok(true);
            }
            msg!("Deposit {} is below minimum {}", amount, self.minimum_amount);
            return Err(TokenPoolError::BelowMinimumAmount);
        }
        Ok(false)
    }

    /// Fundraising -> AssetHeld. Returns the balance released to the seller and manager.
    pub fn begin_holding(&mut self) -> Result<u64, TokenPoolError> {
        self.require_stage(PoolStage::Fundraising)?;
        if !self.target_reached() {
            return Err(TokenPoolError::TargetNotReached);
        }
        let released = self.current_balance;
        self.current_balance = 0;
        self.stage = PoolStage::AssetHeld;
        Ok(released)
    }

    /// AssetHeld -> Sold. Open share sales are settled by the caller.
    pub fn mark_sold(&mut self) -> Result<(), TokenPoolError> {
        self.require_stage(PoolStage::AssetHeld)?;
        self.stage = PoolStage::Sold;
        Ok(())
    }

    pub fn load(account: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if account.owner != program_id {
            msg!("Pool {} is not owned by the program", account.key);
            return Err(TokenPoolError::InvalidOwner.into());
        }
        let data = account.try_borrow_data()?;
        if data.first().copied().unwrap_or_default() == PoolStage::Uninitialized as u8 {
            return Err(TokenPoolError::UninitializedTokenPool.into());
        }
        Self::try_from_slice(&data).map_err(|e| {
            msg!("Failed to deserialize pool: {}", e);
            TokenPoolError::InvalidRecordData.into()
        })
    }

    pub fn save(&self, account: &AccountInfo) -> ProgramResult {
        let bytes = self
            .try_to_vec()
            .map_err(|_| ProgramError::from(TokenPoolError::InvalidRecordData))?;
        let mut data = account.try_borrow_mut_data()?;
        if bytes.len() != data.len() {
            msg!("Pool record is {} bytes, storage is {}", bytes.len(), data.len());
            return Err(TokenPoolError::InvalidRecordData.into());
        }
        data.copy_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemberSlot;

    fn terms() -> PoolTerms {
        PoolTerms {
            target_amount: 5,
            minimum_amount: 1,
            minimum_exemption_amount: 1,
            description: "Monke NFT".to_string(),
            max_members: 4,
        }
    }

    fn open_pool() -> Pool {
        Pool::open(
            &terms(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        )
        .unwrap()
    }

    #[test]
    fn test_open_pool() {
        let pool = open_pool();
        assert_eq!(pool.stage, PoolStage::Fundraising);
        assert_eq!(pool.current_balance, 0);
        assert_eq!(pool.member_list.members.len(), 4);
    }

    #[test]
    fn test_terms_validation() {
        let mut t = terms();
        t.max_members = 0;
        assert_eq!(t.validate(), Err(TokenPoolError::InvalidCapacity));

        let mut t = terms();
        t.minimum_amount = 6;
        assert_eq!(t.validate(), Err(TokenPoolError::WrongAmountData));

        let mut t = terms();
        t.minimum_exemption_amount = 6;
        assert_eq!(t.validate(), Err(TokenPoolError::InvalidAmount));

        let mut t = terms();
        t.description = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        assert_eq!(t.validate(), Err(TokenPoolError::DescriptionTooLong));
    }

    #[test]
    fn test_layout_field_order() {
        let pool = open_pool();
        let bytes = pool.try_to_vec().unwrap();
        assert_eq!(bytes.len(), Pool::space(pool.description.len(), 4));
        assert_eq!(bytes[0], PoolStage::Fundraising as u8);
        assert_eq!(&bytes[1..9], &5u64.to_le_bytes());
        // minimum exemption amount precedes minimum amount
        assert_eq!(&bytes[9..17], &1u64.to_le_bytes());
        assert_eq!(&bytes[17..25], &1u64.to_le_bytes());
        assert_eq!(&bytes[25..33], &0u64.to_le_bytes());
        assert_eq!(&bytes[33..65], pool.target_asset.as_ref());
        assert_eq!(&bytes[65..69], &9u32.to_le_bytes());
        assert_eq!(&bytes[69..78], b"Monke NFT");
    }

    #[test]
    fn test_stage_transitions() {
        let mut pool = open_pool();
        assert_eq!(pool.begin_holding(), Err(TokenPoolError::TargetNotReached));

        pool.current_balance = 5;
        assert_eq!(pool.begin_holding(), Ok(5));
        assert_eq!(pool.stage, PoolStage::AssetHeld);
        assert_eq!(pool.current_balance, 0);
        assert_eq!(pool.begin_holding(), Err(TokenPoolError::InvalidPoolStage));

        pool.member_list.members[0] = MemberSlot::held(Pubkey::new_unique(), 5, 100.0);
        pool.member_list.members[0].share_stage = crate::state::ShareStage::Escrowed;
        assert_eq!(pool.mark_sold(), Ok(()));
        assert_eq!(pool.stage, PoolStage::Sold);
        assert_eq!(pool.mark_sold(), Err(TokenPoolError::InvalidPoolStage));
    }

    #[test]
    fn test_check_deposit() {
        let mut pool = open_pool();
        pool.minimum_amount = 2;
        assert_eq!(pool.check_deposit(0), Err(TokenPoolError::InvalidAmount));
        assert_eq!(pool.check_deposit(6), Err(TokenPoolError::DepositExceedsTarget));
        assert_eq!(pool.check_deposit(1), Err(TokenPoolError::BelowMinimumAmount));
        assert_eq!(pool.check_deposit(2), Ok(false));

        pool.current_balance = 4;
        assert_eq!(pool.check_deposit(1), Ok(true));
        assert_eq!(pool.check_deposit(2), Err(TokenPoolError::DepositExceedsTarget));

        pool.current_balance = 5;
        assert_eq!(pool.check_deposit(1), Err(TokenPoolError::TargetBalanceReached));
    }

    #[test]
    fn test_derived_addresses_are_deterministic() {
        let program_id = crate::id();
        let pool = Pubkey::new_unique();
        assert_eq!(
            Pool::find_vault_address(&pool, &program_id),
            Pool::find_vault_address(&pool, &program_id)
        );
        assert_ne!(
            Pool::find_vault_address(&pool, &program_id).0,
            Pool::find_treasury_address(&pool, &program_id).0
        );
    }
}
