use crate::{
    common::derive_address,
    constants::{LISTING_ESCROW_SEED, SHARE_ESCROW_SEED, SHARE_TOTAL},
    error::TokenPoolError,
};
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    program_pack::{Pack, Sealed},
    pubkey::Pubkey,
};
use static_assertions::const_assert_eq;

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EscrowStage {
    #[default]
    Uninitialized,
    Initialized,
    AssetDeposited,
    AssetSold,
}

impl TryFrom<u8> for EscrowStage {
    type Error = TokenPoolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Uninitialized),
            1 => Ok(Self::Initialized),
            2 => Ok(Self::AssetDeposited),
            3 => Ok(Self::AssetSold),
            _ => Err(TokenPoolError::InvalidRecordData),
        }
    }
}

/// What an escrow is mediating. Recovered from the escrow vault derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscrowKind {
    /// The asset itself is for sale; `asset_owner_record` is the seller's token account.
    AssetListing,
    /// A member's share is for sale; `asset_owner_record` is the pool.
    ShareSale,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Escrow {
    pub stage: EscrowStage,
    pub seller: Pubkey,
    pub buyer: Pubkey,
    pub escrow_vault: Pubkey,
    /// Percentage points being sold, 100 for the whole asset.
    pub share: f64,
    pub asset: Pubkey,
    pub asset_owner_record: Pubkey,
    /// Price in lamports.
    pub amount: u64,
}

impl Escrow {
    pub fn find_share_vault_address(
        seller: &Pubkey,
        pool: &Pubkey,
        program_id: &Pubkey,
    ) -> (Pubkey, u8) {
        derive_address(&[SHARE_ESCROW_SEED, seller.as_ref(), pool.as_ref()], program_id)
    }

    pub fn find_listing_vault_address(asset_account: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
        derive_address(&[LISTING_ESCROW_SEED, asset_account.as_ref()], program_id)
    }

    pub fn get_listing_vault_signer_seeds<'a>(
        asset_account: &'a Pubkey,
        bump: &'a u8,
    ) -> [&'a [u8]; 3] {
        [
            LISTING_ESCROW_SEED,
            asset_account.as_ref(),
            bytemuck::bytes_of(bump),
        ]
    }

    fn check_terms(share: f64, amount: u64) -> Result<(), TokenPoolError> {
        if amount == 0 {
            return Err(TokenPoolError::InvalidAmount);
        }
        if !(share > 0.0 && share <= SHARE_TOTAL) {
            return Err(TokenPoolError::ShareInvariantViolated);
        }
        Ok(())
    }

    /// Uninitialized -> Initialized for a member's share.
    pub fn open_share_sale(
        seller: Pubkey,
        pool: Pubkey,
        escrow_vault: Pubkey,
        asset: Pubkey,
        share: f64,
        amount: u64,
    ) -> Result<Self, TokenPoolError> {
        Self::check_terms(share, amount)?;
        Ok(Self {
            stage: EscrowStage::Initialized,
            seller,
            buyer: Pubkey::default(),
            escrow_vault,
            share,
            asset,
            asset_owner_record: pool,
            amount,
        })
    }

    /// Uninitialized -> Initialized for the whole asset.
    pub fn open_listing(
        seller: Pubkey,
        asset_account: Pubkey,
        escrow_vault: Pubkey,
        asset: Pubkey,
        amount: u64,
    ) -> Result<Self, TokenPoolError> {
        Self::check_terms(SHARE_TOTAL, amount)?;
        Ok(Self {
            stage: EscrowStage::Initialized,
            seller,
            buyer: Pubkey::default(),
            escrow_vault,
            share: SHARE_TOTAL,
            asset,
            asset_owner_record: asset_account,
            amount,
        })
    }

    pub fn kind(&self, program_id: &Pubkey) -> Result<EscrowKind, TokenPoolError> {
        let (listing_vault, _) = Self::find_listing_vault_address(&self.asset_owner_record, program_id);
        if listing_vault == self.escrow_vault {
            return Ok(EscrowKind::AssetListing);
        }
        let (share_vault, _) =
            Self::find_share_vault_address(&self.seller, &self.asset_owner_record, program_id);
        if share_vault == self.escrow_vault {
            return Ok(EscrowKind::ShareSale);
        }
        Err(TokenPoolError::InvalidDerivedAddress)
    }

    pub fn require_stage(&self, stage: EscrowStage) -> Result<(), TokenPoolError> {
        if self.stage != stage {
            msg!("Escrow stage is {:?}, expected {:?}", self.stage, stage);
            return Err(TokenPoolError::InvalidEscrowStage);
        }
        Ok(())
    }

    /// Initialized -> AssetDeposited once custody has been verified in the escrow vault.
    pub fn confirm_deposit(&mut self) -> Result<(), TokenPoolError> {
        self.require_stage(EscrowStage::Initialized)?;
        self.stage = EscrowStage::AssetDeposited;
        Ok(())
    }

    /// AssetDeposited -> AssetSold.
    pub fn settle_listing(&mut self, buyer: Pubkey) -> Result<(), TokenPoolError> {
        self.require_stage(EscrowStage::AssetDeposited)?;
        self.buyer = buyer;
        self.stage = EscrowStage::AssetSold;
        Ok(())
    }

    /// Initialized -> consumed. The caller closes the record afterwards.
    pub fn consume_share_sale(&mut self, buyer: Pubkey) -> Result<(), TokenPoolError> {
        self.require_stage(EscrowStage::Initialized)?;
        if buyer == self.seller {
            return Err(TokenPoolError::SelfPurchase);
        }
        self.buyer = buyer;
        Ok(())
    }

    pub fn load(account: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if account.owner != program_id {
            msg!("Escrow {} is not owned by the program", account.key);
            return Err(TokenPoolError::InvalidOwner.into());
        }
        Self::unpack_from_slice(&account.try_borrow_data()?)
    }

    /// Checks that `account` is fresh program-owned storage for a new escrow.
    pub fn check_blank(account: &AccountInfo, program_id: &Pubkey) -> ProgramResult {
        if account.owner != program_id {
            msg!("Escrow {} is not owned by the program", account.key);
            return Err(TokenPoolError::InvalidOwner.into());
        }
        let data = account.try_borrow_data()?;
        if data.len() != Escrow::LEN {
            msg!("Escrow storage is {} bytes, expected {}", data.len(), Escrow::LEN);
            return Err(TokenPoolError::InvalidRecordData.into());
        }
        if data[0] != EscrowStage::Uninitialized as u8 {
            return Err(TokenPoolError::AlreadyInitialized.into());
        }
        Ok(())
    }

    pub fn save(&self, account: &AccountInfo) -> ProgramResult {
        let mut data = account.try_borrow_mut_data()?;
        if data.len() != Escrow::LEN {
            return Err(TokenPoolError::InvalidRecordData.into());
        }
        self.pack_into_slice(&mut data);
        Ok(())
    }
}

impl Sealed for Escrow {}

impl Pack for Escrow {
    const LEN: usize = 1 + 32 + 32 + 32 + 8 + 32 + 32 + 8;

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Escrow::LEN];
        let (stage, seller, buyer, escrow_vault, share, asset, asset_owner_record, amount) =
            mut_array_refs![dst, 1, 32, 32, 32, 8, 32, 32, 8];
        stage[0] = self.stage as u8;
        seller.copy_from_slice(self.seller.as_ref());
        buyer.copy_from_slice(self.buyer.as_ref());
        escrow_vault.copy_from_slice(self.escrow_vault.as_ref());
        *share = self.share.to_le_bytes();
        asset.copy_from_slice(self.asset.as_ref());
        asset_owner_record.copy_from_slice(self.asset_owner_record.as_ref());
        *amount = self.amount.to_le_bytes();
    }

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        if src.len() != Escrow::LEN {
            return Err(TokenPoolError::InvalidRecordData.into());
        }
        let src = array_ref![src, 0, Escrow::LEN];
        let (stage, seller, buyer, escrow_vault, share, asset, asset_owner_record, amount) =
            array_refs![src, 1, 32, 32, 32, 8, 32, 32, 8];
        let share = f64::from_le_bytes(*share);
        if share.is_nan() {
            return Err(TokenPoolError::InvalidRecordData.into());
        }
        Ok(Self {
            stage: EscrowStage::try_from(stage[0])?,
            seller: Pubkey::new_from_array(*seller),
            buyer: Pubkey::new_from_array(*buyer),
            escrow_vault: Pubkey::new_from_array(*escrow_vault),
            share,
            asset: Pubkey::new_from_array(*asset),
            asset_owner_record: Pubkey::new_from_array(*asset_owner_record),
            amount: u64::from_le_bytes(*amount),
        })
    }
}

const_assert_eq!(Escrow::LEN, 177);

#[cfg(test)]
mod tests {
    use super::*;

    fn share_sale(program_id: &Pubkey) -> Escrow {
        let seller = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let (vault, _) = Escrow::find_share_vault_address(&seller, &pool, program_id);
        Escrow::open_share_sale(seller, pool, vault, Pubkey::new_unique(), 20.0, 3).unwrap()
    }

    fn listing(program_id: &Pubkey) -> Escrow {
        let asset_account = Pubkey::new_unique();
        let (vault, _) = Escrow::find_listing_vault_address(&asset_account, program_id);
        Escrow::open_listing(
            Pubkey::new_unique(),
            asset_account,
            vault,
            Pubkey::new_unique(),
            10,
        )
        .unwrap()
    }

    #[test]
    fn test_kind_is_recovered_from_vault() {
        let program_id = crate::id();
        assert_eq!(share_sale(&program_id).kind(&program_id), Ok(EscrowKind::ShareSale));
        assert_eq!(listing(&program_id).kind(&program_id), Ok(EscrowKind::AssetListing));

        let mut forged = listing(&program_id);
        forged.escrow_vault = Pubkey::new_unique();
        assert_eq!(
            forged.kind(&program_id),
            Err(TokenPoolError::InvalidDerivedAddress)
        );
    }

    #[test]
    fn test_terms_are_checked() {
        let vault = Pubkey::new_unique();
        let key = Pubkey::new_unique();
        assert_eq!(
            Escrow::open_share_sale(key, key, vault, key, 20.0, 0),
            Err(TokenPoolError::InvalidAmount)
        );
        assert_eq!(
            Escrow::open_share_sale(key, key, vault, key, 0.0, 1),
            Err(TokenPoolError::ShareInvariantViolated)
        );
        assert_eq!(
            Escrow::open_share_sale(key, key, vault, key, 100.5, 1),
            Err(TokenPoolError::ShareInvariantViolated)
        );
    }

    #[test]
    fn test_listing_lifecycle() {
        let program_id = crate::id();
        let mut escrow = listing(&program_id);
        assert_eq!(escrow.share, 100.0);
        assert_eq!(escrow.stage, EscrowStage::Initialized);
        assert_eq!(
            escrow.settle_listing(Pubkey::new_unique()),
            Err(TokenPoolError::InvalidEscrowStage)
        );

        escrow.confirm_deposit().unwrap();
        assert_eq!(escrow.stage, EscrowStage::AssetDeposited);
        assert_eq!(escrow.confirm_deposit(), Err(TokenPoolError::InvalidEscrowStage));

        let buyer = Pubkey::new_unique();
        escrow.settle_listing(buyer).unwrap();
        assert_eq!(escrow.stage, EscrowStage::AssetSold);
        assert_eq!(escrow.buyer, buyer);
    }

    #[test]
    fn test_share_sale_consumption() {
        let program_id = crate::id();
        let mut escrow = share_sale(&program_id);
        assert_eq!(
            escrow.consume_share_sale(escrow.seller),
            Err(TokenPoolError::SelfPurchase)
        );
        escrow.consume_share_sale(Pubkey::new_unique()).unwrap();

        escrow.stage = EscrowStage::AssetSold;
        assert_eq!(
            escrow.consume_share_sale(Pubkey::new_unique()),
            Err(TokenPoolError::InvalidEscrowStage)
        );
    }

    #[test]
    fn test_layout_offsets() {
        let escrow = share_sale(&crate::id());
        let mut buf = [0u8; Escrow::LEN];
        escrow.pack_into_slice(&mut buf);
        assert_eq!(buf[0], EscrowStage::Initialized as u8);
        assert_eq!(&buf[1..33], escrow.seller.as_ref());
        assert_eq!(&buf[33..65], &[0u8; 32]);
        assert_eq!(&buf[65..97], escrow.escrow_vault.as_ref());
        assert_eq!(&buf[97..105], &20f64.to_le_bytes());
        assert_eq!(&buf[105..137], escrow.asset.as_ref());
        assert_eq!(&buf[137..169], escrow.asset_owner_record.as_ref());
        assert_eq!(&buf[169..177], &3u64.to_le_bytes());
        assert_eq!(Escrow::unpack_from_slice(&buf).unwrap(), escrow);
    }
}
