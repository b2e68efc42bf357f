use crate::accounting::{check_asset_custody, hand_over_asset, transfer_lamports};
use crate::common::{
    check_derived_address, check_system_program, check_token_program, log_accounts, log_params,
};
use crate::error::TokenPoolError;
use crate::share_ledger::{self, SharePolicy};
use crate::state::{Escrow, EscrowKind, Pool, PoolAction, PoolRecord, PoolStage};
use crate::validate;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    pubkey::Pubkey,
};

pub fn buy_asset(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    policy: &dyn SharePolicy,
) -> ProgramResult {
    msg!("Starting buy_asset...");

    let mut iter = accounts.iter();
    let manager = next_account_info(&mut iter)?;
    let pool_account = next_account_info(&mut iter)?;
    let treasury = next_account_info(&mut iter)?;
    let escrow_account = next_account_info(&mut iter)?;
    let seller = next_account_info(&mut iter)?;
    let asset_account = next_account_info(&mut iter)?;
    let escrow_vault = next_account_info(&mut iter)?;
    let pool_vault = next_account_info(&mut iter)?;
    let token_program = next_account_info(&mut iter)?;
    let system_program = next_account_info(&mut iter)?;

    log_accounts(&[
        (manager, "manager"),
        (pool_account, "pool"),
        (treasury, "treasury"),
        (escrow_account, "escrow"),
        (seller, "seller"),
        (asset_account, "asset_account"),
        (escrow_vault, "escrow_vault"),
        (pool_vault, "pool_vault"),
        (token_program, "token_program"),
        (system_program, "system_program"),
    ]);

    check_token_program(token_program)?;
    check_system_program(system_program)?;

    let mut pool = Pool::load(pool_account, program_id)?;
    validate!(
        pool.manager == *manager.key,
        TokenPoolError::Unauthorized,
        "Only the manager can buy the asset"
    )?;
    check_derived_address(treasury, &pool.treasury, "Treasury")?;
    check_derived_address(pool_vault, &pool.vault, "Vault")?;
    pool.require_stage(PoolStage::Fundraising)?;
    validate!(pool.target_reached(), TokenPoolError::TargetNotReached)?;

    let mut escrow = Escrow::load(escrow_account, program_id)?;
    validate!(
        escrow.kind(program_id)? == EscrowKind::AssetListing
            && escrow.asset_owner_record == *asset_account.key
            && escrow.asset == pool.target_asset,
        TokenPoolError::AssetMismatch,
        "Escrow {} does not list the pool's target asset",
        escrow_account.key
    )?;
    validate!(
        escrow.seller == *seller.key,
        TokenPoolError::Unauthorized,
        "Asset was listed by {}",
        escrow.seller
    )?;
    check_derived_address(escrow_vault, &escrow.escrow_vault, "Listing Vault")?;

    check_asset_custody(asset_account, &escrow.asset, escrow_vault.key)?;
    escrow.confirm_deposit()?;
    validate!(
        pool.current_balance >= escrow.amount,
        TokenPoolError::InsufficientFunds,
        "Raised {} but the asset is listed at {}",
        pool.current_balance,
        escrow.amount
    )?;

    let released = pool.begin_holding()?;
    let manager_fee = pool.minimum_exemption_amount;
    let seller_payout = released
        .checked_sub(manager_fee)
        .ok_or(TokenPoolError::ArithmeticOverflow)?;
    escrow.settle_listing(*pool_account.key)?;
    share_ledger::verify(
        &pool.member_list,
        share_ledger::expected_total(
            pool.stage,
            pool.current_balance,
            pool.target_amount,
            policy,
        )?,
    )?;

    let (_, treasury_bump) = Pool::find_treasury_address(pool_account.key, program_id);
    let treasury_seeds = Pool::get_treasury_signer_seeds(pool_account.key, &treasury_bump);
    transfer_lamports(
        treasury,
        manager,
        system_program,
        manager_fee,
        &[&treasury_seeds],
    )?;
    transfer_lamports(
        treasury,
        seller,
        system_program,
        seller_payout,
        &[&treasury_seeds],
    )?;

    let (_, vault_bump) = Escrow::find_listing_vault_address(asset_account.key, program_id);
    let vault_seeds = Escrow::get_listing_vault_signer_seeds(asset_account.key, &vault_bump);
    hand_over_asset(
        token_program,
        asset_account,
        escrow_vault,
        &pool.vault,
        &[&vault_seeds],
    )?;

    escrow.save(escrow_account)?;
    pool.save(pool_account)?;

    log_params(&PoolRecord {
        record: pool_account.key.to_string(),
        action: PoolAction::BuyAsset,
        counterparty: seller.key.to_string(),
        amount: seller_payout,
        manager_fee,
    });
    Ok(())
}
