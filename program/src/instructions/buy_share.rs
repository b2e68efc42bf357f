use crate::accounting::{close_record, transfer_lamports};
use crate::common::{check_derived_address, check_system_program, log_accounts, log_params};
use crate::error::TokenPoolError;
use crate::share_ledger::{self, SharePolicy};
use crate::state::{
    Escrow, EscrowKind, EscrowStage, MemberAction, MemberRecord, Pool, PoolStage,
};
use crate::validate;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    pubkey::Pubkey,
};

pub fn buy_share(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    policy: &dyn SharePolicy,
) -> ProgramResult {
    msg!("Starting buy_share...");

    let mut iter = accounts.iter();
    let buyer = next_account_info(&mut iter)?;
    let seller = next_account_info(&mut iter)?;
    let pool_account = next_account_info(&mut iter)?;
    let escrow_account = next_account_info(&mut iter)?;
    let escrow_vault = next_account_info(&mut iter)?;
    let system_program = next_account_info(&mut iter)?;

    log_accounts(&[
        (buyer, "buyer"),
        (seller, "seller"),
        (pool_account, "pool"),
        (escrow_account, "escrow"),
        (escrow_vault, "escrow_vault"),
        (system_program, "system_program"),
    ]);

    check_system_program(system_program)?;
    let mut pool = Pool::load(pool_account, program_id)?;
    validate!(
        matches!(pool.stage, PoolStage::Fundraising | PoolStage::AssetHeld),
        TokenPoolError::InvalidPoolStage
    )?;

    let mut escrow = Escrow::load(escrow_account, program_id)?;
    escrow.require_stage(EscrowStage::Initialized)?;
    validate!(
        escrow.kind(program_id)? == EscrowKind::ShareSale
            && escrow.asset_owner_record == *pool_account.key,
        TokenPoolError::AssetMismatch,
        "Escrow {} is not a share sale of this pool",
        escrow_account.key
    )?;
    validate!(
        escrow.seller == *seller.key,
        TokenPoolError::Unauthorized,
        "Escrow was opened by {}",
        escrow.seller
    )?;
    check_derived_address(escrow_vault, &escrow.escrow_vault, "Escrow Vault")?;

    let seller_index = pool
        .member_list
        .position_of_escrow(escrow_account.key)
        .ok_or(TokenPoolError::MemberNotInPool)?;
    escrow.consume_share_sale(*buyer.key)?;

    let (buyer_vault, _) =
        Escrow::find_share_vault_address(buyer.key, pool_account.key, program_id);
    validate!(
        pool.member_list.position_of_escrow_vault(&buyer_vault).is_none(),
        TokenPoolError::ShareAlreadyEscrowed,
        "Buyer has a share sale open"
    )?;
    validate!(
        buyer.lamports() >= escrow.amount,
        TokenPoolError::InsufficientFunds
    )?;

    let share_before = pool
        .member_list
        .position_of(buyer.key)
        .map_or(0.0, |index| pool.member_list.members[index].share);
    let buyer_index = share_ledger::transfer_stake(&mut pool.member_list, seller_index, *buyer.key)?;
    let share_after = pool.member_list.members[buyer_index].share;
    share_ledger::verify(
        &pool.member_list,
        share_ledger::expected_total(
            pool.stage,
            pool.current_balance,
            pool.target_amount,
            policy,
        )?,
    )?;

    transfer_lamports(buyer, seller, system_program, escrow.amount, &[])?;
    close_record(escrow_account, seller)?;
    pool.save(pool_account)?;

    log_params(&MemberRecord {
        pool: pool_account.key.to_string(),
        member: buyer.key.to_string(),
        action: MemberAction::BuyShare,
        amount: escrow.amount,
        share_before,
        share_after,
        pool_balance: pool.current_balance,
    });
    Ok(())
}
