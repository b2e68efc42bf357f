use crate::common::{check_derived_address, log_accounts, log_params};
use crate::error::TokenPoolError;
use crate::share_ledger::{self, SharePolicy};
use crate::state::{Escrow, MemberAction, MemberRecord, Pool, PoolStage, ShareStage};
use crate::validate;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    pubkey::Pubkey,
};

pub fn sell_share(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    price: u64,
    policy: &dyn SharePolicy,
) -> ProgramResult {
    msg!("Starting sell_share...");
    msg!("price: {}", price);

    let mut iter = accounts.iter();
    let member = next_account_info(&mut iter)?;
    let pool_account = next_account_info(&mut iter)?;
    let escrow_account = next_account_info(&mut iter)?;
    let escrow_vault = next_account_info(&mut iter)?;

    log_accounts(&[
        (member, "member"),
        (pool_account, "pool"),
        (escrow_account, "escrow"),
        (escrow_vault, "escrow_vault"),
    ]);

    let mut pool = Pool::load(pool_account, program_id)?;
    validate!(
        matches!(pool.stage, PoolStage::Fundraising | PoolStage::AssetHeld),
        TokenPoolError::InvalidPoolStage,
        "Shares cannot be sold while the pool is {:?}",
        pool.stage
    )?;

    let (vault_pda, _) =
        Escrow::find_share_vault_address(member.key, pool_account.key, program_id);
    check_derived_address(escrow_vault, &vault_pda, "Escrow Vault")?;
    validate!(
        pool.member_list.position_of_escrow_vault(&vault_pda).is_none(),
        TokenPoolError::ShareAlreadyEscrowed
    )?;
    let index = pool
        .member_list
        .position_of(member.key)
        .ok_or(TokenPoolError::MemberNotInPool)?;
    validate!(price > 0, TokenPoolError::InvalidAmount)?;
    Escrow::check_blank(escrow_account, program_id)?;

    let slot = &mut pool.member_list.members[index];
    let escrow = Escrow::open_share_sale(
        *member.key,
        *pool_account.key,
        vault_pda,
        pool.target_asset,
        slot.share,
        price,
    )?;
    slot.share_stage = ShareStage::Escrowed;
    slot.escrow = *escrow_account.key;
    slot.member_key = vault_pda;
    let share = slot.share;

    share_ledger::verify(
        &pool.member_list,
        share_ledger::expected_total(
            pool.stage,
            pool.current_balance,
            pool.target_amount,
            policy,
        )?,
    )?;

    escrow.save(escrow_account)?;
    pool.save(pool_account)?;

    log_params(&MemberRecord {
        pool: pool_account.key.to_string(),
        member: member.key.to_string(),
        action: MemberAction::ListShare,
        amount: price,
        share_before: share,
        share_after: share,
        pool_balance: pool.current_balance,
    });
    Ok(())
}
