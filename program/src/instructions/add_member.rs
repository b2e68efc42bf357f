use crate::accounting::transfer_lamports;
use crate::common::{check_derived_address, check_system_program, log_accounts, log_params};
use crate::error::TokenPoolError;
use crate::share_ledger::{self, SharePolicy};
use crate::state::{Escrow, MemberAction, MemberRecord, Pool, PoolStage};
use crate::validate;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    pubkey::Pubkey,
};

pub fn add_member(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    amount: u64,
    policy: &dyn SharePolicy,
) -> ProgramResult {
    msg!("Starting add_member...");
    msg!("amount: {}", amount);

    let mut iter = accounts.iter();
    let member = next_account_info(&mut iter)?;
    let pool_account = next_account_info(&mut iter)?;
    let treasury = next_account_info(&mut iter)?;
    let system_program = next_account_info(&mut iter)?;

    log_accounts(&[
        (member, "member"),
        (pool_account, "pool"),
        (treasury, "treasury"),
        (system_program, "system_program"),
    ]);

    check_system_program(system_program)?;
    let mut pool = Pool::load(pool_account, program_id)?;
    check_derived_address(treasury, &pool.treasury, "Treasury")?;

    pool.require_stage(PoolStage::Fundraising)?;
    let index = pool
        .member_list
        .first_free()
        .ok_or(TokenPoolError::NoMemberSpaceLeft)?;
    validate!(
        pool.member_list.position_of(member.key).is_none(),
        TokenPoolError::MemberAlreadyExists,
        "{} already holds a slot",
        member.key
    )?;
    let (share_vault, _) =
        Escrow::find_share_vault_address(member.key, pool_account.key, program_id);
    validate!(
        pool.member_list.position_of_escrow_vault(&share_vault).is_none(),
        TokenPoolError::MemberAlreadyExists,
        "{} has a share on sale in this pool",
        member.key
    )?;
    let reduced_cost = pool.check_deposit(amount)?;
    validate!(
        pool.member_list.free_slots() > 1 || amount == pool.remaining_target(),
        TokenPoolError::InsufficientFundsAsLastMember,
        "The last member has to complete the remaining {}",
        pool.remaining_target()
    )?;
    validate!(
        member.lamports() >= amount,
        TokenPoolError::InsufficientFunds
    )?;

    let share = share_ledger::admit(
        &mut pool.member_list,
        index,
        *member.key,
        amount,
        pool.target_amount,
        reduced_cost,
        policy,
    )?;
    pool.current_balance = pool
        .current_balance
        .checked_add(amount)
        .ok_or(TokenPoolError::ArithmeticOverflow)?;
    share_ledger::verify(
        &pool.member_list,
        share_ledger::expected_total(
            pool.stage,
            pool.current_balance,
            pool.target_amount,
            policy,
        )?,
    )?;

    transfer_lamports(member, treasury, system_program, amount, &[])?;
    pool.save(pool_account)?;

    log_params(&MemberRecord {
        pool: pool_account.key.to_string(),
        member: member.key.to_string(),
        action: MemberAction::Join,
        amount,
        share_before: 0.0,
        share_after: share,
        pool_balance: pool.current_balance,
    });
    Ok(())
}
