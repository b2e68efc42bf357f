use crate::accounting::transfer_lamports;
use crate::common::{check_derived_address, check_system_program, log_accounts, log_params};
use crate::error::TokenPoolError;
use crate::share_ledger::{self, SharePolicy};
use crate::state::{MemberAction, MemberRecord, Pool, PoolStage};
use crate::validate;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    pubkey::Pubkey,
};

pub fn upgrade_share(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    amount: u64,
    policy: &dyn SharePolicy,
) -> ProgramResult {
    msg!("Starting upgrade_share...");
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
        .position_of(member.key)
        .ok_or(TokenPoolError::MemberNotInPool)?;
    // Reduced-cost top ups earn the plain share.
    pool.check_deposit(amount)?;
    validate!(
        member.lamports() >= amount,
        TokenPoolError::InsufficientFunds
    )?;

    let target_amount = pool.target_amount;
    let slot = &mut pool.member_list.members[index];
    let share_before = slot.share;
    let share_after = share_ledger::top_up(slot, amount, target_amount, policy)?;
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
        action: MemberAction::Upgrade,
        amount,
        share_before,
        share_after,
        pool_balance: pool.current_balance,
    });
    Ok(())
}
