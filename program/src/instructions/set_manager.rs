use crate::common::{log_accounts, log_params};
use crate::error::TokenPoolError;
use crate::state::{Pool, PoolAction, PoolRecord};
use crate::validate;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    pubkey::Pubkey,
};

pub fn set_manager(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    msg!("Starting set_manager...");

    let mut iter = accounts.iter();
    let manager = next_account_info(&mut iter)?;
    let pool_account = next_account_info(&mut iter)?;
    let new_manager = next_account_info(&mut iter)?;

    log_accounts(&[
        (manager, "manager"),
        (pool_account, "pool"),
        (new_manager, "new_manager"),
    ]);

    let mut pool = Pool::load(pool_account, program_id)?;
    validate!(
        pool.manager == *manager.key,
        TokenPoolError::Unauthorized,
        "Pool is managed by {}",
        pool.manager
    )?;

    pool.manager = *new_manager.key;
    pool.save(pool_account)?;

    log_params(&PoolRecord {
        record: pool_account.key.to_string(),
        action: PoolAction::SetManager,
        counterparty: new_manager.key.to_string(),
        amount: 0,
        manager_fee: 0,
    });
    Ok(())
}
