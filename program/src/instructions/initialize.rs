use crate::accounting::{rent_exempt_minimum, transfer_lamports};
use crate::common::{check_derived_address, check_system_program, log_accounts, log_params};
use crate::error::TokenPoolError;
use crate::instruction::InitializeArgs;
use crate::share_ledger::{self, SharePolicy};
use crate::state::{Pool, PoolAction, PoolRecord, PoolTerms};
use crate::validate;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    pubkey::Pubkey,
};

pub fn initialize(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: InitializeArgs,
    policy: &dyn SharePolicy,
) -> ProgramResult {
    msg!("Starting initialize...");
    log_params(&args);

    let mut iter = accounts.iter();
    let manager = next_account_info(&mut iter)?;
    let pool_account = next_account_info(&mut iter)?;
    let vault = next_account_info(&mut iter)?;
    let treasury = next_account_info(&mut iter)?;
    let target_asset = next_account_info(&mut iter)?;
    let system_program = next_account_info(&mut iter)?;

    log_accounts(&[
        (manager, "manager"),
        (pool_account, "pool"),
        (vault, "vault"),
        (treasury, "treasury"),
        (target_asset, "target_asset"),
        (system_program, "system_program"),
    ]);

    let terms = PoolTerms::from(&args);
    terms.validate()?;
    check_system_program(system_program)?;

    validate!(
        pool_account.owner == program_id,
        TokenPoolError::InvalidOwner,
        "Pool storage must be allocated to the program"
    )?;
    validate!(
        *target_asset.owner == spl_token::id(),
        TokenPoolError::AssetMismatch,
        "Target asset {} is not a token mint",
        target_asset.key
    )?;
    {
        let data = pool_account.try_borrow_data()?;
        validate!(
            data.iter().all(|byte| *byte == 0),
            TokenPoolError::AlreadyInitialized
        )?;
        let expected = Pool::space(terms.description.len(), terms.max_members);
        validate!(
            data.len() == expected,
            TokenPoolError::InvalidAccountShape,
            "Pool storage is {} bytes, expected {}",
            data.len(),
            expected
        )?;
    }

    let (vault_pda, _) = Pool::find_vault_address(pool_account.key, program_id);
    check_derived_address(vault, &vault_pda, "Vault")?;
    let (treasury_pda, _) = Pool::find_treasury_address(pool_account.key, program_id);
    check_derived_address(treasury, &treasury_pda, "Treasury")?;

    let pool = Pool::open(
        &terms,
        *manager.key,
        *target_asset.key,
        vault_pda,
        treasury_pda,
    )?;
    share_ledger::verify(
        &pool.member_list,
        share_ledger::expected_total(pool.stage, 0, pool.target_amount, policy)?,
    )?;

    let treasury_rent = rent_exempt_minimum()?.saturating_sub(treasury.lamports());
    msg!("Funding treasury with {} lamports", treasury_rent);
    transfer_lamports(manager, treasury, system_program, treasury_rent, &[])?;

    pool.save(pool_account)?;

    log_params(&PoolRecord {
        record: pool_account.key.to_string(),
        action: PoolAction::Initialize,
        counterparty: manager.key.to_string(),
        amount: pool.target_amount,
        manager_fee: pool.minimum_exemption_amount,
    });
    Ok(())
}
