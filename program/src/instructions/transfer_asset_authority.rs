use crate::accounting::{
    check_asset_custody, close_record, hand_over_asset, split_proceeds, transfer_lamports,
};
use crate::common::{
    check_derived_address, check_system_program, check_token_program, log_accounts, log_params,
};
use crate::error::TokenPoolError;
use crate::instruction::{FinalSaleArgs, FINAL_SALE_ACCOUNTS};
use crate::share_ledger::{self, SharePolicy};
use crate::state::{
    Escrow, EscrowStage, MemberAction, MemberRecord, Pool, PoolAction, PoolRecord,
};
use crate::validate;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    pubkey::Pubkey,
};

/// Final sale of the pooled asset. Pays the members out by share and closes the pool.
/// An open share sale is settled to its seller and its escrow record closed.
pub fn transfer_asset_authority(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    args: FinalSaleArgs,
    policy: &dyn SharePolicy,
) -> ProgramResult {
    msg!("Starting transfer_asset_authority...");
    log_params(&args);

    let (fixed, payees) = accounts.split_at(FINAL_SALE_ACCOUNTS.len().min(accounts.len()));
    let mut iter = fixed.iter();
    let manager = next_account_info(&mut iter)?;
    let buyer = next_account_info(&mut iter)?;
    let pool_account = next_account_info(&mut iter)?;
    let treasury = next_account_info(&mut iter)?;
    let asset_account = next_account_info(&mut iter)?;
    let pool_vault = next_account_info(&mut iter)?;
    let token_program = next_account_info(&mut iter)?;
    let system_program = next_account_info(&mut iter)?;

    log_accounts(&[
        (manager, "manager"),
        (buyer, "buyer"),
        (pool_account, "pool"),
        (treasury, "treasury"),
        (asset_account, "asset_account"),
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
        "Only the manager can sell the asset"
    )?;
    check_derived_address(treasury, &pool.treasury, "Treasury")?;
    check_derived_address(pool_vault, &pool.vault, "Vault")?;
    pool.mark_sold()?;

    validate!(
        args.price > 0 && args.exemption_amount <= args.price,
        TokenPoolError::InvalidAmount,
        "Exemption {} exceeds price {}",
        args.exemption_amount,
        args.price
    )?;
    validate!(
        buyer.lamports() >= args.price,
        TokenPoolError::InsufficientFunds
    )?;
    check_asset_custody(asset_account, &pool.target_asset, pool_vault.key)?;
    share_ledger::verify(
        &pool.member_list,
        share_ledger::expected_total(
            pool.stage,
            pool.current_balance,
            pool.target_amount,
            policy,
        )?,
    )?;

    let holders: Vec<_> = pool.member_list.occupied().copied().collect();
    let mut trailing = payees.iter();
    let mut settlements = Vec::with_capacity(holders.len());
    for slot in &holders {
        let payee = trailing
            .next()
            .ok_or(TokenPoolError::InvalidAccountShape)?;
        if !slot.is_escrowed() {
            validate!(
                *payee.key == slot.member_key,
                TokenPoolError::MemberNotInPool,
                "Member account {} does not match slot holder {}",
                payee.key,
                slot.member_key
            )?;
            settlements.push((payee, None));
            continue;
        }

        let escrow_account = trailing
            .next()
            .ok_or(TokenPoolError::InvalidAccountShape)?;
        validate!(
            *escrow_account.key == slot.escrow,
            TokenPoolError::ShareSaleInProgress,
            "Open share sale {} must be settled with the pool",
            slot.escrow
        )?;
        let escrow = Escrow::load(escrow_account, program_id)?;
        escrow.require_stage(EscrowStage::Initialized)?;
        validate!(
            escrow.seller == *payee.key && escrow.escrow_vault == slot.member_key,
            TokenPoolError::MemberNotInPool,
            "Escrow {} was not opened by {}",
            escrow_account.key,
            payee.key
        )?;
        settlements.push((payee, Some(escrow_account)));
    }
    validate!(
        trailing.next().is_none(),
        TokenPoolError::InvalidAccountShape,
        "Expected {} member accounts, got {}",
        holders.len(),
        payees.len()
    )?;

    let distributable = args.price - args.exemption_amount;
    let shares: Vec<f64> = holders.iter().map(|slot| slot.share).collect();
    let (payouts, dust) = split_proceeds(distributable, &shares)?;
    let manager_cut = args
        .exemption_amount
        .checked_add(dust)
        .ok_or(TokenPoolError::ArithmeticOverflow)?;

    transfer_lamports(buyer, treasury, system_program, args.price, &[])?;

    let (_, treasury_bump) = Pool::find_treasury_address(pool_account.key, program_id);
    let treasury_seeds = Pool::get_treasury_signer_seeds(pool_account.key, &treasury_bump);
    for (((payee, escrow_account), slot), payout) in
        settlements.iter().zip(&holders).zip(&payouts)
    {
        transfer_lamports(treasury, payee, system_program, *payout, &[&treasury_seeds])?;
        if let Some(escrow_account) = escrow_account {
            msg!("Settling share sale {}", escrow_account.key);
            close_record(escrow_account, payee)?;
        }
        log_params(&MemberRecord {
            pool: pool_account.key.to_string(),
            member: payee.key.to_string(),
            action: MemberAction::Payout,
            amount: *payout,
            share_before: slot.share,
            share_after: 0.0,
            pool_balance: 0,
        });
    }
    transfer_lamports(
        treasury,
        manager,
        system_program,
        manager_cut,
        &[&treasury_seeds],
    )?;

    let (_, vault_bump) = Pool::find_vault_address(pool_account.key, program_id);
    let vault_seeds = Pool::get_vault_signer_seeds(pool_account.key, &vault_bump);
    hand_over_asset(
        token_program,
        asset_account,
        pool_vault,
        buyer.key,
        &[&vault_seeds],
    )?;

    msg!("Closing pool {}", pool_account.key);
    transfer_lamports(
        treasury,
        manager,
        system_program,
        treasury.lamports(),
        &[&treasury_seeds],
    )?;
    close_record(pool_account, manager)?;

    log_params(&PoolRecord {
        record: pool_account.key.to_string(),
        action: PoolAction::FinalSale,
        counterparty: buyer.key.to_string(),
        amount: args.price,
        manager_fee: manager_cut,
    });
    Ok(())
}
