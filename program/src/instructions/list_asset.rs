use crate::accounting::{check_asset_custody, hand_over_asset};
use crate::common::{check_derived_address, check_token_program, log_accounts, log_params};
use crate::error::TokenPoolError;
use crate::state::{Escrow, PoolAction, PoolRecord};
use crate::validate;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    pubkey::Pubkey,
};

pub fn list_asset(program_id: &Pubkey, accounts: &[AccountInfo], price: u64) -> ProgramResult {
    msg!("Starting list_asset...");
    msg!("price: {}", price);

    let mut iter = accounts.iter();
    let seller = next_account_info(&mut iter)?;
    let escrow_account = next_account_info(&mut iter)?;
    let seller_asset_account = next_account_info(&mut iter)?;
    let escrow_vault = next_account_info(&mut iter)?;
    let asset_mint = next_account_info(&mut iter)?;
    let token_program = next_account_info(&mut iter)?;

    log_accounts(&[
        (seller, "seller"),
        (escrow_account, "escrow"),
        (seller_asset_account, "seller_asset_account"),
        (escrow_vault, "escrow_vault"),
        (asset_mint, "asset_mint"),
        (token_program, "token_program"),
    ]);

    check_token_program(token_program)?;
    validate!(price > 0, TokenPoolError::InvalidAmount)?;
    Escrow::check_blank(escrow_account, program_id)?;

    let (vault_pda, _) = Escrow::find_listing_vault_address(seller_asset_account.key, program_id);
    check_derived_address(escrow_vault, &vault_pda, "Listing Vault")?;
    check_asset_custody(seller_asset_account, asset_mint.key, seller.key)?;

    let escrow = Escrow::open_listing(
        *seller.key,
        *seller_asset_account.key,
        vault_pda,
        *asset_mint.key,
        price,
    )?;

    hand_over_asset(token_program, seller_asset_account, seller, &vault_pda, &[])?;
    escrow.save(escrow_account)?;

    log_params(&PoolRecord {
        record: escrow_account.key.to_string(),
        action: PoolAction::ListAsset,
        counterparty: seller.key.to_string(),
        amount: price,
        manager_fee: 0,
    });
    Ok(())
}
