pub mod accounting;
pub mod common;
pub mod constants;
pub mod entrypoint;
pub mod error;
pub mod instruction;
pub mod instructions;
pub mod macros;
pub mod processor;
pub mod share_ledger;
pub mod state;


pub use solana_program;

solana_program::declare_id!("CNJTwAKDYLsYs7sybmiCf4cQVX8g7gcLxTdfufb3zSgF");
