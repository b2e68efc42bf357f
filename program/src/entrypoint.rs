#![cfg(not(feature = "no-entrypoint"))]

use crate::processor::process_instruction;
use solana_program::entrypoint;

entrypoint!(process_instruction);
