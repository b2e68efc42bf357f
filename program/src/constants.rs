// SEEDS
pub const VAULT_SEED: &[u8] = b"pool";
pub const TREASURY_SEED: &[u8] = b"treasury";
pub const SHARE_ESCROW_SEED: &[u8] = b"escrow";
pub const LISTING_ESCROW_SEED: &[u8] = b"listnft";

// SHARES
/// Percentage points held by a fully subscribed pool.
pub const SHARE_TOTAL: f64 = 100.0;
pub const SHARE_EPSILON: f64 = 1e-6;

pub const MAX_DESCRIPTION_LEN: usize = 128;

/// A non-fungible asset is a token account holding exactly one unit.
pub const ASSET_UNITS: u64 = 1;
