pub mod add_member;
pub mod buy_asset;
pub mod buy_share;
pub mod initialize;
pub mod list_asset;
pub mod sell_share;
pub mod set_manager;
pub mod transfer_asset_authority;
pub mod upgrade_share;

pub use add_member::*;
pub use buy_asset::*;
pub use buy_share::*;
pub use initialize::*;
pub use list_asset::*;
pub use sell_share::*;
pub use set_manager::*;
pub use transfer_asset_authority::*;
pub use upgrade_share::*;
