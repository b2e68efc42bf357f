pub mod escrow;
pub mod events;
pub mod member;
pub mod pool;

pub use escrow::*;
pub use events::*;
pub use member::*;
pub use pool::*;
