pub mod session;

pub use session::{Session, WalletSession};
