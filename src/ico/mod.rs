pub mod controller;
pub mod eligibility;
pub mod pricing;
pub mod state;

pub use controller::{IcoController, IcoSettings};
pub use eligibility::ClaimEligibilityCalculator;
pub use state::{AppState, TxAction, TxPhase};
