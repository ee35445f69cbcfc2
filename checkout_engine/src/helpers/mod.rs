pub mod payment_signature;
pub mod totals;

pub use payment_signature::{payment_signature, verify_payment_signature};
pub use totals::{CartTotals, PricingConfig};
