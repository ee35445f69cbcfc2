mod cart_api;
mod checkout_api;
mod inventory_api;
mod order_api;
mod verify_api;

pub use cart_api::CartApi;
pub use checkout_api::{CheckoutApi, CheckoutRequest, CheckoutResult};
pub use inventory_api::InventoryApi;
pub use order_api::OrderLifecycleApi;
pub use verify_api::VerificationApi;
