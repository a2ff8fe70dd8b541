pub mod messaging;
pub mod replay;

pub use messaging::Delivery;
pub use replay::{ReplayRequest, ReplayStrategy};
