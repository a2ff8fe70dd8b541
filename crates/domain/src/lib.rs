pub mod entities;
pub mod ports;
pub mod value_objects;

pub use entities::*;
pub use graccreq_errors::{GraccreqError, GraccreqResult};
pub use ports::*;
pub use value_objects::*;
