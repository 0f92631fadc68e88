// Domain value objects
pub mod scan_code;
pub mod scan_status;
pub mod scan_type;

pub use scan_code::*;
pub use scan_status::*;
pub use scan_type::*;
