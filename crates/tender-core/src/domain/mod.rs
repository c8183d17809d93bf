pub mod bid;
pub mod organization;
pub mod service_type;
pub mod status;
pub mod tender;
pub mod version;

pub use bid::*;
pub use organization::*;
pub use service_type::*;
pub use status::*;
pub use tender::*;
pub use version::*;
