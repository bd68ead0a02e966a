// HTTP routes
pub mod health;
pub mod messages;
pub mod qr;
pub mod restart;
pub mod status;
pub mod stream;

pub use health::*;
pub use messages::*;
pub use qr::*;
pub use restart::*;
pub use status::*;
pub use stream::*;
