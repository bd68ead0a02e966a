//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod qr_renderer;
pub mod test_dependencies;
pub mod traits;

pub use deps::{BridgeSession, BridgeTransportProvider, ServerDeps};
pub use qr_renderer::QrCodeRenderer;
pub use test_dependencies::TestDependencies;
pub use traits::*;
