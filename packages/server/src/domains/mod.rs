// Business domains
pub mod messaging;
pub mod session;
