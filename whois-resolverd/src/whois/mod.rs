pub mod client;
pub mod resolver;
