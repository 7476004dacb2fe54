pub mod client;
pub mod transport;

pub use client::{DirectoryClient, DirectoryLookup};
pub use transport::{HttpTransport, ReqwestTransport};
