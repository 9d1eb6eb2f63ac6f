// Remote store access: search/stream seam, HTTP backend, and credentials.

pub mod credentials;
pub mod http_store;
pub mod traits;

pub use credentials::{CredentialState, TokenFileProvider};
pub use http_store::HttpRemoteStore;
pub use traits::{CredentialProvider, MediaStream, RemoteFile, RemoteHandle, RemoteStore};
