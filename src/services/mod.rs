pub mod credentials;
pub mod estimator;
pub mod fetcher;
pub mod paginator;
pub mod prober;
pub mod session;

pub use credentials::{CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};
pub use estimator::estimate_tokens;
pub use fetcher::ContentFetcher;
pub use paginator::ArticlePaginator;
pub use prober::{AnomalyDetector, AnomalyProber, ProberConfig};
pub use session::ConversionSession;
