//! # Article Pager Library
//!
//! Splits long articles into page-sized "conversations" that fit a chat
//! model's context window, and optionally asks a chat completion endpoint
//! whether each page looks broken.
//!
//! ## Example Usage
//!
//! ```rust
//! use article_pager::ArticlePaginator;
//!
//! let paginator = ArticlePaginator::new(4000)?;
//! let pages = paginator.paginate(
//!     "The first sentence. The second sentence.",
//!     "Summarize the article for me.",
//! );
//!
//! assert_eq!(pages.len(), 1);
//! assert!(pages[0].content.ends_with("Summarize the article for me."));
//! # Ok::<(), article_pager::PagerError>(())
//! ```

pub mod error;
pub mod services;
pub mod types;

// Re-export main types and services for easier usage
pub use error::{PagerError, Result};
pub use services::{
    estimate_tokens, AnomalyDetector, AnomalyProber, ArticlePaginator, ContentFetcher,
    ConversionSession, CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore,
    ProberConfig,
};
pub use types::{AnomalyResult, ArticleMetadata, Page, PaginationSummary, SourceType};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
