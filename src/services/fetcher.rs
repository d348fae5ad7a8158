use crate::error::{PagerError, Result};
use crate::types::{ArticleMetadata, SourceType};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::info;
use url::Url;

/// Source name that reads the article from standard input.
pub const STDIN_SOURCE: &str = "-";

pub struct ContentFetcher;

impl ContentFetcher {
    pub async fn fetch_content(source: &str) -> Result<(String, ArticleMetadata)> {
        if source == STDIN_SOURCE {
            Self::fetch_from_stdin().await
        } else if Self::is_url(source) {
            Self::fetch_from_url(source).await
        } else {
            Self::fetch_from_file(source).await
        }
    }

    async fn fetch_from_url(url: &str) -> Result<(String, ArticleMetadata)> {
        info!("Fetching article from URL: {}", url);

        let parsed_url = Url::parse(url)?;
        let client = reqwest::Client::new();
        let response = client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(PagerError::HttpStatus {
                status: response.status().as_u16(),
            });
        }

        let content = response.text().await?;
        let filename = Self::extract_filename_from_url(&parsed_url);
        let metadata = Self::metadata(filename, SourceType::Url, &content);

        Ok((content, metadata))
    }

    async fn fetch_from_file(file_path: &str) -> Result<(String, ArticleMetadata)> {
        info!("Reading article file: {}", file_path);

        let path = Path::new(file_path);

        if !path.exists() {
            return Err(PagerError::FileNotFound {
                path: file_path.to_string(),
            });
        }

        let content = fs::read_to_string(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let metadata = Self::metadata(filename, SourceType::LocalFile, &content);

        Ok((content, metadata))
    }

    async fn fetch_from_stdin() -> Result<(String, ArticleMetadata)> {
        info!("Reading article from standard input");

        let mut content = String::new();
        tokio::io::stdin().read_to_string(&mut content).await?;
        let metadata = Self::metadata("stdin".to_string(), SourceType::Stdin, &content);

        Ok((content, metadata))
    }

    fn metadata(filename: String, source_type: SourceType, content: &str) -> ArticleMetadata {
        ArticleMetadata {
            filename,
            source_type,
            fetched_at: chrono::Utc::now().to_rfc3339(),
            total_chars: content.chars().count(),
        }
    }

    fn is_url(source: &str) -> bool {
        source.starts_with("http://") || source.starts_with("https://")
    }

    fn extract_filename_from_url(url: &Url) -> String {
        url.path_segments()
            .and_then(|segments| segments.last())
            .and_then(|name| if name.is_empty() { None } else { Some(name) })
            .unwrap_or("article.txt")
            .to_string()
    }

    pub fn validate_sources(sources: &[String]) -> Result<Vec<String>> {
        let mut validated = Vec::new();

        for source in sources {
            if source == STDIN_SOURCE {
                validated.push(source.clone());
            } else if Self::is_url(source) {
                Url::parse(source)?;
                validated.push(source.clone());
            } else {
                let path = Path::new(source);
                if path.is_file() {
                    validated.push(source.clone());
                } else {
                    return Err(PagerError::FileNotFound {
                        path: source.clone(),
                    });
                }
            }
        }

        Ok(validated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("article.txt");
        std::fs::write(&path, "First. Second.").unwrap();

        let (content, metadata) = ContentFetcher::fetch_content(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(content, "First. Second.");
        assert_eq!(metadata.filename, "article.txt");
        assert_eq!(metadata.total_chars, 14);
        assert!(matches!(metadata.source_type, SourceType::LocalFile));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = ContentFetcher::fetch_content("/definitely/not/here.txt").await;
        assert!(matches!(result, Err(PagerError::FileNotFound { .. })));
    }

    #[test]
    fn test_validate_sources() {
        let ok = vec!["-".to_string(), "https://example.com/post".to_string()];
        assert_eq!(ContentFetcher::validate_sources(&ok).unwrap(), ok);

        let bad_url = vec!["https://".to_string()];
        assert!(ContentFetcher::validate_sources(&bad_url).is_err());

        let missing = vec!["./no-such-article.txt".to_string()];
        assert!(matches!(
            ContentFetcher::validate_sources(&missing),
            Err(PagerError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_filename_from_url() {
        let url = Url::parse("https://example.com/blog/long-read.html").unwrap();
        assert_eq!(ContentFetcher::extract_filename_from_url(&url), "long-read.html");
        let root = Url::parse("https://example.com/").unwrap();
        assert_eq!(ContentFetcher::extract_filename_from_url(&root), "article.txt");
    }
}
