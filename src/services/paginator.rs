use crate::error::{PagerError, Result};
use crate::services::estimator::estimate_tokens;
use crate::types::{Page, PaginationSummary, RECOMMENDED_MAX_TOKENS};
use tracing::{debug, info, warn};

pub const SENTENCE_DELIMITER: &str = ". ";

pub const CONTINUATION_MARKER: &str = "\n--- end of page. respond ok for the next page";

pub const END_MARKER: &str = "\n--- This is the end of the article\n";

const HEADER_INSTRUCTIONS: &str = "I will send you a long article page by page. Respond \"ok\" after you receive each page. I will ask you to start the task after you receive the full article";

/// Opening block of the first page: the task prompt followed by the
/// page-by-page instructions.
pub fn header_block(prompt: &str) -> String {
    format!("{}\n{}\n", prompt, HEADER_INSTRUCTIONS)
}

/// Split an article into sentence fragments on the literal `". "`.
///
/// An empty article has no fragments.
pub fn split_sentences(article: &str) -> Vec<&str> {
    if article.is_empty() {
        return Vec::new();
    }
    article.split(SENTENCE_DELIMITER).collect()
}

/// Word count plus one for the period eaten by the split.
pub fn sentence_tokens(fragment: &str) -> usize {
    fragment.split(' ').count() + 1
}

pub struct ArticlePaginator {
    max_tokens: usize,
}

impl ArticlePaginator {
    pub fn new(max_tokens: usize) -> Result<Self> {
        if max_tokens == 0 {
            return Err(PagerError::Budget {
                reason: "Token budget must be a positive integer".to_string(),
            });
        }

        if !RECOMMENDED_MAX_TOKENS.contains(&max_tokens) {
            warn!(
                "Token budget {} is outside the recommended range {}-{}",
                max_tokens,
                RECOMMENDED_MAX_TOKENS.start(),
                RECOMMENDED_MAX_TOKENS.end()
            );
        }

        Ok(Self { max_tokens })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn paginate(&self, article: &str, prompt: &str) -> Vec<Page> {
        let sentences = split_sentences(article);
        info!(
            "Paginating article of {} sentences with a budget of {} tokens",
            sentences.len(),
            self.max_tokens
        );

        let mut pages = Vec::new();
        let mut conversation = header_block(prompt);
        let mut token_count = estimate_tokens(&conversation);
        let mut sentence_count = 0;

        for sentence in sentences {
            let tokens = sentence_tokens(sentence);

            if token_count + tokens > self.max_tokens {
                conversation.push_str(CONTINUATION_MARKER);
                pages.push(Self::finish_page(
                    pages.len() + 1,
                    conversation,
                    sentence_count,
                    token_count,
                ));

                conversation = String::new();
                token_count = estimate_tokens(&conversation);
                sentence_count = 0;
            }

            conversation.push_str(sentence);
            conversation.push_str(SENTENCE_DELIMITER);
            token_count += tokens;
            sentence_count += 1;
        }

        conversation.push_str(END_MARKER);
        conversation.push_str(prompt);
        pages.push(Self::finish_page(
            pages.len() + 1,
            conversation,
            sentence_count,
            token_count,
        ));

        info!("Article split into {} pages", pages.len());
        pages
    }

    fn finish_page(
        number: usize,
        content: String,
        sentence_count: usize,
        estimated_tokens: usize,
    ) -> Page {
        debug!(
            "Closed page {} with {} sentences (~{} tokens)",
            number, sentence_count, estimated_tokens
        );
        Page {
            number,
            content,
            sentence_count,
            estimated_tokens,
        }
    }

    pub fn summarize(&self, article: &str, pages: &[Page]) -> PaginationSummary {
        PaginationSummary {
            max_tokens: self.max_tokens,
            total_pages: pages.len(),
            sentence_count: pages.iter().map(|p| p.sentence_count).sum(),
            article_tokens: estimate_tokens(article),
            largest_page_tokens: pages.iter().map(|p| p.estimated_tokens).max().unwrap_or(0),
            oversized_pages: pages
                .iter()
                .filter(|p| p.estimated_tokens > self.max_tokens)
                .map(|p| p.number)
                .collect(),
        }
    }
}
