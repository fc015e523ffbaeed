//! Reading time estimate

use super::post::PostDetail;
use super::richtext::as_plain_text;

/// Average reading speed used when none is configured
pub const WORDS_PER_MINUTE: u32 = 200;

/// Estimated reading time in whole minutes at 200 words per minute
pub fn reading_time(post: &PostDetail) -> u32 {
    reading_time_with(post, WORDS_PER_MINUTE)
}

/// Estimated reading time in whole minutes, rounded up
///
/// Body words and heading words both count: headings are scanned too.
pub fn reading_time_with(post: &PostDetail, words_per_minute: u32) -> u32 {
    let words = body_word_count(post) + heading_word_count(post);
    let wpm = words_per_minute.max(1) as usize;
    words.div_ceil(wpm) as u32
}

/// Words in the plain text of every section body
pub fn body_word_count(post: &PostDetail) -> usize {
    post.content
        .iter()
        .map(|block| as_plain_text(&block.body))
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .count()
}

/// Words in every non-empty heading
pub fn heading_word_count(post: &PostDetail) -> usize {
    post.content
        .iter()
        .filter(|block| !block.heading.trim().is_empty())
        .map(|block| block.heading.split_whitespace().count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Banner, ContentBlock, RichText, RichTextNode};

    fn post(content: Vec<ContentBlock>) -> PostDetail {
        PostDetail {
            uid: "p".to_string(),
            first_publication_date: None,
            last_publication_date: None,
            title: "T".to_string(),
            subtitle: String::new(),
            author: String::new(),
            banner: Banner::default(),
            content,
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn block(heading: &str, paragraphs: &[String]) -> ContentBlock {
        ContentBlock {
            heading: heading.to_string(),
            body: RichText(
                paragraphs
                    .iter()
                    .map(|p| RichTextNode::paragraph(p.as_str()))
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_zero_content() {
        assert_eq!(reading_time(&post(Vec::new())), 0);
    }

    #[test]
    fn test_exact_and_ceiling() {
        let exact = post(vec![block("", &[words(150), words(50)]), block("", &[words(200)])]);
        assert_eq!(body_word_count(&exact), 400);
        assert_eq!(reading_time(&exact), 2);

        let over = post(vec![block("", &[words(401)])]);
        assert_eq!(reading_time(&over), 3);
    }

    #[test]
    fn test_headings_are_counted() {
        let p = post(vec![
            block("Getting started now", &[words(199)]),
            block("   ", &[]),
            block("Next", &[]),
        ]);
        assert_eq!(heading_word_count(&p), 4);
        assert_eq!(reading_time(&p), 2);
    }

    #[test]
    fn test_blocks_are_not_glued_together() {
        // "end" and "start" must stay two words across block boundaries
        let p = post(vec![block("", &["the end".to_string()]), block("", &["start".to_string()])]);
        assert_eq!(body_word_count(&p), 3);
    }

    #[test]
    fn test_custom_speed() {
        let p = post(vec![block("", &[words(300)])]);
        assert_eq!(reading_time_with(&p, 100), 3);
        assert_eq!(reading_time_with(&p, 0), 300);
    }
}
