/*
 * Content presentation helpers: splitting post content
 * into paragraph blocks, splicing ad placeholders in
 * between them, and estimating reading time.
 *
 * Pure functions, no state, no side effects. The actual
 * ad creatives are the client's business - the API only
 * marks where they go.
 */

use serde::Serialize;
use crate::utils::text_utils;

// Placement rules tuned for a sane content-to-ad ratio.
// Minimum number of paragraphs before the first in-content ad:
pub const PARAGRAPHS_BEFORE_FIRST_AD: usize = 3;
// Number of paragraphs between ads:
pub const PARAGRAPHS_BETWEEN_ADS: usize = 4;
// Maximum number of ads per page:
pub const MAX_ADS_PER_PAGE: usize = 3;
// Minimum content length in characters to show ads at all:
pub const MIN_CONTENT_LENGTH: usize = 500;

const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
  Paragraph { text: String },
  Ad { slot: usize }
}

// Markdown-ish: blocks are separated by blank lines.
pub fn split_paragraphs(content: &str) -> Vec<String> {
  content
    .split("\n\n")
    .map(|p| p.trim())
    .filter(|p| !p.is_empty())
    .map(String::from)
    .collect()
}

// Splice ad markers into an ordered list of blocks: skip
// the first start_after blocks, then one ad every
// between_ads blocks, capped at max_ads, and never after
// the final block. Content below the threshold is
// returned untouched.
pub fn interleave_ads(
  blocks: Vec<String>,
  start_after: usize,
  between_ads: usize,
  max_ads: usize
) -> Vec<ContentBlock> {
  // Don't insert ads if there's too little content:
  let insert_ads = blocks.len() >= start_after + 2
    && blocks.iter().map(String::len).sum::<usize>() >= MIN_CONTENT_LENGTH;

  let last_index = blocks.len().saturating_sub(1);
  let mut result: Vec<ContentBlock> = Vec::with_capacity(blocks.len() + max_ads);
  let mut ad_count = 0;

  for (index, text) in blocks.into_iter().enumerate() {
    result.push(ContentBlock::Paragraph { text });
    if insert_ads
      && index > 0
      && index >= start_after
      && (index - start_after) % between_ads == 0
      && ad_count < max_ads
      && index < last_index
    {
      result.push(ContentBlock::Ad { slot: ad_count });
      ad_count += 1;
    }
  }
  result
}

pub fn interleave_default(blocks: Vec<String>) -> Vec<ContentBlock> {
  interleave_ads(
    blocks,
    PARAGRAPHS_BEFORE_FIRST_AD,
    PARAGRAPHS_BETWEEN_ADS,
    MAX_ADS_PER_PAGE
  )
}

// Ceiling of word count over reading speed, minimum one
// minute. Takes HTML or markdown, we strip tags first.
pub fn reading_time_minutes(content: &str) -> i32 {
  let words = text_utils::word_count(&text_utils::strip_html(content));
  let minutes = (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE;
  if minutes > 0 { minutes as i32 } else { 1 }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn blocks(count: usize) -> Vec<String> {
    // Make each block long enough that MIN_CONTENT_LENGTH
    // isn't the thing being tested:
    (0..count).map(|i| format!("{} {}", "words ".repeat(30), i)).collect()
  }

  fn ad_positions(result: &[ContentBlock]) -> Vec<usize> {
    result.iter()
      .enumerate()
      .filter(|(_, b)| matches!(b, ContentBlock::Ad { .. }))
      .map(|(i, _)| i)
      .collect()
  }

  #[test]
  fn ten_blocks_get_two_ads_at_expected_spots() {
    let result = interleave_ads(blocks(10), 3, 4, 3);
    // Ads go after source indexes 3 and 7:
    assert_eq!(vec![4, 9], ad_positions(&result));
    assert_eq!(12, result.len());
  }

  #[test]
  fn never_more_than_max_ads() {
    let result = interleave_ads(blocks(50), 3, 4, 3);
    assert_eq!(3, ad_positions(&result).len());
  }

  #[test]
  fn never_an_ad_after_the_last_block() {
    for count in 2..30 {
      let result = interleave_ads(blocks(count), 3, 4, 3);
      assert!(!matches!(result.last(), Some(ContentBlock::Ad { .. })));
    }
  }

  #[test]
  fn short_content_gets_no_ads() {
    // 4 blocks is under start_after + 2:
    let result = interleave_ads(blocks(4), 3, 4, 3);
    assert!(ad_positions(&result).is_empty());
    // Plenty of blocks but under the character threshold:
    let tiny: Vec<String> = (0..10).map(|i| format!("p{}", i)).collect();
    let result = interleave_ads(tiny, 3, 4, 3);
    assert!(ad_positions(&result).is_empty());
  }

  #[test]
  fn split_paragraphs_drops_blank_blocks() {
    let content = "First paragraph.\n\n\n\nSecond one.\n\n  \n\nThird.";
    let blocks = split_paragraphs(content);
    assert_eq!(3, blocks.len());
    assert_eq!("Second one.", blocks[1]);
  }

  #[test]
  fn reading_time_has_a_floor_of_one_minute() {
    assert_eq!(1, reading_time_minutes("three little words"));
  }

  #[test]
  fn reading_time_rounds_up() {
    let content = "word ".repeat(401);
    assert_eq!(3, reading_time_minutes(&content));
  }
}
