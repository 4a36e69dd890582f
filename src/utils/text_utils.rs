use html2text::from_read;

// Basic entity escaping for the few places where user text
// could end up rendered as markup (contact messages mostly).
pub fn escape_html(value: &str) -> String {
  value
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
    .replace('\'', "&#39;")
}

// String::truncate can panic when cutting a multibyte char
// in half, so we count actual chars instead.
pub fn truncate_utf8(value: &mut String, max_chars: usize) {
  if value.chars().count() > max_chars {
    *value = value.chars().take(max_chars).collect();
  }
}

pub fn strip_html(html: &str) -> String {
  from_read(html.as_bytes(), 70)
}

pub fn word_count(text: &str) -> usize {
  text.split_whitespace().filter(|w| !w.is_empty()).count()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escape_html_replaces_markup_chars() {
    let sut = "<script>alert(\"hi\")</script>";
    assert_eq!(
      "&lt;script&gt;alert(&quot;hi&quot;)&lt;/script&gt;",
      escape_html(sut)
    );
  }

  #[test]
  fn truncate_utf8_does_not_split_multibyte_chars() {
    let mut sut = String::from("héhéhé");
    truncate_utf8(&mut sut, 3);
    assert_eq!("héh", sut);
  }

  #[test]
  fn truncate_utf8_leaves_short_strings_alone() {
    let mut sut = String::from("short");
    truncate_utf8(&mut sut, 100);
    assert_eq!("short", sut);
  }

  #[test]
  fn word_count_ignores_extra_whitespace() {
    assert_eq!(4, word_count("  one two\n three\tfour "));
  }
}
