//! HTML cleaning for blog bodies.
//!
//! Every body is passed through [`clean`] before it is stored. Only a small set of
//! rich-text tags survives; scripts, styles, event handlers and unknown tags are removed.

use std::sync::OnceLock;

use ammonia::Builder;
use regex::Regex;

/// Tags that survive cleaning. Generated drafts are asked to stick to these.
pub const ALLOWED_TAGS: &[&str] = &[
	"a",
	"b",
	"blockquote",
	"br",
	"code",
	"em",
	"h2",
	"h3",
	"h4",
	"i",
	"li",
	"ol",
	"p",
	"pre",
	"strong",
	"u",
	"ul",
];

fn builder() -> &'static Builder<'static> {
	static BUILDER: OnceLock<Builder<'static>> = OnceLock::new();

	BUILDER.get_or_init(|| {
		let mut builder = Builder::empty();

		builder
			.add_tags(ALLOWED_TAGS)
			.add_tag_attributes("a", ["href", "title"])
			.clean_content_tags(["script", "style"].into())
			.url_schemes(["http", "https", "mailto"].into())
			.link_rel(Some("noopener noreferrer"));

		builder
	})
}

fn tag_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();

	PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

fn word_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();

	PATTERN.get_or_init(|| Regex::new(r"\w+").expect("word pattern is valid"))
}

/// Strips executable markup and tags outside [`ALLOWED_TAGS`], keeping the text.
///
/// Cleaning is idempotent: cleaning an already clean body returns it unchanged.
pub fn clean(html: &str) -> String {
	builder().clean(html).to_string()
}

/// The visible text of a (clean) body, with tags replaced by spaces.
pub fn plain_text(html: &str) -> String {
	tag_pattern().replace_all(html, " ").into_owned()
}

pub fn word_count(html: &str) -> usize {
	word_pattern().find_iter(&plain_text(html)).count()
}

/// Estimated minutes to read `words` words at 200 words per minute, never less than one.
///
/// Halves round to the even minute, so 500 words is 2 minutes and 700 is 4.
pub fn read_time_minutes(words: usize) -> usize {
	let (minutes, rest) = (words / 200, words % 200);
	let rounded = if rest > 100 || (rest == 100 && minutes % 2 == 1) {
		minutes + 1
	} else {
		minutes
	};

	rounded.max(1)
}
