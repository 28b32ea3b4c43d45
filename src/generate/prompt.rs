use super::Tone;

/// Builds the instruction sent to the provider for a (trimmed, non-empty) topic.
pub fn build(topic: &str, tone: Tone, length: u32) -> String {
	format!(
		r"You are an expert content writer. Write a well-structured, SEO-friendly blog article about the topic below.

TOPIC:
{topic}

REQUIREMENTS:
1. Write clean HTML using only these tags: <h2>, <h3>, <p>, <b>, <i>, <ul>, <ol>, <li>, <strong>, <em>, <blockquote>
2. Do not include <html>, <head> or <body> tags, and do not wrap the answer in Markdown code fences
3. Start with an engaging introduction paragraph
4. Organize the main sections with <h2> headings, using <h3> for subsections where needed
5. Highlight key insights with <strong>
6. Use lists for sequences of points
7. End with a strong conclusion
8. Keep the tone {tone}
9. Aim for about {length} words

Write the complete article now:",
		tone = tone.instruction(),
	)
}

/// Removes a Markdown code fence (such as ```` ```html ````) wrapped around the reply.
pub fn strip_fences(text: &str) -> &str {
	let text = text.trim();

	let Some(rest) = text.strip_prefix("```") else {
		return text;
	};

	// the rest of the opening line is the language tag
	let body = rest.split_once('\n').map_or("", |(_, body)| body);

	body.trim_end()
		.strip_suffix("```")
		.unwrap_or(body)
		.trim()
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_build_includes_options() {
		let prompt = build("Rust ownership", Tone::Casual, 600);

		assert!(prompt.contains("Rust ownership"));
		assert!(prompt.contains("casual and light-hearted"));
		assert!(prompt.contains("about 600 words"));
	}

	#[test]
	fn test_strip_fences() {
		assert_eq!(strip_fences("```html\n<p>hi</p>\n```"), "<p>hi</p>");
		assert_eq!(strip_fences("```\n<p>hi</p>```"), "<p>hi</p>");
		assert_eq!(strip_fences("  <p>hi</p>\n"), "<p>hi</p>");
	}

	#[test]
	fn test_strip_unterminated_fence() {
		assert_eq!(strip_fences("```html\n<p>hi</p>"), "<p>hi</p>");
	}
}
