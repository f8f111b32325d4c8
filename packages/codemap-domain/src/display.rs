//! Text heuristics applied to proprietary display names before embedding.

/// Displays at or below this many characters are treated as abbreviations.
pub const SHORT_DISPLAY_CHARS: usize = 5;

const QUALIFIER_SUFFIXES: [&str; 4] = [" transcribed", "-transcribed", " old", "-old"];

/// Strips trailing whitespace and at most one trailing qualifier such as `-transcribed` or ` old`.
pub fn clean_display(display: &str) -> String {
	let trimmed = display.trim_end();

	for suffix in QUALIFIER_SUFFIXES {
		if let Some(stem) = strip_suffix_ignore_ascii_case(trimmed, suffix) {
			return stem.trim_end().to_string();
		}
	}

	trimmed.to_string()
}

/// True when the cleaned display is short or contains an all-caps token of three or more characters.
pub fn needs_augmentation(cleaned: &str) -> bool {
	if cleaned.chars().count() <= SHORT_DISPLAY_CHARS {
		return true;
	}

	cleaned.split_whitespace().any(is_acronym_token)
}

fn is_acronym_token(token: &str) -> bool {
	if token.chars().count() < 3 {
		return false;
	}

	let mut has_cased = false;

	for ch in token.chars() {
		if ch.is_lowercase() {
			return false;
		}
		if ch.is_uppercase() {
			has_cased = true;
		}
	}

	has_cased
}

fn strip_suffix_ignore_ascii_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
	let split = text.len().checked_sub(suffix.len())?;

	if !text.is_char_boundary(split) {
		return None;
	}

	let (stem, tail) = text.split_at(split);

	tail.eq_ignore_ascii_case(suffix).then_some(stem)
}
