use serde_json::Value;

use crate::{CodemapService, Error, Result};
use codemap_domain::{ProprietaryField, display};

const EXPANSION_LABEL: &str = "display expansion";
const REENHANCE_LABEL: &str = "display re-enhancement";

/// Rewrites proprietary display names into text that embeds close to standard terminology.
pub struct FieldEnhancer<'a> {
	service: &'a CodemapService,
}
impl<'a> FieldEnhancer<'a> {
	pub fn new(service: &'a CodemapService) -> Self {
		Self { service }
	}

	/// Cleans `text` and, when it is short or carries an acronym, asks the completion service to
	/// expand it. Otherwise the cleaned text is returned as is.
	pub async fn enhance(&self, text: &str, field: &ProprietaryField) -> Result<String> {
		let cleaned = display::clean_display(text);

		if !display::needs_augmentation(&cleaned) {
			return Ok(cleaned);
		}

		let messages = vec![user_message(expansion_prompt(&cleaned, field))];
		let expanded = self.complete(EXPANSION_LABEL, &messages).await?;

		tracing::debug!(
			record_index = field.index,
			display = %cleaned,
			expanded = %expanded,
			"Expanded display."
		);

		Ok(expanded)
	}

	/// Requests a short rewrite of `text` after it matched the catalog poorly.
	pub async fn reenhance(&self, text: &str, field: &ProprietaryField) -> Result<String> {
		let messages = vec![user_message(reenhance_prompt(text, field))];
		let rewritten = self.complete(REENHANCE_LABEL, &messages).await?;

		tracing::debug!(
			record_index = field.index,
			display = %text,
			rewritten = %rewritten,
			"Re-enhanced display."
		);

		Ok(rewritten)
	}

	async fn complete(&self, label: &str, messages: &[Value]) -> Result<String> {
		let cfg = &self.service.cfg.providers.llm_expander;
		let completion = &self.service.providers.completion;
		let answer = self
			.service
			.backoff
			.execute(label, || completion.complete(cfg, messages))
			.await?;
		let answer = answer.trim();

		if answer.is_empty() {
			return Err(Error::MalformedResponse {
				message: format!("The {label} answer is empty."),
			});
		}

		Ok(answer.to_string())
	}
}

fn user_message(content: String) -> Value {
	serde_json::json!({ "role": "user", "content": content })
}

fn expansion_prompt(cleaned: &str, field: &ProprietaryField) -> String {
	format!(
		"We are mapping EHR field names to LOINC and SNOMED CT codes.\n\n\
		 This display is short or contains acronyms: \"{cleaned}\"\n\
		 Context: {context}\n\n\
		 If it is an acronym, expand it using standard medical terminology. Keep it concise and \
		 add at most 1-3 words.\n\n\
		 Return ONLY the expanded term, following LOINC/SNOMED naming conventions.\n\n\
		 Examples:\n\
		 - \"CBC\" -> \"Complete blood count\"\n\
		 - \"BP\" -> \"Blood pressure\"\n\
		 - \"RBC\" -> \"Red blood cell count\"",
		context = field.context_sentence(),
	)
}

fn reenhance_prompt(text: &str, field: &ProprietaryField) -> String {
	format!(
		"We are mapping this EHR display to LOINC/SNOMED CT codes, but the embedding matches \
		 were poor.\n\n\
		 Display: {text}\n\
		 Context: {context}\n\n\
		 Return a 2-5 word phrase in standard medical terminology that follows LOINC/SNOMED \
		 naming conventions. Focus on the core clinical concept. Avoid generic words such as \
		 \"documentation\", \"assessment\" or \"pediatric\".\n\n\
		 Return ONLY the improved phrase.",
		context = field.context_sentence(),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use codemap_domain::FieldType;

	fn field(field_type: FieldType) -> ProprietaryField {
		ProprietaryField {
			index: 0,
			code: "CBC1".to_string(),
			display: "CBC-transcribed".to_string(),
			field_type,
			average: Some(4.2),
			categories: Some("Low; Normal; High".to_string()),
		}
	}

	#[test]
	fn expansion_prompt_carries_value_context() {
		let prompt = expansion_prompt("CBC", &field(FieldType::Numerical));

		assert!(prompt.contains("\"CBC\""));
		assert!(prompt.contains("This is a numerical field. Average value: 4.2."));
		assert!(!prompt.contains("Categories"));
	}

	#[test]
	fn reenhance_prompt_carries_categories() {
		let prompt = reenhance_prompt("Complete blood count", &field(FieldType::Categorical));

		assert!(prompt.contains("Display: Complete blood count"));
		assert!(prompt.contains("Categories: Low; Normal; High."));
		assert!(prompt.contains("2-5 word phrase"));
	}
}
