//! Ingredient extraction through the language model.

use log::{debug, info};

use crate::error::PlannerError;
use crate::model::IngredientRow;
use crate::prep::detect_servings;
use crate::providers::{ExtractionRequest, ExtractionResponse, LlmProvider};
use crate::units::{normalize_unit, sanitize_units};

/// Result of one extraction round-trip
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecipe {
    /// Title reported by the model, `None` when it found no reliable one
    pub title: Option<String>,
    pub rows: Vec<IngredientRow>,
    /// Model answer, falling back to the locally detected hint
    pub servings: Option<u32>,
    pub steps: Vec<String>,
}

/// Send raw OCR text to the extraction model and map its items to rows.
///
/// A servings hint found locally is forwarded in the request and used when
/// the model does not report servings itself.
pub async fn parse_with_llm(
    text: &str,
    provider: &dyn LlmProvider,
) -> Result<ParsedRecipe, PlannerError> {
    parse_with_hint(text, detect_servings(text), provider).await
}

/// Same as [`parse_with_llm`] with an explicit servings hint, for callers
/// that send a filtered version of the text.
pub async fn parse_with_hint(
    text: &str,
    hint: Option<u32>,
    provider: &dyn LlmProvider,
) -> Result<ParsedRecipe, PlannerError> {
    let request = ExtractionRequest {
        t: text.to_string(),
        s: hint,
    };

    info!(
        "Extracting ingredients with {} ({} chars, servings hint {:?})",
        provider.provider_name(),
        text.chars().count(),
        hint
    );
    let response = provider.parse_ingredients(&request).await?;
    Ok(rows_from_response(response, hint))
}

/// Map an extraction answer to editable rows, normalizing units and clearing
/// piece units the name cannot justify.
pub fn rows_from_response(response: ExtractionResponse, hint: Option<u32>) -> ParsedRecipe {
    let rows: Vec<IngredientRow> = response
        .i
        .into_iter()
        .filter_map(|item| {
            let name = item.n.trim();
            if name.is_empty() {
                debug!("Dropping extracted item without a name");
                return None;
            }
            let unit = normalize_unit(item.u.as_deref().unwrap_or(""));
            Some(sanitize_units(IngredientRow::new(name, unit, item.q)))
        })
        .collect();

    let title = response
        .r
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    ParsedRecipe {
        title,
        rows,
        servings: response.s.or(hint),
        steps: response.p.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LlmItem;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedProvider {
        answer: String,
        seen: Mutex<Option<String>>,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn provider_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _system: &str, user: &str) -> Result<String, PlannerError> {
            *self.seen.lock().unwrap() = Some(user.to_string());
            Ok(self.answer.clone())
        }
    }

    fn item(n: &str, q: Option<f64>, u: Option<&str>) -> LlmItem {
        LlmItem {
            n: n.to_string(),
            q,
            u: u.map(str::to_string),
        }
    }

    #[test]
    fn test_rows_are_normalized_and_sanitized() {
        let response = ExtractionResponse {
            r: Some("  Omelette  ".to_string()),
            s: None,
            i: vec![
                item("oeufs", Some(3.0), Some("Oeufs")),
                item("oignon", Some(1.0), Some("oeuf")),
                item("  ", Some(1.0), None),
                item("beurre", Some(10.0), Some("Grammes")),
            ],
            p: None,
        };

        let parsed = rows_from_response(response, Some(2));
        assert_eq!(parsed.title.as_deref(), Some("Omelette"));
        assert_eq!(parsed.servings, Some(2));
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.rows[0].unit, "oeuf");
        assert_eq!(parsed.rows[1].unit, "");
        assert_eq!(parsed.rows[2].unit, "g");
        assert_eq!(parsed.rows[2].base_quantity, Some(10.0));
        assert!(parsed.rows.iter().all(|r| r.is_selected));
        assert!(parsed.steps.is_empty());
    }

    #[test]
    fn test_model_servings_win_over_hint() {
        let response = ExtractionResponse {
            s: Some(6),
            ..Default::default()
        };
        assert_eq!(rows_from_response(response, Some(4)).servings, Some(6));
    }

    #[test]
    fn test_blank_title_is_none() {
        let response = ExtractionResponse {
            r: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(rows_from_response(response, None).title, None);
    }

    #[tokio::test]
    async fn test_parse_with_llm_forwards_servings_hint() {
        let provider = CannedProvider {
            answer: r#"{"r":"Crepes","s":null,"i":[{"n":"lait","q":50,"u":"cl"}],"p":["Melanger"]}"#
                .to_string(),
            seen: Mutex::new(None),
        };

        let parsed = parse_with_llm("Crepes pour 4 personnes\n50 cl lait", &provider)
            .await
            .unwrap();

        let sent = provider.seen.lock().unwrap().clone().unwrap();
        assert!(sent.contains(r#""s":4"#));
        assert_eq!(parsed.servings, Some(4));
        assert_eq!(parsed.rows[0].quantity, Some(50.0));
        assert_eq!(parsed.steps, vec!["Melanger".to_string()]);
    }
}
