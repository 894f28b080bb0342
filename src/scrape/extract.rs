use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use crate::error::{BotError, Result};
use crate::models::{GiftCode, ScrapeSite};

/// Pull code candidates out of an HTML page.
///
/// The code is the text of each element matching the site's selector. Its
/// description is the text of the enclosing element with the code removed
/// from the front. Repeats within one page are dropped.
pub fn extract_codes(html: &str, site: &ScrapeSite) -> Result<Vec<GiftCode>> {
    let selector = Selector::parse(&site.selector).map_err(|e| BotError::Scrape {
        site: site.name.clone(),
        message: format!("invalid selector '{}': {:?}", site.selector, e),
    })?;

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut codes = Vec::new();

    for element in document.select(&selector) {
        let code = collapse_text(element);
        if code.is_empty() || !seen.insert(code.clone()) {
            continue;
        }

        let context = element
            .parent()
            .and_then(ElementRef::wrap)
            .map(collapse_text)
            .unwrap_or_default();
        let description = context
            .strip_prefix(code.as_str())
            .unwrap_or(context.as_str())
            .trim()
            .to_string();

        codes.push(GiftCode {
            code,
            description,
            source: site.name.clone(),
        });
    }

    Ok(codes)
}

fn collapse_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
