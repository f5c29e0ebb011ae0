use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

pub const SURVEY_PATH: &str = "/survey/";

/// Survey listing links found on an index page, main listing first and the
/// rest sorted, without duplicates.
pub fn find_survey_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let found: BTreeSet<String> = document
        .select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && href.contains("/survey"))
        .filter_map(|href| base.join(href).ok())
        .map(String::from)
        .collect();

    let mut ordered = Vec::with_capacity(found.len() + 1);
    if let Ok(main) = base.join(SURVEY_PATH) {
        ordered.push(String::from(main));
    }
    ordered.extend(found);

    let mut seen = HashSet::new();
    ordered.retain(|link| seen.insert(link.clone()));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_page_links() {
        let html = std::fs::read_to_string("tests/fixtures/index_page.html").unwrap();
        let links = find_survey_links(&html, "https://www.thegradcafe.com/");
        assert_eq!(
            links,
            vec![
                "https://www.thegradcafe.com/survey/",
                "https://www.thegradcafe.com/survey/?institution=stanford",
                "https://www.thegradcafe.com/survey/?program=Computer+Science",
            ]
        );
    }

    #[test]
    fn main_listing_always_first() {
        let links = find_survey_links("<p>no links</p>", "https://www.thegradcafe.com/");
        assert_eq!(links, vec!["https://www.thegradcafe.com/survey/"]);
    }
}
