use scraper::{Html, Selector};

/// A parsed HTML page queried by CSS selector.
pub struct HtmlDocument {
    doc: Html,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
        }
    }

    /// Text of the first element matching `selector`, whitespace-trimmed
    pub fn first_text(&self, selector: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        self.doc
            .select(&selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
    }

    /// Attribute of the first element matching `selector` that carries it
    pub fn first_attr(&self, selector: &str, attr: &str) -> Option<String> {
        let selector = Selector::parse(selector).ok()?;
        self.doc
            .select(&selector)
            .next()
            .and_then(|element| element.value().attr(attr))
            .map(str::to_string)
    }

    /// Attribute values of every element matching `selector`
    pub fn attrs(&self, selector: &str, attr: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.doc
            .select(&selector)
            .filter_map(|element| element.value().attr(attr))
            .map(str::to_string)
            .collect()
    }
}

/// Link targets a crawler follows: anchors, alternates and `rel=next`.
pub fn parse_links(html: &str) -> Vec<String> {
    let doc = HtmlDocument::parse(html);

    let mut links = doc.attrs("a[href]", "href");
    links.extend(doc.attrs(r#"link[rel="alternate"]"#, "href"));
    links.extend(doc.attrs(r#"link[rel="next"]"#, "href"));

    ::log::debug!("HTML parser found {} links", links.len());
    links
}
