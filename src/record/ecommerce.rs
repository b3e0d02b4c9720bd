//! Storefront and payment detection from homepage markup

use scraper::{Html, Selector};

/// Payment brands searched for in the lowercased page source
const PAYMENT_SYSTEMS: &[&str] = &[
    "visa",
    "mastercard",
    "amex",
    "applepay",
    "afterpay",
    "zippay",
    "alipay",
    "klarna",
];

/// What a homepage reveals about its commerce stack
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentProfile {
    pub cart_software: Vec<String>,
    pub has_card: bool,
    pub payment_systems: Vec<String>,
}

/// Classifies raw HTML
pub fn classify_content(html: &str) -> ContentProfile {
    let document = Html::parse_document(html);
    classify_document(&document, html)
}

/// Classifies an already parsed document; `html` must be its source
pub(crate) fn classify_document(document: &Html, html: &str) -> ContentProfile {
    let lowered = html.to_lowercase();

    ContentProfile {
        cart_software: cart_software(document, html),
        has_card: has_card(document, &lowered),
        payment_systems: PAYMENT_SYSTEMS
            .iter()
            .filter(|name| lowered.contains(*name))
            .map(|name| name.to_string())
            .collect(),
    }
}

fn cart_software(document: &Html, html: &str) -> Vec<String> {
    let mut found = Vec::new();

    if attr_contains(document, "img[src]", "src", "demandware") {
        found.push("Demandware");
    }
    if exists(document, r#"script[type="text/x-magento-init"]"#) {
        found.push("Magento");
    }
    if exists(document, "span.nosto_cart") {
        found.push("nosto");
    }
    if attr_contains(document, r#"link[rel~="stylesheet"][href]"#, "href", "shopify") {
        found.push("Shopify");
    }
    if exists(document, "div.sitecore-link-wrapper") || html.contains("SITECORE_APIKEY") {
        found.push("Sitecore Experience Commerce");
    }
    if exists(
        document,
        r#"link[rel~="preconnect"][href="https://images.squarespace-cdn.com"]"#,
    ) {
        found.push("Squarespace");
    }
    if exists(
        document,
        r#"meta[name="generator"][content="Wix.com Website Builder"]"#,
    ) {
        found.push("Wix Stores");
    }
    if exists(document, "style#woocommerce-inline-inline-css") {
        found.push("WooCommerce");
    }

    found.into_iter().map(str::to_string).collect()
}

fn has_card(document: &Html, lowered: &str) -> bool {
    if lowered.contains("addtocart") {
        return true;
    }

    if attr_contains(document, "a[href]", "href", "payment") {
        return true;
    }

    match Selector::parse("li[class]") {
        Ok(selector) => document
            .select(&selector)
            .any(|li| li.value().classes().any(|class| class.contains("payment"))),
        Err(_) => false,
    }
}

fn exists(document: &Html, selector: &str) -> bool {
    match Selector::parse(selector) {
        Ok(selector) => document.select(&selector).next().is_some(),
        Err(_) => false,
    }
}

fn attr_contains(document: &Html, selector: &str, attr: &str, needle: &str) -> bool {
    match Selector::parse(selector) {
        Ok(selector) => document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .any(|value| value.contains(needle)),
        Err(_) => false,
    }
}
