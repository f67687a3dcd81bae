use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use scraper::{Html, Node, Selector};
use url::Url;

use crate::fetch::FetchResult;

/// Longest page text handed to the model, in characters.
pub const MAX_CONTENT_CHARS: usize = 6000;
pub const PREVIEW_CHARS: usize = 1500;
const SHORTEN_PLACEHOLDER: &str = " ...";

/// Sharing tags collected from the page, in lookup order.
pub const META_KEYS: &[&str] = &[
    "og:title",
    "og:description",
    "og:image",
    "og:video",
    "og:video:url",
    "og:video:secure_url",
    "twitter:title",
    "twitter:description",
];

/// Tags that may carry the post's video, highest priority first.
const VIDEO_KEYS: &[&str] = &["og:video", "og:video:secure_url", "og:video:url"];

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

pub type PageMetadata = BTreeMap<String, String>;

// Create static selectors to avoid recompiling them each time
static META_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta").expect("Failed to parse meta selector")
});

/// What the model gets to see from a fetched page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub text: String,
    pub metadata: PageMetadata,
    pub video_url: Option<Url>,
}

pub fn extract_meta_tags(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    let mut meta = PageMetadata::new();

    for element in document.select(&META_SELECTOR) {
        let attrs = element.value();
        let Some(key) = attrs.attr("property").or_else(|| attrs.attr("name")) else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if !META_KEYS.contains(&key.as_str()) || meta.contains_key(&key) {
            continue;
        }
        if let Some(content) = attrs.attr("content").map(str::trim).filter(|c| !c.is_empty()) {
            meta.insert(key, content.to_string());
        }
    }

    meta
}

/// First usable video URL from the sharing tags, resolved against the page URL.
pub fn video_reference(meta: &PageMetadata, base: &Url) -> Option<Url> {
    VIDEO_KEYS
        .iter()
        .filter_map(|key| meta.get(*key))
        .filter_map(|value| base.join(value).ok())
        .find(|url| matches!(url.scheme(), "http" | "https"))
}

/// Visible text of an HTML document with whitespace collapsed.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut text = String::with_capacity(html.len() / 4);

    for node in root.descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        for word in chunk.split_whitespace() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(word);
        }
    }

    text
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses whitespace and cuts the text on a word boundary so that the
/// result, placeholder included, is at most `width` characters.
pub fn shorten(text: &str, width: usize) -> String {
    let collapsed = collapse_whitespace(text);
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(SHORTEN_PLACEHOLDER.chars().count());
    let mut result = String::new();
    let mut used = 0;
    for word in collapsed.split(' ') {
        let needed = word.chars().count() + usize::from(!result.is_empty());
        if used + needed > budget {
            break;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
        used += needed;
    }

    if result.is_empty() {
        return SHORTEN_PLACEHOLDER.trim_start().to_string();
    }
    result.push_str(SHORTEN_PLACEHOLDER);
    result
}

pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

fn mime_of(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Turns a fetched response into prompt material according to its content type.
pub fn page_content(fetched: &FetchResult) -> PageContent {
    let mime = mime_of(&fetched.content_type);
    let looks_like_html = mime.is_empty() && fetched.body.trim_start().starts_with('<');

    let mut content = PageContent::default();
    let text = if mime == "text/html" || mime == "application/xhtml+xml" || looks_like_html {
        content.metadata = extract_meta_tags(&fetched.body);
        content.video_url = video_reference(&content.metadata, &fetched.url);
        page_text(&fetched.body)
    } else if mime == "application/json" || mime.ends_with("+json") {
        match serde_json::from_str::<serde_json::Value>(&fetched.body) {
            // Compact form keeps more of the document inside the prompt bound.
            Ok(parsed) => parsed.to_string(),
            Err(_) => fetched.body.clone(),
        }
    } else if mime.starts_with("text/") {
        fetched.body.clone()
    } else {
        format!(
            "Non-text content fetched. Content-Type: {}. Size: {} bytes.",
            fetched.content_type,
            fetched.byte_len
        )
    };

    content.text = shorten(&text, MAX_CONTENT_CHARS);
    content
}

pub fn build_prompt(
    url: &str,
    meta: &PageMetadata,
    content: &str,
    has_video: bool,
    language: &str,
) -> String {
    let meta_json = serde_json::to_string(meta).unwrap_or_else(|_| "{}".to_string());

    let mut result = String::with_capacity(content.len() + meta_json.len() + 900);
    result.push_str(
        "You are analyzing a social media post. Summarize what it is about and infer the content types present. \
         Possible types: text, image, video, audio. More than one can apply. Use the extracted content and metadata.\n\n",
    );
    result.push_str(&format!("Respond in {}.\n\n", language));
    result.push_str(&format!("URL: {}\n\n", url));
    result.push_str(&format!("Metadata: {}\n\n", meta_json));
    result.push_str("Content:\n");
    result.push_str(content);
    result.push_str("\n\n");
    if has_video {
        result.push_str("The post's video is attached. Describe what happens in the video.\n\n");
    }
    result.push_str(
        "In your answer, include: (1) a concise summary, (2) the detected content types, \
         (3) which content types were successfully analyzed.",
    );
    result
}
