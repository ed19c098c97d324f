use scraper::{Html, Selector};
use tagreel_core::VideoId;
use url::Url;

/// A candidate anchor found on the tag page: the video id plus the
/// absolute URL it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub id: VideoId,
    pub url: String,
}

/// Pulls candidate video links out of tag-page HTML.
///
/// Anchors whose href contains `/video/` are taken in document order,
/// resolved against `base_url` when relative, and deduplicated by id
/// within the page. Nothing else about the markup is assumed; the page
/// structure drifts often and only the anchor shape matters here.
pub fn extract_candidate_links(html: &str, base_url: &str) -> Vec<CandidateLink> {
    let document = Html::parse_document(html);
    let Some(anchors) = Selector::parse("a[href]").ok() else {
        return Vec::new();
    };
    let base = Url::parse(base_url).ok();

    let mut links = Vec::new();
    let mut seen_ids = Vec::new();
    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if !href.contains("/video/") {
            continue;
        }
        let Some(url) = resolve_url(href, base.as_ref()) else {
            continue;
        };
        let Some(id) = VideoId::from_url(url.as_str()) else {
            continue;
        };
        if seen_ids.contains(&id) {
            continue;
        }
        seen_ids.push(id.clone());
        links.push(CandidateLink {
            id,
            url: url.into(),
        });
    }
    links
}

fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    if let Ok(url) = Url::parse(reference) {
        return Some(url);
    }
    base.and_then(|base| base.join(reference).ok())
}
