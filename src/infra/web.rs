use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use super::types::WebFingerprint;

pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(6);
const USER_AGENT: &str = "Mozilla/5.0 (mailverdict/0.1)";

const PARKING_MARKERS: &[&str] = &[
    "buy this domain",
    "domain for sale",
    "coming soon",
    "under construction",
    "parked",
    "parking",
    "sedo",
    "afternic",
    "godaddy cashparking",
    "namecheap",
    "hostgator",
];

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex"));
static META_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*name\s*=\s*["']description["'][^>]*content\s*=\s*["']([^"']*)["']"#)
        .expect("static regex")
});
static META_DESCRIPTION_REV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]*content\s*=\s*["']([^"']*)["'][^>]*name\s*=\s*["']description["']"#)
        .expect("static regex")
});
static FAVICON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<link[^>]*rel\s*=\s*["'][^"']*icon[^"']*["']"#).expect("static regex")
});

pub(crate) fn build_client() -> Option<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .ok()
}

/// GET `https://domain` then `http://domain` and fingerprint whichever
/// answers first. Failures leave the default (no website) fingerprint.
/// Returns the fingerprint and the fetched body length.
pub(crate) async fn fetch_fingerprint(
    client: &reqwest::Client,
    domain: &str,
) -> (WebFingerprint, usize) {
    let mut result = WebFingerprint::default();
    let mut body_len = 0;

    for url in [format!("https://{domain}"), format!("http://{domain}")] {
        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::trace!(domain, url, error = %err, "web probe attempt failed");
                continue;
            }
        };

        let status = response.status().as_u16();
        result.http_status = Some(status);
        if status >= 500 {
            continue;
        }

        result.https = response.url().scheme() == "https";
        let body = match response.text().await {
            Ok(body) => body,
            Err(_) => continue,
        };

        result.has_website = status < 400;
        body_len = body.trim().len();
        fingerprint_body(&body, &mut result);
        break;
    }

    (result, body_len)
}

pub(crate) fn fingerprint_body(body: &str, result: &mut WebFingerprint) {
    result.title = TITLE
        .captures(body)
        .map(|c| c[1].trim().to_string())
        .filter(|t| !t.is_empty());
    result.meta_description = META_DESCRIPTION
        .captures(body)
        .or_else(|| META_DESCRIPTION_REV.captures(body))
        .map(|c| c[1].trim().to_string())
        .filter(|d| !d.is_empty());
    result.has_favicon = FAVICON.is_match(body);

    let text = body.to_ascii_lowercase();
    result.parking = PARKING_MARKERS.iter().any(|marker| text.contains(marker));
}

/// Body length threshold separating a real page from an empty shell.
pub(crate) fn body_is_substantial(body_len: usize) -> bool {
    body_len > 200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_meta() {
        let body = r#"<html><head><title> Acme Rockets </title>
            <meta name="description" content="We sell rockets">
            <link rel="shortcut icon" href="/favicon.ico"></head>
            <body>hello</body></html>"#;
        let mut fp = WebFingerprint::default();
        fingerprint_body(body, &mut fp);
        assert_eq!(fp.title.as_deref(), Some("Acme Rockets"));
        assert_eq!(fp.meta_description.as_deref(), Some("We sell rockets"));
        assert!(fp.has_favicon);
        assert!(!fp.parking);
    }

    #[test]
    fn meta_with_content_first() {
        let body = r#"<meta content="Rockets" name="description">"#;
        let mut fp = WebFingerprint::default();
        fingerprint_body(body, &mut fp);
        assert_eq!(fp.meta_description.as_deref(), Some("Rockets"));
    }

    #[test]
    fn detects_parking_markers() {
        let body = "<html><body>This domain is parked. Buy this domain today!</body></html>";
        let mut fp = WebFingerprint::default();
        fingerprint_body(body, &mut fp);
        assert!(fp.parking);
    }

    #[test]
    fn empty_title_is_none() {
        let mut fp = WebFingerprint::default();
        fingerprint_body("<title>  </title>", &mut fp);
        assert!(fp.title.is_none());
    }
}
