use regex::Regex;
use reqwest::Url;

const RADIO_STATION_PAGE: &str = "https://www.881903.com/live/";
const PLAYLIST_LOCATOR_JSON: &str = r#""liveJsUrl":"(.*?)""#;

pub fn channel_page_url(channel: &str) -> String {
    format!("{}{}", RADIO_STATION_PAGE, channel)
}

/// Finds the CloudFront playlist locator in the channel page, returning the
/// locator URL and the channel name embedded in its path.
pub fn find_playlist_locator(html: &str) -> Option<(Url, String)> {
    let re = Regex::new(PLAYLIST_LOCATOR_JSON).ok()?;
    let raw = re.captures(html)?.get(1)?.as_str();

    // The value sits inside a JSON document, so `\/` and `\u0026` escapes
    // have to go before it parses as a URL
    let unescaped: String = serde_json::from_str(&format!("\"{}\"", raw)).ok()?;
    let locator = Url::parse(&unescaped).ok()?;

    let channel_name = locator.path_segments()?.nth(2)?.to_string();
    if channel_name.is_empty() {
        return None;
    }

    Some((locator, channel_name))
}

pub fn playlist_url(channel_name: &str, server: &str) -> String {
    format!("https://{}/edge-aac/{}/chunks.m3u8", server, channel_name)
}

pub fn stream_media_url(channel_name: &str, server: &str, filename: &str) -> String {
    if filename.starts_with("https://") || filename.starts_with("http://") {
        return filename.to_string();
    }
    format!("https://{}/edge-aac/{}/{}", server, channel_name, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_html(fname: &str) -> String {
        let mut d = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push("resources/test/");
        d.push(fname);
        std::fs::read_to_string(d).expect(format!("Could not read {}", fname).as_str())
    }

    #[test]
    fn channel_page() {
        assert_eq!(channel_page_url("881"), "https://www.881903.com/live/881");
    }

    #[test]
    fn locator_from_page() {
        let html = get_test_html("channel_page.html");
        let (locator, channel_name) = find_playlist_locator(&html).expect("No locator found");

        assert_eq!(locator.host_str(), Some("live.881903.com"));
        assert_eq!(locator.path(), "/edge-aac/cf/cr2-hd/index.m3u8");
        assert_eq!(locator.query(), Some("token=abc&ts=1700000000"));
        assert_eq!(channel_name, "cr2-hd");
    }

    #[test]
    fn locator_missing() {
        assert!(find_playlist_locator("<html></html>").is_none());
        assert!(find_playlist_locator(r#"{"liveJsUrl":"not a url"}"#).is_none());
        assert!(find_playlist_locator(r#"{"liveJsUrl":"https://a.com/x/y"}"#).is_none());
    }

    #[test]
    fn media_urls() {
        assert_eq!(
            playlist_url("cr2-hd", "edge.example.com"),
            "https://edge.example.com/edge-aac/cr2-hd/chunks.m3u8"
        );
        assert_eq!(
            stream_media_url("cr2-hd", "edge.example.com", "media_1234.aac"),
            "https://edge.example.com/edge-aac/cr2-hd/media_1234.aac"
        );
        assert_eq!(
            stream_media_url("cr2-hd", "edge.example.com", "https://other.com/a.aac"),
            "https://other.com/a.aac"
        );
    }
}
