use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{
    cloudfront::CloudFrontCookie,
    hls::{self, SegmentRef},
    url,
    util::{self, DownloadError},
};

/// Where a channel is served from and the credentials to get at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamIdentity {
    pub channel_name: String,
    pub server: String,
    pub credentials: CloudFrontCookie,
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("could not fetch channel page: {0}")]
    ChannelPage(DownloadError),
    #[error("playlist URL not found on {0}")]
    LocatorNotFound(String),
    #[error("http request getting CloudFront cookies failed with status {status}: {url}")]
    Status { url: String, status: u16 },
    #[error("CloudFront cookies missing from {0}")]
    MissingCookies(String),
    #[error("no stream server host in {0}")]
    MissingServer(String),
    #[error("could not get CloudFront cookies: {0}")]
    Download(#[from] DownloadError),
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Download(#[from] DownloadError),
    #[error("request failed with status {status}: {url}")]
    Status { url: String, status: u16 },
    #[error("{0}")]
    Playlist(#[from] hls::PlaylistError),
    #[error("empty media file {0}")]
    EmptyPayload(String),
}

impl FetchError {
    /// Whether the CDN rejected the credentials, which usually means they
    /// expired.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Status { status, .. }
            if *status == StatusCode::UNAUTHORIZED.as_u16() || *status == StatusCode::FORBIDDEN.as_u16())
    }
}

/// The authenticator and segment source a recording session pulls from.
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn resolve(&self, channel: &str) -> Result<StreamIdentity, ResolveError>;

    async fn list_segments(&self, identity: &StreamIdentity)
        -> Result<Vec<SegmentRef>, FetchError>;

    async fn fetch_segment(
        &self,
        identity: &StreamIdentity,
        path: &str,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Resolves channels against the 881903.com site and its CloudFront edge.
pub struct Resolver {
    client: util::HttpClient,
}

impl Resolver {
    pub fn new(client: util::HttpClient) -> Self {
        Self { client }
    }

    async fn find_locator(&self, channel: &str) -> Result<(String, String, String), ResolveError> {
        let page_url = url::channel_page_url(channel);
        let html = self
            .client
            .fetch_text(&page_url)
            .await
            .map_err(ResolveError::ChannelPage)?;

        let (locator, channel_name) = url::find_playlist_locator(&html)
            .ok_or_else(|| ResolveError::LocatorNotFound(page_url.clone()))?;

        Ok((locator.to_string(), channel_name, page_url))
    }

    /// Requests the locator, which redirects to the edge server and sets the
    /// CloudFront cookies on the way.
    async fn authenticate(
        &self,
        page_url: &str,
        locator: &str,
    ) -> Result<(CloudFrontCookie, String), ResolveError> {
        let resp = self.client.get_with_referer(locator, page_url).await?;
        if resp.status() != StatusCode::OK {
            warn!(
                "Getting CloudFront cookies failed. URL: {} Response code: {}",
                locator,
                resp.status()
            );
            return Err(ResolveError::Status {
                url: locator.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let cookies = resp
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect::<Vec<_>>();
        let credentials =
            CloudFrontCookie::from_cookies(cookies.iter().map(|(n, v)| (n.as_str(), v.as_str())));

        let server = resp
            .url()
            .host_str()
            .ok_or_else(|| ResolveError::MissingServer(resp.url().to_string()))?
            .to_string();

        Ok((credentials, server))
    }

    async fn get(&self, url: &str, identity: &StreamIdentity) -> Result<Vec<u8>, FetchError> {
        let resp = self
            .client
            .get_with_cookie(url, &identity.credentials.cookie_header())
            .await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(DownloadError::from)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl StreamSource for Resolver {
    async fn resolve(&self, channel: &str) -> Result<StreamIdentity, ResolveError> {
        let (locator, channel_name, page_url) = self.find_locator(channel).await?;
        let (credentials, server) = self.authenticate(&page_url, &locator).await?;

        if !credentials.assigned() {
            return Err(ResolveError::MissingCookies(locator));
        }

        debug!("Channel {} resolved to {} on {}", channel, channel_name, server);

        Ok(StreamIdentity {
            channel_name,
            server,
            credentials,
        })
    }

    async fn list_segments(
        &self,
        identity: &StreamIdentity,
    ) -> Result<Vec<SegmentRef>, FetchError> {
        let playlist_url = url::playlist_url(&identity.channel_name, &identity.server);
        let playlist = self.get(&playlist_url, identity).await?;
        Ok(hls::parse_segments(&playlist)?)
    }

    async fn fetch_segment(
        &self,
        identity: &StreamIdentity,
        path: &str,
    ) -> Result<Vec<u8>, FetchError> {
        let media_url = url::stream_media_url(&identity.channel_name, &identity.server, path);
        self.get(&media_url, identity).await
    }
}
