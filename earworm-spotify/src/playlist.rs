use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    Client, ClientResult, Track,
    track::{RawTrackPage, parse_raw_items},
};

/// How many times a single page is attempted before the fetch gives up on it.
/// Exhausting the budget truncates the remaining pages rather than failing
/// the whole fetch.
pub const PAGE_RETRY_BUDGET: u32 = 5;

/// A progress notification emitted while a playlist fetch is running.
/// Notifications are fire-and-forget; the fetch loop never waits on the
/// receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchProgress {
    /// Tracks fetched so far. Throttled to every other page.
    Fetched(usize),
    /// The fetch finished with this many playable tracks. Always emitted.
    Complete(usize),
}

/// Summary information about a playlist, for the host's "fetching…" display.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistMetadata {
    /// The playlist's name.
    pub name: String,
    /// URL of the playlist's cover image, if any.
    pub image_url: Option<String>,
    /// Total number of tracks in the playlist, playable or not.
    pub total_tracks: u32,
    /// How many users follow the playlist.
    pub followers: u64,
}

#[derive(Debug, Deserialize)]
struct RawPlaylist {
    name: String,
    #[serde(default)]
    images: Vec<crate::track::RawImage>,
    tracks: RawPlaylistTracks,
    followers: RawFollowers,
}

#[derive(Debug, Deserialize)]
struct RawPlaylistTracks {
    total: u32,
}

#[derive(Debug, Deserialize)]
struct RawFollowers {
    total: u64,
}

/// Resolve a playlist reference into a canonical playlist id. Accepts either
/// a bare id or a share URL; for URLs the query string is stripped and the
/// last path segment is taken.
pub fn parse_playlist_ref(reference: &str) -> &str {
    match reference.strip_prefix("https://") {
        Some(rest) => {
            let path = rest.split('?').next().unwrap_or(rest);
            path.rsplit('/').next().unwrap_or(path)
        }
        None => reference,
    }
}

/// One page of playable tracks plus the cursor to the next page.
pub(crate) struct TrackPage {
    pub tracks: Vec<Track>,
    pub next: Option<String>,
}

/// A source of track pages, keyed by the server-supplied page URL.
/// Factored out of [`Client`] so the pagination loop can be exercised
/// without a server.
pub(crate) trait PageSource {
    fn page(&mut self, url: &str) -> impl Future<Output = ClientResult<TrackPage>>;
}

struct ApiPageSource<'a> {
    client: &'a Client,
    token: String,
}
impl PageSource for ApiPageSource<'_> {
    async fn page(&mut self, url: &str) -> ClientResult<TrackPage> {
        let response = self
            .client
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        let raw: RawTrackPage = serde_json::from_slice(&bytes)?;
        let items = parse_raw_items(raw.items);

        let mut tracks = Vec::with_capacity(items.len());
        for item in items {
            if let Some(track) = self.client.parse_item(item).await {
                tracks.push(track);
            }
        }
        Ok(TrackPage {
            tracks,
            next: raw.next,
        })
    }
}

async fn fetch_page_with_retry(source: &mut impl PageSource, url: &str) -> TrackPage {
    for attempt in 1..=PAGE_RETRY_BUDGET {
        match source.page(url).await {
            Ok(page) => return page,
            Err(e) => {
                tracing::warn!("page fetch failed (attempt {attempt}/{PAGE_RETRY_BUDGET}): {e}");
            }
        }
    }
    // Budget exhausted: drop this page and everything after it.
    tracing::warn!("giving up on {url}; truncating remaining pages");
    TrackPage {
        tracks: vec![],
        next: None,
    }
}

/// Walk the page chain sequentially, accumulating playable tracks. Progress
/// is reported on every other successful page (receivers fall behind real
/// consumers otherwise), with one unconditional completion notification.
pub(crate) async fn collect_tracks(
    source: &mut impl PageSource,
    first_url: String,
    progress: &mpsc::UnboundedSender<FetchProgress>,
) -> Vec<Track> {
    let mut tracks: Vec<Track> = vec![];
    let mut next = Some(first_url);
    let mut send_update = false;

    while let Some(url) = next {
        let page = fetch_page_with_retry(source, &url).await;
        tracks.extend(page.tracks);

        if send_update {
            let _ = progress.send(FetchProgress::Fetched(tracks.len()));
        }
        send_update = !send_update;

        next = page.next;
    }

    let _ = progress.send(FetchProgress::Complete(tracks.len()));
    tracks
}

impl Client {
    /// Fetch every playable track in a playlist, in catalog order.
    ///
    /// Tracks without a usable preview are dropped. Transient page failures
    /// are retried up to [`PAGE_RETRY_BUDGET`] times; a page that keeps
    /// failing truncates the result at the last good page.
    ///
    /// # Errors
    ///
    /// Returns an error if the client-credentials exchange fails.
    pub async fn playlist_tracks(
        &self,
        reference: &str,
        progress: &mpsc::UnboundedSender<FetchProgress>,
    ) -> ClientResult<Vec<Track>> {
        let id = parse_playlist_ref(reference);
        let token = self.access_token().await?;
        let first_url = format!("{}/playlists/{id}/tracks", Self::API_BASE_URL);

        let mut source = ApiPageSource {
            client: self,
            token,
        };
        let tracks = collect_tracks(&mut source, first_url, progress).await;
        tracing::info!("fetched {} playable tracks from playlist {id}", tracks.len());
        Ok(tracks)
    }

    /// Fetch summary metadata for a playlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the client-credentials exchange or the metadata
    /// request fails.
    pub async fn playlist_metadata(&self, reference: &str) -> ClientResult<PlaylistMetadata> {
        let id = parse_playlist_ref(reference);
        let token = self.access_token().await?;

        let response = self
            .client
            .get(format!("{}/playlists/{id}", Self::API_BASE_URL))
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        let raw: RawPlaylist = serde_json::from_slice(&bytes)?;

        Ok(PlaylistMetadata {
            name: raw.name,
            image_url: raw.images.into_iter().next().map(|i| i.url),
            total_tracks: raw.tracks.total,
            followers: raw.followers.total,
        })
    }
}
