use serde::{Deserialize, Serialize};

use crate::Client;

/// A track ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub String);
impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A credited artist on a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    /// The artist's display name.
    pub name: String,
}

/// A playable track, as the quiz cares about it. Immutable once fetched;
/// every track handed out has a usable preview URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// The track ID
    pub id: TrackId,
    /// The track title
    pub title: String,
    /// The credited artists, in catalog order
    pub artists: Vec<Artist>,
    /// URL of the ~30s audio preview
    pub preview_url: String,
    /// URL of the album cover, if the catalog supplied one
    pub album_art_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTrackPage {
    pub next: Option<String>,
    // Items are held loose and converted one at a time: a single malformed
    // item must not fail the page it arrived on.
    pub items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawItem {
    #[serde(default)]
    pub track: Option<RawTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTrack {
    pub id: Option<String>,
    pub name: String,
    pub preview_url: Option<String>,
    #[serde(default)]
    pub album: RawAlbum,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawAlbum {
    #[serde(default)]
    pub images: Vec<RawImage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawImage {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawArtist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResource {
    preview_url: Option<String>,
}

/// Convert a page's loose items, dropping any with an unexpected shape.
pub(crate) fn parse_raw_items(values: Vec<serde_json::Value>) -> Vec<RawItem> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawItem>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("dropping malformed playlist item: {e}");
                None
            }
        })
        .collect()
}

impl Client {
    /// Translate one raw playlist item into a [`Track`], or `None` if the item
    /// is unusable. An item without a preview URL gets one best-effort
    /// secondary lookup via the track's embed page before being dropped.
    pub(crate) async fn parse_item(&self, item: RawItem) -> Option<Track> {
        let raw = item.track?;

        let preview_url = match raw.preview_url {
            Some(url) => Some(url),
            None => match raw.id.as_deref() {
                Some(id) => self.embed_preview_url(id).await,
                None => None,
            },
        };
        let Some(preview_url) = preview_url else {
            tracing::warn!("dropping track {:?}: no usable preview", raw.name);
            return None;
        };

        Some(Track {
            id: TrackId(raw.id.unwrap_or_default()),
            title: raw.name,
            artists: raw
                .artists
                .into_iter()
                .map(|a| Artist { name: a.name })
                .collect(),
            preview_url,
            album_art_url: raw.album.images.into_iter().next().map(|i| i.url),
        })
    }

    /// The embed page that Spotify's embedded players use carries a
    /// `script#resource` JSON blob which includes the preview URL even when
    /// the API response omits it.
    async fn embed_preview_url(&self, id: &str) -> Option<String> {
        let url = format!("https://open.spotify.com/embed/track/{id}");
        let html = match self.client.get(&url).send().await {
            Ok(response) => match response.text().await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("reading embed page for {id} failed: {e}");
                    return None;
                }
            },
            Err(e) => {
                tracing::warn!("fetching embed page for {id} failed: {e}");
                return None;
            }
        };
        extract_embed_preview(&html)
    }
}

/// Pull the preview URL out of the embed page's `script#resource` element.
/// The blob is percent-encoded JSON. Any structural surprise yields `None`.
fn extract_embed_preview(html: &str) -> Option<String> {
    let marker = html.find("id=\"resource\"")?;
    let body_start = marker + html[marker..].find('>')? + 1;
    let body_end = body_start + html[body_start..].find("</script>")?;
    let encoded = html[body_start..body_end].trim();

    let decoded = percent_decode(encoded);
    let resource: EmbedResource = match serde_json::from_str(&decoded) {
        Ok(resource) => resource,
        Err(e) => {
            tracing::warn!("embed resource blob did not parse: {e}");
            return None;
        }
    };
    resource.preview_url
}

/// Decode `%XX` escapes in the embed blob. Invalid escapes and every other
/// byte (including `+`) are passed through untouched.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = bytes.get(i + 1..i + 3).and_then(|pair| {
                    std::str::from_utf8(pair)
                        .ok()
                        .and_then(|s| u8::from_str_radix(s, 16).ok())
                });
                match hex {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
