//! Catalog data models

use catalog_store::{
    impl_record, json_list_from_value, json_list_to_value, FieldKind, ListElement, SchemaError,
    SchemaRegistry, Value,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A channel and, when loaded through `get_channel`, its related channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub count: Option<i32>,
    pub country: Option<String>,
    pub custom_url: Option<String>,
    pub description: Option<String>,
    pub favorites: Option<String>,
    pub high_thumbnail: Option<String>,
    pub item_count: Option<i32>,
    pub likes: Option<String>,
    pub localized_description: Option<String>,
    pub localized_title: Option<String>,
    pub medium_thumbnail: Option<String>,
    pub playlist_count: Option<i32>,
    pub playlist_item_count: Option<i32>,
    pub playlist_video_count: Option<i32>,
    pub playlist_video_item_count: Option<i32>,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail: Option<String>,
    pub last_upload: Option<DateTime<Utc>>,
    pub title: String,
    pub uploads: Option<String>,
    /// Ids of related channels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
    /// Related channels, resolved from `channels`; never persisted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_list: Vec<Channel>,
}

impl_record!(Channel => "channel" {
    id: "id" [key],
    count: "count",
    country: "country",
    custom_url: "customurl",
    description: "description",
    favorites: "favorites",
    high_thumbnail: "highthumbnail",
    item_count: "itemcount",
    likes: "likes",
    localized_description: "localizeddescription",
    localized_title: "localizedtitle",
    medium_thumbnail: "mediumthumbnail",
    playlist_count: "playlistcount",
    playlist_item_count: "playlistitemcount",
    playlist_video_count: "playlistvideocount",
    playlist_video_item_count: "playlistvideoitemcount",
    published_at: "publishedat",
    thumbnail: "thumbnail",
    last_upload: "lastupload",
    title: "title",
    uploads: "uploads",
    channels: "channels",
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
    pub count: Option<i32>,
    pub item_count: Option<i32>,
    pub description: Option<String>,
    pub high_thumbnail: Option<String>,
    pub localized_description: Option<String>,
    pub localized_title: Option<String>,
    pub maxres_thumbnail: Option<String>,
    pub medium_thumbnail: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub standard_thumbnail: Option<String>,
    pub thumbnail: Option<String>,
    pub title: String,
}

impl_record!(Playlist => "playlist" {
    id: "id" [key],
    channel_id: "channelid",
    channel_title: "channeltitle",
    count: "count",
    item_count: "itemcount",
    description: "description",
    high_thumbnail: "highthumbnail",
    localized_description: "localizeddescription",
    localized_title: "localizedtitle",
    maxres_thumbnail: "maxresthumbnail",
    medium_thumbnail: "mediumthumbnail",
    published_at: "publishedat",
    standard_thumbnail: "standardthumbnail",
    thumbnail: "thumbnail",
    title: "title",
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub caption: Option<String>,
    pub category_id: Option<String>,
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
    pub default_audio_language: Option<String>,
    pub default_language: Option<String>,
    pub definition: Option<i32>,
    pub description: Option<String>,
    pub dimension: Option<String>,
    /// Seconds
    pub duration: Option<i64>,
    pub high_thumbnail: Option<String>,
    pub licensed_content: Option<bool>,
    pub live_broadcast_content: Option<String>,
    pub localized_description: Option<String>,
    pub localized_title: Option<String>,
    pub maxres_thumbnail: Option<String>,
    pub medium_thumbnail: Option<String>,
    pub projection: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub standard_thumbnail: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub thumbnail: Option<String>,
    pub title: String,
    #[serde(default)]
    pub blocked_regions: Vec<String>,
    #[serde(default)]
    pub allowed_regions: Vec<String>,
}

impl_record!(Video => "video" {
    id: "id" [key],
    caption: "caption",
    category_id: "categoryid",
    channel_id: "channelid",
    channel_title: "channeltitle",
    default_audio_language: "defaultaudiolanguage",
    default_language: "defaultlanguage",
    definition: "definition",
    description: "description",
    dimension: "dimension",
    duration: "duration",
    high_thumbnail: "highthumbnail",
    licensed_content: "licensedcontent",
    live_broadcast_content: "livebroadcastcontent",
    localized_description: "localizeddescription",
    localized_title: "localizedtitle",
    maxres_thumbnail: "maxresthumbnail",
    medium_thumbnail: "mediumthumbnail",
    projection: "projection",
    published_at: "publishedat",
    standard_thumbnail: "standardthumbnail",
    tags: "tags",
    thumbnail: "thumbnail",
    title: "title",
    blocked_regions: "blockedregions",
    allowed_regions: "allowedregions",
});

/// One video category as reported by the category service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCategory {
    pub id: String,
    pub title: String,
    pub assignable: bool,
    pub channel_id: String,
}

impl ListElement for DataCategory {
    const LIST_KIND: FieldKind = FieldKind::Json;

    fn list_to_value(items: &[Self]) -> Value {
        json_list_to_value(items)
    }

    fn list_from_value(value: Value) -> Option<Vec<Self>> {
        json_list_from_value(value)
    }
}

/// Cached categories of one region; `id` is the region code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Categories {
    pub id: String,
    pub data: Vec<DataCategory>,
}

impl_record!(Categories => "category" {
    id: "id" [key],
    data: "data",
});

/// Bookkeeping for the last sync of a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSync {
    pub id: String,
    pub synctime: Option<DateTime<Utc>>,
    pub uploads: Option<String>,
    pub level: Option<i32>,
}

impl_record!(ChannelSync => "channelsync" {
    id: "id" [key],
    synctime: "synctime",
    uploads: "uploads",
    level: "level",
});

/// Ordered video ids of one playlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistVideoIndex {
    pub id: String,
    pub videos: Vec<String>,
}

impl_record!(PlaylistVideoIndex => "playlistvideo" {
    id: "id" [key],
    videos: "videos",
});

/// One hit of a search across channels, playlists and videos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchItem {
    Channel(Channel),
    Playlist(Playlist),
    Video(Video),
}

impl SearchItem {
    pub fn id(&self) -> &str {
        match self {
            SearchItem::Channel(channel) => &channel.id,
            SearchItem::Playlist(playlist) => &playlist.id,
            SearchItem::Video(video) => &video.id,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult<T> {
    pub list: Vec<T>,
    /// Records in this page
    pub total: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_page_token: String,
}

impl<T> ListResult<T> {
    pub fn new(list: Vec<T>, limit: usize, next_page_token: String) -> Self {
        Self {
            total: list.len(),
            list,
            limit,
            next_page_token,
        }
    }

    pub fn empty(limit: usize) -> Self {
        Self::new(Vec::new(), limit, String::new())
    }
}

/// Paging parameters of a list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageParams {
    /// Requested page size; clamped by the store configuration
    pub max: Option<usize>,
    pub next_page_token: String,
}

impl PageParams {
    pub fn first(max: usize) -> Self {
        Self {
            max: Some(max),
            next_page_token: String::new(),
        }
    }

    pub fn after(max: usize, token: impl Into<String>) -> Self {
        Self {
            max: Some(max),
            next_page_token: token.into(),
        }
    }
}

/// Derive every catalog record once. Fails on the first misdeclared record.
pub fn catalog_registry() -> Result<SchemaRegistry, SchemaError> {
    SchemaRegistry::new()
        .with::<Channel>()?
        .with::<Playlist>()?
        .with::<Video>()?
        .with::<Categories>()?
        .with::<ChannelSync>()?
        .with::<PlaylistVideoIndex>()
}
