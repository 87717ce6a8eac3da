//! Read side of the catalog: lookups, listings and searches.

use std::sync::Arc;

use catalog_store::{
    text_query, Backend, CursorCodec, Dialect, FilterTree, OffsetCursor, OffsetState, Predicate,
    Record, SearchFilter, SearchTarget, Value,
};
use tracing::{debug, info, instrument};

use crate::category::CategoryClient;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    Categories, Channel, ListResult, PageParams, Playlist, PlaylistVideoIndex, SearchItem, Video,
};
use crate::store::CatalogStore;

const PUBLISHED_AT: &str = "publishedat";

/// Columns of each kind returned by a cross-type search that names none.
const CHANNEL_HIT_FIELDS: &[&str] = &["id", "title", "description", "publishedat"];
const PLAYLIST_HIT_FIELDS: &[&str] = &[
    "id",
    "channelid",
    "channeltitle",
    "title",
    "description",
    "count",
    "publishedat",
];
const VIDEO_HIT_FIELDS: &[&str] = &[
    "id",
    "channelid",
    "channeltitle",
    "title",
    "description",
    "duration",
    "publishedat",
];

pub struct CatalogService<B> {
    store: CatalogStore<B>,
    categories: Option<Arc<dyn CategoryClient>>,
    default_region: String,
}

impl<B: Backend> CatalogService<B> {
    pub fn new(store: CatalogStore<B>) -> Self {
        Self {
            store,
            categories: None,
            default_region: "US".to_string(),
        }
    }

    pub fn with_category_client(mut self, client: Arc<dyn CategoryClient>) -> Self {
        self.categories = Some(client);
        self
    }

    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = region.into();
        self
    }

    pub fn store(&self) -> &CatalogStore<B> {
        &self.store
    }

    /// A channel with `channel_list` filled from its related channel ids.
    #[instrument(skip(self, fields))]
    pub async fn get_channel(&self, id: &str, fields: &[String]) -> ServiceResult<Option<Channel>> {
        let Some(mut channel) = self.store.find_one::<Channel>(id, fields).await? else {
            return Ok(None);
        };
        if !channel.channels.is_empty() {
            channel.channel_list = self.store.find_many::<Channel>(&channel.channels, &[]).await?;
        }
        Ok(Some(channel))
    }

    #[instrument(skip(self, fields))]
    pub async fn get_channels(&self, ids: &[String], fields: &[String]) -> ServiceResult<Vec<Channel>> {
        self.store.find_many(ids, fields).await
    }

    #[instrument(skip(self, fields))]
    pub async fn get_playlist(&self, id: &str, fields: &[String]) -> ServiceResult<Option<Playlist>> {
        self.store.find_one(id, fields).await
    }

    #[instrument(skip(self, fields))]
    pub async fn get_playlists(&self, ids: &[String], fields: &[String]) -> ServiceResult<Vec<Playlist>> {
        self.store.find_many(ids, fields).await
    }

    #[instrument(skip(self, fields))]
    pub async fn get_video(&self, id: &str, fields: &[String]) -> ServiceResult<Option<Video>> {
        self.store.find_one(id, fields).await
    }

    #[instrument(skip(self, fields))]
    pub async fn get_videos(&self, ids: &[String], fields: &[String]) -> ServiceResult<Vec<Video>> {
        self.store.find_many(ids, fields).await
    }

    /// Newest playlists of a channel first.
    #[instrument(skip(self, fields))]
    pub async fn get_channel_playlists(
        &self,
        channel_id: &str,
        fields: &[String],
        page: &PageParams,
    ) -> ServiceResult<ListResult<Playlist>> {
        let tree = FilterTree::builder()
            .must(Predicate::matches("channelid", Value::Text(channel_id.to_string())))
            .sort_desc(Some(PUBLISHED_AT))
            .build();
        self.store.search(&tree, fields, page).await
    }

    /// Newest uploads of a channel first.
    #[instrument(skip(self, fields))]
    pub async fn get_channel_videos(
        &self,
        channel_id: &str,
        fields: &[String],
        page: &PageParams,
    ) -> ServiceResult<ListResult<Video>> {
        let tree = FilterTree::builder()
            .must(Predicate::matches("channelid", Value::Text(channel_id.to_string())))
            .sort_desc(Some(PUBLISHED_AT))
            .build();
        self.store.search(&tree, fields, page).await
    }

    /// Videos listed in a playlist's index, newest first. An unknown or empty
    /// playlist yields an empty page.
    #[instrument(skip(self, fields))]
    pub async fn get_playlist_videos(
        &self,
        playlist_id: &str,
        fields: &[String],
        page: &PageParams,
    ) -> ServiceResult<ListResult<Video>> {
        let index = self
            .store
            .find_one::<PlaylistVideoIndex>(playlist_id, &[])
            .await?;
        let ids = match index {
            Some(index) if !index.videos.is_empty() => index.videos,
            _ => {
                debug!(playlist_id, "Playlist has no indexed videos");
                return Ok(ListResult::empty(self.store.config().page_size(page.max)));
            }
        };

        let tree = FilterTree::builder()
            .must(Predicate::contains(
                "id",
                ids.into_iter().map(Value::Text).collect(),
            ))
            .sort_desc(Some(PUBLISHED_AT))
            .build();
        self.store.search(&tree, fields, page).await
    }

    /// Cached categories for a region. On a miss they are fetched from the
    /// category client and written back.
    #[instrument(skip(self))]
    pub async fn get_categories(&self, region_code: &str) -> ServiceResult<Categories> {
        let region = match region_code.trim() {
            "" => self.default_region.as_str(),
            code => code,
        };
        if let Some(cached) = self.store.find_one::<Categories>(region, &[]).await? {
            if !cached.data.is_empty() {
                return Ok(cached);
            }
        }

        let client = self.categories.as_ref().ok_or_else(|| {
            ServiceError::Category("no category client configured".to_string())
        })?;
        let categories = Categories {
            id: region.to_string(),
            data: client.get_categories(region).await?,
        };
        self.store.upsert(&categories).await?;
        info!(region, count = categories.data.len(), "Cached categories");
        Ok(categories)
    }

    #[instrument(skip(self, fields))]
    pub async fn search_channels(
        &self,
        filter: &SearchFilter,
        fields: &[String],
        page: &PageParams,
    ) -> ServiceResult<ListResult<Channel>> {
        let tree = filter.to_filter_tree(SearchTarget::Channel);
        self.store.search(&tree, fields, page).await
    }

    #[instrument(skip(self, fields))]
    pub async fn search_playlists(
        &self,
        filter: &SearchFilter,
        fields: &[String],
        page: &PageParams,
    ) -> ServiceResult<ListResult<Playlist>> {
        let tree = filter.to_filter_tree(SearchTarget::Playlist);
        self.store.search(&tree, fields, page).await
    }

    #[instrument(skip(self, fields))]
    pub async fn search_videos(
        &self,
        filter: &SearchFilter,
        fields: &[String],
        page: &PageParams,
    ) -> ServiceResult<ListResult<Video>> {
        let tree = filter.to_filter_tree(SearchTarget::Video);
        self.store.search(&tree, fields, page).await
    }

    /// Free-text search over channels, playlists and videos, concatenated in
    /// that order into one page.
    ///
    /// Each kind is read with the same offset and limit, and the token is
    /// computed over the combined page. A natively paged store has no shared
    /// offset, so it answers with videos only.
    #[instrument(skip(self, fields))]
    pub async fn search(
        &self,
        filter: &SearchFilter,
        fields: &[String],
        page: &PageParams,
    ) -> ServiceResult<ListResult<SearchItem>> {
        if self.store.backend().dialect().native_paging() {
            let videos = self.search_videos(filter, fields, page).await?;
            return Ok(ListResult::new(
                videos.list.into_iter().map(SearchItem::Video).collect(),
                videos.limit,
                videos.next_page_token,
            ));
        }

        let state = OffsetCursor.decode(&page.next_page_token)?;
        let mut builder = FilterTree::builder();
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            builder = builder.should_all(text_query(q));
        }
        let tree = builder.build();

        let channels = self
            .store
            .search::<Channel>(&tree, &self.hit_fields::<Channel>(fields, CHANNEL_HIT_FIELDS)?, page)
            .await?;
        let playlists = self
            .store
            .search::<Playlist>(&tree, &self.hit_fields::<Playlist>(fields, PLAYLIST_HIT_FIELDS)?, page)
            .await?;
        let videos = self
            .store
            .search::<Video>(&tree, &self.hit_fields::<Video>(fields, VIDEO_HIT_FIELDS)?, page)
            .await?;

        let list: Vec<SearchItem> = channels
            .list
            .into_iter()
            .map(SearchItem::Channel)
            .chain(playlists.list.into_iter().map(SearchItem::Playlist))
            .chain(videos.list.into_iter().map(SearchItem::Video))
            .collect();
        let limit = self.store.config().page_size(page.max);
        let next_page_token = OffsetCursor.encode(
            &OffsetState {
                skip: state.skip,
                last_id: list.last().map(|item| item.id().to_string()),
            },
            list.len(),
            limit,
        );
        debug!(hits = list.len(), skip = state.skip, "Cross-type search page");
        Ok(ListResult::new(list, limit, next_page_token))
    }

    /// The requested fields `R` knows, or `defaults` when none apply.
    fn hit_fields<R: Record>(&self, requested: &[String], defaults: &[&str]) -> ServiceResult<Vec<String>> {
        let meta = self.store.meta::<R>()?;
        let known: Vec<String> = requested
            .iter()
            .filter(|field| meta.fields.contains(field.trim()))
            .cloned()
            .collect();
        if known.is_empty() {
            return Ok(defaults.iter().map(|field| field.to_string()).collect());
        }
        Ok(known)
    }

    /// Videos sharing at least one tag with `video_id`, excluding itself.
    #[instrument(skip(self, fields))]
    pub async fn get_related_videos(
        &self,
        video_id: &str,
        fields: &[String],
        page: &PageParams,
    ) -> ServiceResult<ListResult<Video>> {
        let source = self
            .store
            .find_one::<Video>(video_id, &["tags".to_string()])
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("video {}", video_id)))?;
        if source.tags.is_empty() {
            return Err(ServiceError::InvalidRequest(format!(
                "video {} has no tags",
                video_id
            )));
        }

        let tree = FilterTree::builder()
            .should_all(
                source
                    .tags
                    .into_iter()
                    .map(|tag| Predicate::contains("tags", vec![Value::Text(tag)])),
            )
            .not(Predicate::matches("id", Value::Text(video_id.to_string())))
            .sort_desc(Some(PUBLISHED_AT))
            .build();
        self.store.search(&tree, fields, page).await
    }

    /// Newest videos not blocked in `region_code`, optionally within one category.
    #[instrument(skip(self, fields))]
    pub async fn get_popular_videos(
        &self,
        region_code: &str,
        category_id: Option<&str>,
        fields: &[String],
        page: &PageParams,
    ) -> ServiceResult<ListResult<Video>> {
        let filter = SearchFilter {
            region_code: Some(region_code.to_string()),
            category_id: category_id.map(str::to_string),
            sort: Some(PUBLISHED_AT.to_string()),
            ..Default::default()
        };
        let tree = filter.to_filter_tree(SearchTarget::Video);
        self.store.search(&tree, fields, page).await
    }
}
