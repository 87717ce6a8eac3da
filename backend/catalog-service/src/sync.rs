//! Write side used by the channel sync jobs.

use catalog_store::Backend;
use tracing::{info, instrument};

use crate::error::ServiceResult;
use crate::models::{Channel, ChannelSync, Playlist, PlaylistVideoIndex, Video};
use crate::store::CatalogStore;

pub struct SyncRepository<B> {
    store: CatalogStore<B>,
}

impl<B: Backend> SyncRepository<B> {
    pub fn new(store: CatalogStore<B>) -> Self {
        Self { store }
    }

    /// `None` when the channel was never synced.
    #[instrument(skip(self))]
    pub async fn get_channel_sync(&self, channel_id: &str) -> ServiceResult<Option<ChannelSync>> {
        self.store.find_one(channel_id, &[]).await
    }

    #[instrument(skip(self, channel), fields(channel_id = %channel.id))]
    pub async fn save_channel(&self, channel: &Channel) -> ServiceResult<u64> {
        self.store.upsert(channel).await
    }

    #[instrument(skip(self, sync), fields(channel_id = %sync.id))]
    pub async fn save_channel_sync(&self, sync: &ChannelSync) -> ServiceResult<u64> {
        self.store.upsert(sync).await
    }

    /// The subset of `ids` already stored.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn get_video_ids(&self, ids: &[String]) -> ServiceResult<Vec<String>> {
        let videos = self
            .store
            .find_many::<Video>(ids, &["id".to_string()])
            .await?;
        Ok(videos.into_iter().map(|v| v.id).collect())
    }

    #[instrument(skip(self, videos), fields(count = videos.len()))]
    pub async fn save_videos(&self, videos: &[Video]) -> ServiceResult<u64> {
        let saved = self.store.upsert_all(videos).await?;
        info!(saved, "Saved videos");
        Ok(saved)
    }

    #[instrument(skip(self, playlists), fields(count = playlists.len()))]
    pub async fn save_playlists(&self, playlists: &[Playlist]) -> ServiceResult<u64> {
        let saved = self.store.upsert_all(playlists).await?;
        info!(saved, "Saved playlists");
        Ok(saved)
    }

    #[instrument(skip(self, playlist), fields(playlist_id = %playlist.id))]
    pub async fn save_playlist(&self, playlist: &Playlist) -> ServiceResult<u64> {
        self.store.upsert(playlist).await
    }

    /// Replace the ordered video ids of a playlist.
    #[instrument(skip(self, videos), fields(count = videos.len()))]
    pub async fn save_playlist_videos(
        &self,
        playlist_id: &str,
        videos: Vec<String>,
    ) -> ServiceResult<u64> {
        let index = PlaylistVideoIndex {
            id: playlist_id.to_string(),
            videos,
        };
        self.store.upsert(&index).await
    }
}
