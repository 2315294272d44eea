//! Database layer (Firestore, with an in-memory fallback).

pub mod firestore;
pub mod memory;
pub mod store;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;
pub use store::{CacheStore, TokenStore, YoutubeStore};

/// Collection names as constants.
pub mod collections {
    /// User documents; the YouTube token fields live here
    pub const USERS: &str = "users";
    pub const YOUTUBE_PLAYLISTS_CACHE: &str = "youtube_playlists_cache";
    pub const YOUTUBE_VIDEOS_CACHE: &str = "youtube_videos_cache";
}

/// Document ID for a cached playlist row.
///
/// Components are percent-encoded, so the `:` separator cannot occur inside them.
pub fn playlist_doc_id(user_id: &str, playlist_id: &str) -> String {
    format!(
        "{}:{}",
        urlencoding::encode(user_id),
        urlencoding::encode(playlist_id)
    )
}

/// Document ID for a cached playlist video row.
pub fn video_doc_id(user_id: &str, playlist_id: &str, video_id: &str) -> String {
    format!(
        "{}:{}:{}",
        urlencoding::encode(user_id),
        urlencoding::encode(playlist_id),
        urlencoding::encode(video_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_ids_are_unambiguous() {
        assert_ne!(playlist_doc_id("a_b", "c"), playlist_doc_id("a", "b_c"));
        assert_ne!(playlist_doc_id("a:b", "c"), playlist_doc_id("a", "b:c"));
        assert_eq!(video_doc_id("user_1", "PL1", "vid"), "user_1:PL1:vid");
    }
}
