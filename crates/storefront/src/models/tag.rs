//! Generic-relation types: tags and likes.

use serde::Serialize;

use storefront_core::{ContentType, LikedItemId, TagId, TaggedItemId, UserId};

/// A free-form label.
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub label: String,
}

/// A tag applied to some object.
#[derive(Debug, Clone, Serialize)]
pub struct TaggedItem {
    pub id: TaggedItemId,
    pub tag: Tag,
    pub content_type: ContentType,
    pub object_id: i64,
}

/// An object a user has liked.
#[derive(Debug, Clone, Serialize)]
pub struct LikedItem {
    pub id: LikedItemId,
    #[serde(skip)]
    pub user_id: UserId,
    pub content_type: ContentType,
    pub object_id: i64,
}
