//! URL and payload builder for the `/posts` resource.
//!
//! # Design
//! `PostsApi` holds only a `base_url` and carries no mutable state. It knows
//! where each action goes and what the demo sends; executing the request is
//! left to a [`RequestExecutor`](crate::executor::RequestExecutor).

use crate::types::{NewPost, Post, PostPatch};

/// Public service the board talks to when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[derive(Debug, Clone)]
pub struct PostsApi {
    base_url: String,
}

impl PostsApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn posts_url(&self) -> String {
        format!("{}/posts", self.base_url)
    }

    pub fn post_url(&self, id: u64) -> String {
        format!("{}/posts/{id}", self.base_url)
    }

    /// Payload sent by the create action.
    pub fn new_post(&self) -> NewPost {
        NewPost {
            title: "New Post".to_string(),
            body: "Content...".to_string(),
            user_id: 101,
        }
    }

    /// Full replacement sent by the PUT action for `id`.
    pub fn replacement(&self, id: u64) -> Post {
        Post {
            id,
            title: "Updated".to_string(),
            body: "Updated content".to_string(),
            user_id: 1,
        }
    }

    /// Partial update sent by the PATCH action.
    pub fn patch(&self) -> PostPatch {
        PostPatch {
            title: Some("Patched Title".to_string()),
        }
    }
}

impl Default for PostsApi {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
