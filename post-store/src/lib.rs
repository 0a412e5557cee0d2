mod file;


pub use file::StoreFile;

use std::collections::HashMap;
use tracker_core::{Post, PostKey};

/// Ordered table of collected posts, unique by [`PostKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostStore {
    posts: Vec<Post>,
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from raw rows, keeping the last row of every identity.
    pub fn from_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: dedup_keep_last(posts),
        }
    }

    /// Appends `incoming` after the current contents and deduplicates.
    ///
    /// On an identity collision the incoming copy wins and takes the position
    /// of the last occurrence.
    pub fn merge<I>(self, incoming: I) -> PostStore
    where
        I: IntoIterator<Item = Post>,
    {
        let mut combined = self.posts;
        combined.extend(incoming);
        Self::from_posts(combined)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn into_posts(self) -> Vec<Post> {
        self.posts
    }

    pub fn get(&self, key: PostKey<'_>) -> Option<&Post> {
        self.posts.iter().find(|post| post.key() == key)
    }

    pub fn contains(&self, key: PostKey<'_>) -> bool {
        self.get(key).is_some()
    }
}

impl FromIterator<Post> for PostStore {
    fn from_iter<T: IntoIterator<Item = Post>>(iter: T) -> Self {
        Self::from_posts(iter.into_iter().collect())
    }
}

fn dedup_keep_last(posts: Vec<Post>) -> Vec<Post> {
    let keep = {
        let mut last_index: HashMap<PostKey<'_>, usize> = HashMap::with_capacity(posts.len());
        for (index, post) in posts.iter().enumerate() {
            last_index.insert(post.key(), index);
        }

        let mut keep = vec![false; posts.len()];
        for index in last_index.into_values() {
            keep[index] = true;
        }
        keep
    };

    posts
        .into_iter()
        .zip(keep)
        .filter_map(|(post, keep)| keep.then_some(post))
        .collect()
}
