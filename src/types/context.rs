use serde::{Deserialize, Serialize};

/// What the host knows about the page being rendered.
///
/// Built once per request and consumed read-only by the match evaluator.
/// `archive_category_id` is only meaningful when `is_category_archive` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContext {
    pub id: u64,
    pub is_single_post: bool,
    pub is_page: bool,
    pub is_category_archive: bool,
    pub archive_category_id: u64,
    pub category_ids_of_post: Vec<u64>,
    pub is_mobile: bool,
}

impl PageContext {
    /// A context that is neither a post, a page nor an archive (e.g. the front page).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single_post(id: u64) -> Self {
        Self {
            id,
            is_single_post: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page(id: u64) -> Self {
        Self {
            id,
            is_page: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn category_archive(category_id: u64) -> Self {
        Self {
            is_category_archive: true,
            archive_category_id: category_id,
            ..Self::default()
        }
    }

    /// Set the categories the current post is filed under.
    #[must_use]
    pub fn in_categories(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.category_ids_of_post = ids.into_iter().collect();
        self
    }

    #[must_use]
    pub fn mobile(mut self, is_mobile: bool) -> Self {
        self.is_mobile = is_mobile;
        self
    }

    #[must_use]
    pub fn post_has_category(&self, category_id: u64) -> bool {
        self.category_ids_of_post.contains(&category_id)
    }
}
