//! Content module - view models and the logic that derives them

mod neighbors;
mod pagination;
mod post;
mod projector;
mod reading_time;
pub mod richtext;

pub use neighbors::NeighborResolver;
pub use pagination::{LoadOutcome, PaginationState, Paginator};
pub use post::{
    Article, ArticleBanner, ArticleData, ArticleListItem, ArticleSection, ListItemData,
    NeighborReference, Neighbors,
};
pub use projector::{project_article, project_list_item};
pub use reading_time::{ReadingTime, WORDS_PER_MINUTE};
