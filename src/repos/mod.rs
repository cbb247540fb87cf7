pub mod filter;
pub mod model;
pub mod search_index;

pub use filter::{FilterTermSet, SearchQuery, filter_repo_map, filter_terms};
pub use model::{RepositoryIndex, RepositoryRecord};
pub use search_index::flatten_repo_map;
