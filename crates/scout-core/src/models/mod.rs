pub mod error;
pub mod query;
pub mod response;
pub mod status;
pub mod timestamp;

pub use error::{SearchError, TransportError};
pub use query::{SearchCriterion, SearchField, SearchOperator, SearchQuery, SortOrder};
pub use response::{SearchResponse, SearchResult};
pub use status::{SearchState, SearchStatus};
