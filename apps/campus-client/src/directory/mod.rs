pub mod cache;
pub mod model;
pub mod resolver;
pub mod selection;
pub mod service;

pub use cache::QueryCache;
pub use model::{DirectoryEntry, DirectoryUser, UserQuery};
pub use resolver::{
    RecipientFilters, RecipientResolver, ResolverSettings, ResolverState, SelectionView,
};
pub use selection::{SelectedRecipient, SelectionSet};
pub use service::{HttpUserDirectory, UserDirectory};
