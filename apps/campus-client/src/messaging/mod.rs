pub mod board;
pub mod model;
pub mod service;

pub use board::{BoardState, DiscussionBoard};
pub use model::{Discussion, Message, NewDiscussion, Participant};
pub use service::{HttpMessagingService, MessagingService};
