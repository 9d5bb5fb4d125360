//! Request middleware and extractors

mod owner;

pub use owner::{OWNER_HEADER, OwnerId};
