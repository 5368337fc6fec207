pub mod listing;
pub mod record;
pub mod request;
pub mod snapshot;
