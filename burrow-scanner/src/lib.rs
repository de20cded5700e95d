pub mod error;
pub mod record;
pub mod requester;

pub use async_trait::async_trait;
pub use error::ScanError;
pub use record::ResponseRecord;
pub use requester::{HttpRequester, RequestOptions, Requester};
