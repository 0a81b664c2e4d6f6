mod error;
mod extract;
mod fetcher;
mod report;
mod resolver;

pub use error::FetchError;
pub use extract::{decode_body, extract_ipv4};
pub use fetcher::{FetchResult, Fetcher, HttpFetcher};
pub use report::{ConsistencyReport, ServerResult};
pub use resolver::IpGetter;
