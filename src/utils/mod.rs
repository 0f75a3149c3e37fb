pub mod http_client;

pub use http_client::build_http_client;
