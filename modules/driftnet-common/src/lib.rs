pub mod config;
pub mod domain;
pub mod error;
pub mod file_config;
pub mod geo;
pub mod id;
pub mod record;
pub mod time;

pub use config::AppConfig;
pub use domain::{derive_domain, parse_web_url};
pub use error::{RecordError, RecordResult};
pub use file_config::{
    load_config, IngestConfig, NavigationWait, RenderBackend, RenderSection, StoreKind, TimestampStrategy,
};
pub use geo::{locations_from_value, GeoPoint};
pub use id::RecordId;
pub use record::{normalize_labels, RawWebPage, WebPage};
pub use time::{parse_timestamp, timestamp_from_value};
