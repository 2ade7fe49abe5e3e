use std::path::PathBuf;
use std::sync::Arc;

use driftnet_common::{AppConfig, StoreKind};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::file::FileStore;
use crate::postgres::PgStore;
use crate::store::RecordStore;

/// Which concrete store backs a process.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    File { data_dir: PathBuf },
    Postgres { database_url: String },
}

impl StoreBackend {
    /// Resolve a configured backend kind against environment settings.
    pub fn from_kind(kind: StoreKind, app: &AppConfig) -> StoreResult<Self> {
        match kind {
            StoreKind::File => Ok(Self::File {
                data_dir: app.data_dir.clone(),
            }),
            StoreKind::Postgres => {
                let database_url = app.database_url.clone().ok_or_else(|| {
                    StoreError::Unavailable("DATABASE_URL is not set".to_string())
                })?;
                Ok(Self::Postgres { database_url })
            }
        }
    }
}

pub async fn open_store(backend: &StoreBackend) -> StoreResult<Arc<dyn RecordStore>> {
    match backend {
        StoreBackend::File { data_dir } => {
            info!(data_dir = %data_dir.display(), "Using filesystem store");
            Ok(Arc::new(FileStore::new(data_dir.clone())))
        }
        StoreBackend::Postgres { database_url } => {
            let store = PgStore::connect(database_url).await?;
            store.migrate().await?;
            info!("Using Postgres store");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> AppConfig {
        AppConfig {
            data_dir: PathBuf::from("/var/lib/driftnet"),
            database_url: None,
            browserless_url: None,
            browserless_token: None,
            chrome_bin: "chromium".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5004,
        }
    }

    #[test]
    fn file_backend_uses_data_dir() {
        match StoreBackend::from_kind(StoreKind::File, &app()).unwrap() {
            StoreBackend::File { data_dir } => assert_eq!(data_dir, PathBuf::from("/var/lib/driftnet")),
            other => panic!("unexpected backend: {other:?}"),
        }
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let err = StoreBackend::from_kind(StoreKind::Postgres, &app()).unwrap_err();
        assert!(err.is_unavailable());

        let mut app = app();
        app.database_url = Some("postgres://localhost/driftnet".to_string());
        assert!(matches!(
            StoreBackend::from_kind(StoreKind::Postgres, &app).unwrap(),
            StoreBackend::Postgres { .. }
        ));
    }
}
