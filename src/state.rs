use crate::{
    config::{RuntimeConfiguration, StorageConfig},
    data::{StudentStore, memory::MemoryStudentStore, postgres::PgStudentStore},
    error::StudentResult,
    records::StudentRecords,
};
use sqlx::postgres::PgPoolOptions;
use std::{ops::Deref, sync::Arc};

#[derive(Clone, Debug)]
pub struct StudentState {
    records: StudentRecords,
    config: RuntimeConfiguration,
}

impl StudentState {
    pub async fn new(options: PgPoolOptions, config: RuntimeConfiguration) -> StudentResult<Self> {
        let store: Arc<dyn StudentStore> = match config.storage() {
            StorageConfig::Postgres(db_config) => {
                Arc::new(PgStudentStore::new(options, &db_config.get_db_path()).await?)
            }
            StorageConfig::Memory => {
                warn!("Using in-memory storage, records will be lost on shutdown");
                Arc::new(MemoryStudentStore::new())
            }
        };

        Ok(Self::with_store(store, config))
    }

    pub fn with_store(store: Arc<dyn StudentStore>, config: RuntimeConfiguration) -> Self {
        Self {
            records: StudentRecords::new(store),
            config,
        }
    }

    pub const fn config(&self) -> &RuntimeConfiguration {
        &self.config
    }

    pub async fn sensible_shutdown(&self) {
        self.records.close().await;
    }
}

impl Deref for StudentState {
    type Target = StudentRecords;

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}
