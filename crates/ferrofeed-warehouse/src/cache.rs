use ferrofeed_core::cache::CacheFuture;
use ferrofeed_core::{CacheError, CacheGateway, EntityKind, RawRecord, Symbol};

use crate::{Warehouse, WarehouseError};

/// [`CacheGateway`] over a [`Warehouse`].
///
/// DuckDB calls block, so each one runs on tokio's blocking pool.
#[derive(Clone)]
pub struct WarehouseCache {
    warehouse: Warehouse,
}

impl WarehouseCache {
    pub fn new(warehouse: Warehouse) -> Self {
        Self { warehouse }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    async fn run_blocking<T, F>(&self, work: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&Warehouse) -> Result<T, WarehouseError> + Send + 'static,
    {
        let warehouse = self.warehouse.clone();
        let outcome = tokio::task::spawn_blocking(move || work(&warehouse))
            .await
            .map_err(|error| WarehouseError::Task(error.to_string()))?;
        Ok(outcome?)
    }
}

impl CacheGateway for WarehouseCache {
    fn get<'a>(
        &'a self,
        kind: EntityKind,
        symbol: &'a Symbol,
    ) -> CacheFuture<'a, Option<Vec<RawRecord>>> {
        let symbol = symbol.clone();
        Box::pin(self.run_blocking(move |warehouse| warehouse.load(kind, &symbol)))
    }

    fn set<'a>(
        &'a self,
        kind: EntityKind,
        symbol: &'a Symbol,
        records: Vec<RawRecord>,
    ) -> CacheFuture<'a, ()> {
        let symbol = symbol.clone();
        Box::pin(self.run_blocking(move |warehouse| warehouse.store(kind, &symbol, &records)))
    }
}
