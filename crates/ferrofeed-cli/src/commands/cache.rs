use ferrofeed_core::EntityKind;
use ferrofeed_warehouse::Warehouse;
use serde::Serialize;

use crate::cli::{CacheArgs, CacheCommand};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ClearReport {
    kind: Option<EntityKind>,
    removed: usize,
}

pub fn run(args: &CacheArgs, warehouse: &Warehouse, pretty: bool) -> Result<(), CliError> {
    match &args.command {
        CacheCommand::List => output::render_json(&warehouse.entries()?, pretty),
        CacheCommand::Clear(clear) => {
            let kind = clear
                .kind
                .as_deref()
                .map(str::parse::<EntityKind>)
                .transpose()
                .map_err(CliError::Command)?;
            let removed = warehouse.clear(kind)?;
            output::render_json(&ClearReport { kind, removed }, pretty)
        }
    }
}
