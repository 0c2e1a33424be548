pub mod assemble;
pub mod config;
pub mod crs;
pub mod error;
pub mod export;
pub mod filter;
pub mod index;
pub mod map;
pub mod model;
pub mod pipeline;
pub mod reader;
pub mod remote;
pub mod resize;
pub mod schema;
pub mod tables;
pub mod writer;

#[cfg(test)]
mod testing;

pub use assemble::assemble;
pub use config::{read_config, MapConfig};
pub use error::{Error, Result};
pub use export::{compile_type_table, compile_type_tables, write_geo_tables, GeoTable};
pub use filter::{apply_declination_fix, filter_invalid_rows};
pub use index::GroupedIndex;
pub use map::{StyleKind, WebMap};
pub use model::{IdExceptions, Observation, ObservationId, Table, Value};
pub use pipeline::{compile_webmap, export_observations, WebmapOptions};
pub use reader::{read_table_set, read_table_sets};
pub use remote::remote_update;
pub use resize::resize_images;
pub use schema::SubType;
pub use tables::{Bounds, TableSet};
