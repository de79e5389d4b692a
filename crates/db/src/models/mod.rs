//! Database row structs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching one
//! table, and a conversion into the matching `zonemap_core` model. Rows
//! loaded from the database always convert to `StagingStatus::Existing`.

pub mod position;
pub mod zone;
pub mod zone_position;
pub mod zone_template;

pub use position::PositionRow;
pub use zone::ZoneRow;
pub use zone_position::ZonePositionRow;
pub use zone_template::ZoneTemplateRow;
