//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Bulk inserts use `UNNEST` and
//! ignore rows whose id already exists; bulk deletes take an id array and
//! treat missing ids as a no-op.

pub mod position_repo;
pub mod zone_position_repo;
pub mod zone_repo;
pub mod zone_template_repo;

pub use position_repo::PositionRepo;
pub use zone_position_repo::ZonePositionRepo;
pub use zone_repo::ZoneRepo;
pub use zone_template_repo::ZoneTemplateRepo;
