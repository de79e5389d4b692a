//! Staged entity records and patch DTOs.
//!
//! Each submodule contains:
//! - A `Serialize` + `Deserialize` record struct carrying a [`StagingStatus`]
//! - An update DTO (all `Option` fields) used for field-level store updates
//!
//! [`StagingStatus`]: crate::status::StagingStatus

pub mod position;
pub mod template;
pub mod zone;
pub mod zone_position;

pub use position::{Position, PositionPatch};
pub use template::{Template, TemplateNode};
pub use zone::{Zone, ZonePatch};
pub use zone_position::ZonePositionLink;
