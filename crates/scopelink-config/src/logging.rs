use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Shape of the lines `scopelinkd` writes to stderr.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event with flattened fields.
    #[default]
    Json,
    /// Single-line text for people watching a terminal.
    Compact,
}
