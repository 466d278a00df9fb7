//! The (type, group, instance) resource identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a resource record uniquely within a segment universe.
///
/// Two keys name the same resource iff all three fields match. The derived
/// `Hash` covers all three fields order-sensitively, so `ResourceKey` can be
/// used directly as a map key — the aggregate segment relies on this for its
/// key index.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub type_id: u32,
    pub group_id: u32,
    pub instance_id: u32,
}

impl ResourceKey {
    pub const fn new(type_id: u32, group_id: u32, instance_id: u32) -> Self {
        Self {
            type_id,
            group_id,
            instance_id,
        }
    }
}

impl fmt::Display for ResourceKey {
    /// Renders the TGI convention used in game log files:
    /// `0xTTTTTTTT, 0xGGGGGGGG, 0xIIIIIIII`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08X}, 0x{:08X}, 0x{:08X}",
            self.type_id, self.group_id, self.instance_id
        )
    }
}
