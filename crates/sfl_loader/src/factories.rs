//! The stock resource-factory table.

/// The (type ID, instance ID) pairs the game registers with its resource
/// manager after all segments are loaded. No factory object is attached —
/// the host supplies default handling for each.
pub const DEFAULT_RESOURCE_FACTORIES: [(u32, u32); 15] = [
    (0x0A63DF8C, 0xCA63E2A3),
    (0x00436EB4, 0x2026960B),
    (0xC8696797, 0x686AA4B0),
    (0xA2FFB5D3, 0x856DDBAC),
    (0x3AB50E2A, 0x7AB50E44),
    (0x3AB50E2A, 0x7AB50E45),
    (0x69B6F01C, 0x29A5D1EC),
    (0x69B6F01C, 0x09ADCD75),
    (0xFAD0F0B6, 0x5AD0E817),
    (0x453429B3, 0x6534284A),
    (0x053429C8, 0x05342861),
    (0xA83479EA, 0xA83479D3),
    (0x496678FE, 0x296678F7),
    (0xEA5118B5, 0xEA5118B0),
    (0x42E411C2, 0xA2E3D533),
];
