//! Minimal collation table. The adapter only ever advertises and accepts
//! one collation, but the handshake packets still carry a collation id.

use hashbrown::HashMap;
use std::sync::OnceLock;

/// `utf8_general_ci`, the collation the server advertises in its handshake.
pub const DEFAULT_COLLATION_ID: u16 = 33;

static COLLATION_NAMES: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();

pub fn collation_names() -> &'static HashMap<&'static str, u16> {
    COLLATION_NAMES.get_or_init(|| {
        HashMap::from([
            ("utf8_general_ci", 33_u16),
            ("utf8mb4_general_ci", 45_u16),
            ("binary", 63_u16),
        ])
    })
}
