pub mod error;
pub mod intrinsics;
pub mod level0;

pub use error::SynthError;
pub use level0::L0Core;

/// the template format version every synthesized stack declares.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// cloudformation limits logical ids to this many characters.
pub const MAX_LOGICAL_ID_LEN: usize = 255;
