pub mod maths_utils;
pub mod time_utils;

pub use maths_utils::ToleranceBand;
pub use time_utils::TimeUtils;
