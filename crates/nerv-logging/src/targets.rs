//! Tracing targets that get their own log file.

pub const T_CALENDAR: &str = "nerv::calendar";
pub const T_NOTION: &str = "nerv::notion";
pub const T_EARTHVIEW: &str = "nerv::earthview";
pub const T_PANEL: &str = "nerv::panel";

pub const FEED_TARGETS: [&str; 3] = [T_CALENDAR, T_NOTION, T_EARTHVIEW];
