#![deny(unsafe_op_in_unsafe_fn)]
//! Read-only data feeds for the desk terminal.
//!
//! Every client here is best-effort: transport or decode failures are logged
//! under the subsystem's tracing target and surface as empty results, never
//! as errors the render loop has to handle.

pub mod cache;
pub mod calendar;
pub mod earthview;
pub mod error;
pub mod http;
pub mod ics;
pub mod notion;
pub mod recurrence;

pub use cache::TtlCache;
pub use calendar::{CalendarClient, CalendarEvent, CalendarSource};
pub use earthview::{Coordinates, EarthViewClient, EarthViewEntry};
pub use error::{FeedError, Result};
pub use http::{HttpTransport, Transport};
pub use notion::{NotionClient, NotionConfig, Todo};
