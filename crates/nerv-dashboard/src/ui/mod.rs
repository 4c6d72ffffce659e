pub mod draw;
pub mod layout;

pub use draw::Font;
pub use layout::{ellipsize, wrap_text, PageLayout};
