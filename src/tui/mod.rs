pub mod commands;
pub mod completion;
pub mod event_handlers;
pub mod rendering;
pub mod state;
pub mod tag_selector;
pub mod theme;
pub mod view;

pub use view::TuiApp;
