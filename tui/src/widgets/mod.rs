//! Custom widgets for the ActionQ TUI

pub mod frame_view;
pub mod text_block;

pub use frame_view::FrameView;
pub use text_block::TextBlock;
