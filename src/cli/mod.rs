pub mod ascii_preview;
pub mod render;
pub mod shell;
pub mod terminal;

pub use ascii_preview::{AsciiRenderer, FaceOverlay};
pub use shell::{run_admin, run_live, ShellOptions};
pub use terminal::TerminalUi;
