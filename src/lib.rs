// Editing core shared by the CLI and the GUI
pub mod capture;
pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod input;
pub mod ops;
pub mod session;

pub use capture::{FrameSource, Webcam};
pub use channel::Channel;
pub use config::Settings;
pub use dispatch::{Editor, Frame, TaskHandle};
pub use error::EditError;
pub use input::{Edit, Region};
pub use ops::is_image_file;
pub use session::Session;
