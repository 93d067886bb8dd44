pub mod deframe;
pub mod json;

pub use deframe::{Deframer, Feed, Frames};
pub use json::{FramingMode, JsonDeframer, MAX_BUFFER_LEN, RawFrame};
