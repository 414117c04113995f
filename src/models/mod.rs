pub mod document;
pub mod enums;
pub mod request;
pub mod response;

pub use document::*;
pub use enums::*;
pub use request::*;
pub use response::*;
