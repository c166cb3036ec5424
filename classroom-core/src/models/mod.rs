pub mod id;
pub mod image;
pub mod message;
pub mod session;

pub use id::{ConnectionId, SessionId};
pub use image::{ImageEditRequest, ImageModel, UploadedFile};
pub use message::{BroadcastMessage, MessageType};
pub use session::{Role, Session, SessionMode};
