pub mod events;
pub mod hub;
pub mod relay;

pub use events::{ClientEvent, ModeChange, ServerEvent, SessionNotice};
pub use hub::{MessageSender, RoomMessageHub, Subscriber};
pub use relay::BroadcastRelay;
