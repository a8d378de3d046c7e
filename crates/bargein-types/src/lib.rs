//now people using the types library can use these types
pub mod audio;
pub mod events;
pub mod ids;
pub mod status;

//re-export types for easier access
pub use audio::Base64EncodedAudioBytes;
pub use events::{ClientEvent, ServerEvent};
pub use ids::{ChannelId, ResponseId, SessionId};
pub use status::{PauseReason, Status};
