mod client;
pub mod playback;
pub mod suppression;

pub use bargein_types as types;
pub use client::{Client, ClientTx, Config, ConfigBuilder, ServerRx, connect, connect_with_config};
pub use playback::{Played, PlaybackSurface};
pub use suppression::SuppressionTimer;
