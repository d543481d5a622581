//! Shared code between server and client
//!
//! The hand-authoritative interaction core lives here so it can be tested
//! without a window or a network: hand resolution, grab state, look
//! arbitration, the cart probe and beam anchor smoothing.

pub mod aim;
pub mod components;
pub mod grab;
pub mod hand;
pub mod math;
pub mod player;
pub mod probe;
pub mod protocol;
pub mod settings;
pub mod smoothing;

pub use aim::{AimArbiter, AimRequest, HeadSample, SoftAimRequest};
pub use components::*;
pub use grab::{GrabCapable, GrabState, Inventory, OVERRIDE_GRACE_SECS};
pub use hand::{HandReferenceResolver, HandSource, PeerHands, PlayerHandle};
pub use probe::{CartGrabProbe, GrabStartHook, ProbeOutcome, SceneQuery};
pub use protocol::{ProtocolPlugin, FIXED_TIMESTEP_HZ, PROTOCOL_ID, SERVER_ADDR, SERVER_PORT};
pub use settings::InteractionSettings;
pub use smoothing::AnchorSmoothing;
