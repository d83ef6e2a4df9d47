//! GATT server core.
//!
//! Hardware-agnostic state machines for stack bring-up, advertising,
//! profile construction, event routing, connection tracking and the
//! characteristic I/O bridge.  All stack access goes through the
//! [`GattStack`](crate::app::ports::GattStack) port.
//!
//! ```text
//!   StackEvent ──▶ router ──▶ builder / connection / bridge
//!                     │
//!   GapEvent ─────────┴────▶ advertising / connection
//! ```

pub mod advertising;
pub mod bridge;
pub mod builder;
pub mod connection;
pub mod event;
pub mod profile;
pub mod router;
pub mod stack;
pub mod types;
