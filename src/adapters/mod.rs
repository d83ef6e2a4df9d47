//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements       | Connects to                    |
//! |---------------|------------------|--------------------------------|
//! | `bluedroid`   | GattStack        | ESP-IDF Bluedroid GATT / GAP   |
//! | `light_state` | DeviceStatePort  | LEDC light driver + NVS record |
//! | `log_sink`    | EventSink        | Serial log output              |
//! | `nvs`         | StoragePort      | NVS / in-memory store          |
//! | `time`        | —                | ESP32 system timer             |

pub mod bluedroid;
pub mod light_state;
pub mod log_sink;
pub mod nvs;
pub mod time;
