//! LightGatt firmware — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  BluedroidStack   LightStateAdapter   NvsAdapter  LogEventSink│
//! │  (GattStack)      (DeviceStatePort)   (Storage)   (EventSink) │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │               GattServer (pure logic)                  │  │
//! │  │  registry · builder · advertising · connections        │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  BTC task: stack callbacks → Dispatcher                      │
//! │  Main task: button poll → light toggle → NVS flush           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use esp_idf_hal::delay::FreeRtos;
use log::{info, warn};

use lightgatt::adapters::bluedroid::{self, BluedroidStack, Dispatcher};
use lightgatt::adapters::light_state::LightStateAdapter;
use lightgatt::adapters::log_sink::LogEventSink;
use lightgatt::adapters::nvs::NvsAdapter;
use lightgatt::adapters::time::Esp32TimeAdapter;
use lightgatt::app::service::GattServer;
use lightgatt::config::ServerConfig;
use lightgatt::drivers::button::{ButtonDriver, ButtonEvent};
use lightgatt::drivers::hw_init;
use lightgatt::drivers::light::LightDriver;
use lightgatt::error::Error;
use lightgatt::pins;

const POLL_INTERVAL_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("LightGatt v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Storage (the BT controller needs NVS too) ──────────
    let nvs = NvsAdapter::new().map_err(Error::from)?;

    // ── 3. Peripherals and light boot state ───────────────────
    hw_init::init_peripherals()?;
    let light = LightStateAdapter::new(LightDriver::new(), nvs);
    light.apply_boot_state().map_err(Error::from)?;

    // ── 4. GATT server ────────────────────────────────────────
    let server = GattServer::new(ServerConfig::default())?;
    bluedroid::install(Dispatcher {
        server,
        device: light.clone(),
        sink: LogEventSink::new(),
    });

    // Start under the dispatcher lock so early REG events queue behind it.
    bluedroid::with_dispatcher(|d| d.server.start(&mut BluedroidStack, &mut d.sink))
        .ok_or_else(|| anyhow!("GATT dispatcher unavailable"))??;

    // ── 5. Button ─────────────────────────────────────────────
    hw_init::init_isr_service()?;
    let mut button = ButtonDriver::new(pins::BUTTON_GPIO);
    let time = Esp32TimeAdapter::new();

    info!("System ready. Entering button loop.");

    loop {
        if let Some(ButtonEvent::ShortPress) = button.tick(time.uptime_ms()) {
            match light.toggle() {
                Ok(on) => info!("BUTTON: light {}", if on { "on" } else { "off" }),
                Err(e) => warn!("BUTTON: toggle failed: {e}"),
            }
        }
        // BLE writes only mark the state dirty; flash commits happen here.
        if let Some(on) = light.flush() {
            info!("LIGHT: saved {}", if on { "on" } else { "off" });
        }
        FreeRtos::delay_ms(POLL_INTERVAL_MS);
    }
}
