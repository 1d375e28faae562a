//! GPIO button input with async debouncing.
//!
//! Four buttons (active-low with internal pull-up), see `camtrig::config`
//! for the pin map. Each one runs its own loop that waits for a GPIO edge,
//! debounces it and sends a [`ButtonEvent`] to the remote task.

use camtrig::config::BUTTON_DEBOUNCE_MS;
use defmt::info;
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::{Duration, Timer};

use crate::platform::ButtonSender;

/// Physical button events (after debouncing).
#[derive(Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ButtonEvent {
    /// Connect to the remembered camera, or scan when none is known;
    /// disconnects while a link is up. Lengthens the interval in interval
    /// mode while shooting is stopped.
    Select,
    /// Pair with the camera found by the last scan. Shortens the interval
    /// in interval mode while shooting is stopped.
    Pair,
    /// Fire the shutter, or start/stop interval shooting.
    Shutter,
    /// Toggle interval mode.
    Mode,
}

/// Wait for a press, debounce, send the event, then wait for release.
pub async fn button_task(pin: AnyPin, event: ButtonEvent, tx: ButtonSender) -> ! {
    let mut btn = Input::new(pin, Pull::Up);

    loop {
        btn.wait_for_falling_edge().await;
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        if btn.is_low() {
            info!("Button: {}", event);
            tx.send(event).await;

            btn.wait_for_rising_edge().await;
            Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        }
    }
}
