//! nRF52840 bindings for the firmware binary.
//!
//! Tasks communicate via Embassy channels declared here:
//!
//! - remote task → driver: [`Request`]s issued by the engine's stack
//! - driver → remote task: [`StackEvent`]s, in emission order
//! - button tasks → remote task: [`ButtonEvent`]s

pub mod buttons;
pub mod flash;
pub mod security;
pub mod softdevice;
pub mod ui;

pub use buttons::ButtonEvent;
pub use softdevice::{Request, SoftdeviceStack};

use camtrig::StackEvent;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};

pub const REQUEST_QUEUE_DEPTH: usize = 8;
/// Scan results arrive in bursts; keep room for a full discovery list.
pub const EVENT_QUEUE_DEPTH: usize = 16;
pub const BUTTON_QUEUE_DEPTH: usize = 4;

pub static STACK_REQUESTS: Channel<CriticalSectionRawMutex, Request, REQUEST_QUEUE_DEPTH> =
    Channel::new();
pub static STACK_EVENTS: Channel<CriticalSectionRawMutex, StackEvent, EVENT_QUEUE_DEPTH> =
    Channel::new();
pub static BUTTONS: Channel<CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE_DEPTH> =
    Channel::new();

pub type ButtonSender = Sender<'static, CriticalSectionRawMutex, ButtonEvent, BUTTON_QUEUE_DEPTH>;
