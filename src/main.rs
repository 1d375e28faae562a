//! camtrig - BLE remote shutter for Canon cameras.
//!
//! Firmware entry point. Brings up the SoftDevice and spawns:
//!
//! - `softdevice_task` - SoftDevice event pump
//! - `driver` - executes stack requests against the SoftDevice
//! - `button` ×4 - debounced button input
//! - `remote_task` - owns the protocol engine, the interval shooter and
//!   the paired-camera store

#![no_std]
#![no_main]

mod platform;

use camtrig::ble::{LinkState, RadioConfig, SecurityParams};
use camtrig::camera::{CameraRemote, EngineConfig, IntervalShooter};
use camtrig::config::BLE_LOCAL_MTU;
use camtrig::{CameraProfile, PairedCamera};
use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{select4, Either4};
use embassy_nrf::gpio::{AnyPin, Pin as _};
use embassy_nrf::interrupt;
use embassy_time::{Duration, Instant, Ticker, Timer};
use nrf_softdevice::{self as sd, Flash, Softdevice};
use {defmt_rtt as _, panic_probe as _};

use crate::platform::security::{self, Bonder};
use crate::platform::ui::{Intent, Ui};
use crate::platform::{
    buttons, flash, softdevice, ButtonEvent, SoftdeviceStack, BUTTONS, STACK_EVENTS,
    STACK_REQUESTS,
};

type Remote = CameraRemote<SoftdeviceStack, Ui>;

const DEVICE_NAME: &[u8] = b"camtrig";

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("camtrig starting");

    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut c = embassy_nrf::config::Config::default();
    c.gpiote_interrupt_priority = interrupt::Priority::P2;
    c.time_interrupt_priority = interrupt::Priority::P2;
    let p = embassy_nrf::init(c);

    let config = sd::Config {
        clock: Some(sd::raw::nrf_clock_lf_cfg_t {
            source: sd::raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: sd::raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(sd::raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(sd::raw::ble_gatt_conn_cfg_t {
            att_mtu: BLE_LOCAL_MTU,
        }),
        gap_role_count: Some(sd::raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 0,
            central_role_count: 1,
            central_sec_count: 1,
            _bitfield_1: sd::raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(sd::raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: sd::raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                sd::raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    };

    let sd = Softdevice::enable(&config);
    spawner.must_spawn(softdevice_task(sd));

    let flash = Flash::take(sd);
    spawner.must_spawn(driver(sd, security::bonder(SecurityParams::default())));

    spawner.must_spawn(button(p.P0_11.degrade(), ButtonEvent::Select));
    spawner.must_spawn(button(p.P0_12.degrade(), ButtonEvent::Pair));
    spawner.must_spawn(button(p.P0_24.degrade(), ButtonEvent::Shutter));
    spawner.must_spawn(button(p.P0_25.degrade(), ButtonEvent::Mode));

    spawner.must_spawn(remote_task(flash));
}

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn driver(sd: &'static Softdevice, bonder: &'static Bonder) -> ! {
    softdevice::driver_task(sd, bonder, STACK_REQUESTS.receiver(), STACK_EVENTS.sender()).await
}

#[embassy_executor::task(pool_size = 4)]
async fn button(pin: AnyPin, event: ButtonEvent) -> ! {
    buttons::button_task(pin, event, BUTTONS.sender()).await
}

#[embassy_executor::task]
async fn remote_task(mut flash: Flash) -> ! {
    let store = flash::load(&mut flash).await;
    let stack = SoftdeviceStack::new(STACK_REQUESTS.sender());
    let mut remote = CameraRemote::with_config(
        stack,
        Ui::new(store),
        CameraProfile::CANON,
        EngineConfig::default(),
    );
    if let Err(e) = remote.initialize(&RadioConfig::default()) {
        error!("Radio init failed: {}", e);
    }

    let mut shooter = IntervalShooter::new();
    let mut ticker = Ticker::every(Duration::from_secs(1));
    // (step epoch, deadline) of the step in flight.
    let mut step: Option<(u32, Instant)> = None;

    loop {
        step = match remote.pending_timeout_ms() {
            None => None,
            Some(_) if step.is_some_and(|(epoch, _)| epoch == remote.step_epoch()) => step,
            Some(ms) => Some((
                remote.step_epoch(),
                Instant::now() + Duration::from_millis(u64::from(ms)),
            )),
        };
        let timeout = async {
            match step {
                Some((_, deadline)) => Timer::at(deadline).await,
                None => core::future::pending().await,
            }
        };

        let woken = select4(
            STACK_EVENTS.receive(),
            BUTTONS.receive(),
            ticker.next(),
            timeout,
        )
        .await;
        match woken {
            Either4::First(event) => {
                remote.handle(&event);
                after_event(&mut remote, &mut shooter);
            }
            Either4::Second(button) => on_button(&mut remote, &mut shooter, button),
            Either4::Third(()) => {
                if shooter.tick() {
                    info!("Interval exposure");
                    if let Err(e) = remote.trigger() {
                        warn!("Interval trigger skipped: {}", e);
                    }
                }
            }
            Either4::Fourth(()) => {
                warn!("Camera did not answer in time");
                remote.step_timed_out();
            }
        }

        if remote.listener().store.is_dirty() {
            flash::save(&mut flash, &mut remote.listener_mut().store).await;
        }
    }
}

/// Follow-up work the listener asked for while handling an event.
fn after_event(remote: &mut Remote, shooter: &mut IntervalShooter) {
    if let Some(e) = remote.take_error() {
        warn!("Camera reported {}", e);
    }

    if let Some(intent) = remote.listener_mut().take_resolved() {
        let started = match intent {
            Intent::Pair => remote.start_pairing(),
            Intent::Authenticate => remote.connect_authenticated(),
        };
        if let Err(e) = started {
            warn!("Could not start {}: {}", intent, e);
        }
    }

    if !remote.is_ready() && shooter.is_running() {
        info!("Link down - interval shooting stopped");
        shooter.stop();
    }
}

fn on_button(remote: &mut Remote, shooter: &mut IntervalShooter, button: ButtonEvent) {
    // In interval mode, with the shooter idle, SELECT and PAIR set the
    // interval.
    if remote.listener().interval_mode && !shooter.is_running() {
        let up = match button {
            ButtonEvent::Select => Some(true),
            ButtonEvent::Pair => Some(false),
            _ => None,
        };
        if let Some(up) = up {
            info!("Interval {} s", shooter.nudge(up));
            return;
        }
    }

    let result = match button {
        ButtonEvent::Select => match remote.link_state() {
            LinkState::Idle | LinkState::Closed => connect_or_scan(remote),
            _ => remote.disconnect(),
        },
        ButtonEvent::Pair => pair(remote),
        ButtonEvent::Shutter => {
            if remote.listener().interval_mode {
                let running = shooter.toggle();
                info!("Interval shooting {}", if running { "on" } else { "off" });
                Ok(())
            } else if remote.listener().authenticated {
                remote.trigger()
            } else {
                warn!("Shutter not unlocked yet");
                Ok(())
            }
        }
        ButtonEvent::Mode => {
            let ui = remote.listener_mut();
            ui.interval_mode = !ui.interval_mode;
            if !ui.interval_mode {
                shooter.stop();
            }
            info!(
                "Interval mode {} ({} s)",
                if ui.interval_mode { "on" } else { "off" },
                shooter.interval()
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!("{} rejected: {}", button, e);
    }
}

fn connect_or_scan(remote: &mut Remote) -> Result<(), camtrig::Error> {
    let ui = remote.listener_mut();
    match ui.store.most_recent().cloned() {
        Some(camera) => {
            info!("Reconnecting to {}", camera.name.as_str());
            let address = camera.address;
            ui.target = Some(camera);
            ui.intent = Intent::Authenticate;
            remote.connect(address)
        }
        None => {
            ui.found = None;
            remote.start_scan()
        }
    }
}

fn pair(remote: &mut Remote) -> Result<(), camtrig::Error> {
    if remote.is_ready() {
        remote.listener_mut().intent = Intent::Pair;
        return remote.start_pairing();
    }

    let Some(device) = remote.listener().found.clone() else {
        if remote.transport().is_scanning() {
            info!("Still scanning for cameras");
            return Ok(());
        }
        info!("Scanning - press PAIR again once a camera is found");
        remote.listener_mut().found = None;
        return remote.start_scan();
    };
    if remote.transport().is_scanning() {
        remote.stop_scan()?;
    }

    let ui = remote.listener_mut();
    ui.target = Some(PairedCamera::new(device.address, device.name.as_str()));
    ui.intent = Intent::Pair;
    remote.connect(device.address)
}
