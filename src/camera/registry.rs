//! Service and characteristic handle table for the active connection.
//!
//! Services are recorded while the transport is discovering; the
//! characteristic handles are resolved once, when discovery completes.
//! A handle of zero means "not resolved".

use crate::ble::stack::{BleStack, CharacteristicElem};
use crate::ble::{HandleRange, TransportAdapter, Uuid};
use crate::camera::{CameraProfile, CharacteristicId, ServiceId};
use crate::config::GATT_MAX_CHARACTERISTICS;
use crate::error::{DiscoveryError, Error};
use heapless::Vec;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registry {
    services: [Option<HandleRange>; 2],
    handles: [u16; CharacteristicId::COUNT],
    resolved: bool,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            services: [None; 2],
            handles: [0; CharacteristicId::COUNT],
            resolved: false,
        }
    }

    /// Record a discovered service if it is one of ours.
    ///
    /// A second report for the same service replaces the earlier range.
    pub fn record_service(
        &mut self,
        profile: &CameraProfile,
        uuid: &Uuid,
        range: HandleRange,
    ) -> Option<ServiceId> {
        let service = profile.service_for(uuid)?;
        if let Some(prev) = self.services[service.index()] {
            if prev != range {
                warn!(
                    "{} service reported again: {}..{} replaces {}..{}",
                    service, range.start, range.end, prev.start, prev.end
                );
            }
        }
        info!("{} service at {}..{}", service, range.start, range.end);
        self.services[service.index()] = Some(range);
        Some(service)
    }

    pub fn service_range(&self, service: ServiceId) -> Option<HandleRange> {
        self.services[service.index()]
    }

    /// Resolve every wanted characteristic from the attribute cache.
    ///
    /// Both services must have been recorded. On failure the handle table
    /// is left empty.
    pub fn resolve<S: BleStack>(
        &mut self,
        profile: &CameraProfile,
        transport: &TransportAdapter<S>,
    ) -> Result<(), Error> {
        self.handles = [0; CharacteristicId::COUNT];
        self.resolved = false;

        let result = self.resolve_all(profile, transport);
        if result.is_err() {
            self.handles = [0; CharacteristicId::COUNT];
        } else {
            self.resolved = true;
            info!("Camera characteristics resolved");
        }
        result
    }

    fn resolve_all<S: BleStack>(
        &mut self,
        profile: &CameraProfile,
        transport: &TransportAdapter<S>,
    ) -> Result<(), Error> {
        let mut ranges = [HandleRange::new(0, 0); 2];
        for service in ServiceId::ALL {
            ranges[service.index()] = self.services[service.index()].ok_or_else(|| {
                error!("{} service not found", service);
                DiscoveryError::ServiceMissing(service)
            })?;
        }

        for service in ServiceId::ALL {
            let mut found: Vec<CharacteristicElem, GATT_MAX_CHARACTERISTICS> = Vec::new();
            transport.characteristics(ranges[service.index()], &mut found)?;

            let matched = match_characteristics(profile, service, &found, &mut self.handles);
            let expected = service.characteristics().len() as u8;
            if matched != expected {
                error!(
                    "{} service: {} of {} characteristics found",
                    service, matched, expected
                );
                return Err(DiscoveryError::CharacteristicCount {
                    service,
                    expected,
                    found: matched,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Resolved handle, or `None` while unresolved.
    pub fn handle(&self, id: CharacteristicId) -> Option<u16> {
        match self.handles[id.slot()] {
            0 => None,
            h => Some(h),
        }
    }

    /// The logical characteristic that owns `handle`.
    pub fn characteristic_for_handle(&self, handle: u16) -> Option<CharacteristicId> {
        if handle == 0 {
            return None;
        }
        CharacteristicId::ALL
            .into_iter()
            .find(|id| self.handles[id.slot()] == handle)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Forget everything learned on the current connection.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Match `found` against the wanted characteristics of `service`, writing
/// handles into `handles`. The first match for a slot wins. Returns the
/// number of slots matched.
pub fn match_characteristics(
    profile: &CameraProfile,
    service: ServiceId,
    found: &[CharacteristicElem],
    handles: &mut [u16; CharacteristicId::COUNT],
) -> u8 {
    let mut matched = 0u8;
    for elem in found {
        if !elem.uuid.is_128() {
            warn!("Skipping 16-bit characteristic {} at {}", elem.uuid, elem.handle);
            continue;
        }
        for &id in service.characteristics() {
            if profile.characteristic_uuid(id) != elem.uuid {
                continue;
            }
            let slot = &mut handles[id.slot()];
            if *slot == 0 {
                debug!("{} -> handle {}", id, elem.handle);
                *slot = elem.handle;
                matched += 1;
            }
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::stack::StackEvent;
    use crate::testing::{ready_adapter, RecordingStack};

    fn elem(uuid: Uuid, handle: u16) -> CharacteristicElem {
        CharacteristicElem {
            uuid,
            handle,
            properties: 0,
        }
    }

    fn profile() -> CameraProfile {
        CameraProfile::default()
    }

    #[test]
    fn records_only_known_services() {
        let p = profile();
        let mut reg = Registry::new();
        assert_eq!(
            reg.record_service(&p, &p.pair_service, HandleRange::new(1, 9)),
            Some(ServiceId::Pair)
        );
        assert_eq!(
            reg.record_service(&p, &Uuid::from_u128(42), HandleRange::new(10, 20)),
            None
        );
        assert_eq!(reg.service_range(ServiceId::Pair), Some(HandleRange::new(1, 9)));
        assert_eq!(reg.service_range(ServiceId::Trigger), None);
    }

    #[test]
    fn duplicate_service_report_overwrites_range() {
        let p = profile();
        let mut reg = Registry::new();
        reg.record_service(&p, &p.trigger_service, HandleRange::new(10, 20));
        reg.record_service(&p, &p.trigger_service, HandleRange::new(30, 40));
        assert_eq!(
            reg.service_range(ServiceId::Trigger),
            Some(HandleRange::new(30, 40))
        );
    }

    #[test]
    fn match_is_independent_of_order() {
        let p = profile();
        let forward = [
            elem(p.trigger, 0x31),
            elem(p.trigger_notify, 0x33),
            elem(p.trigger_config, 0x36),
        ];
        let mut reversed = forward;
        reversed.reverse();

        let mut a = [0u16; CharacteristicId::COUNT];
        let mut b = [0u16; CharacteristicId::COUNT];
        assert_eq!(match_characteristics(&p, ServiceId::Trigger, &forward, &mut a), 3);
        assert_eq!(match_characteristics(&p, ServiceId::Trigger, &reversed, &mut b), 3);
        assert_eq!(a, b);
        assert_eq!(a[CharacteristicId::TriggerNotify.slot()], 0x33);
    }

    #[test]
    fn duplicate_uuid_keeps_first_match() {
        let p = profile();
        let found = [
            elem(p.pair_command, 0x03),
            elem(p.pair_command, 0x07),
            elem(p.pair_data, 0x05),
        ];
        let mut handles = [0u16; CharacteristicId::COUNT];
        assert_eq!(match_characteristics(&p, ServiceId::Pair, &found, &mut handles), 2);
        assert_eq!(handles[CharacteristicId::PairCommand.slot()], 0x03);
        assert_eq!(handles[CharacteristicId::PairData.slot()], 0x05);
    }

    #[test]
    fn unrelated_and_short_uuids_are_skipped() {
        let p = profile();
        let found = [
            elem(Uuid::Uuid16(0x2a00), 0x02),
            elem(Uuid::from_u128(7), 0x04),
            elem(p.pair_data, 0x05),
        ];
        let mut handles = [0u16; CharacteristicId::COUNT];
        assert_eq!(match_characteristics(&p, ServiceId::Pair, &found, &mut handles), 1);
        // Characteristics of the other service are not matched here.
        assert_eq!(
            match_characteristics(&p, ServiceId::Trigger, &found, &mut handles),
            0
        );
    }

    #[test]
    fn resolve_fills_handle_table() {
        let p = profile();
        let adapter = ready_adapter(RecordingStack::with_camera(&p));
        let mut reg = Registry::new();
        reg.record_service(&p, &p.pair_service, RecordingStack::PAIR_RANGE);
        reg.record_service(&p, &p.trigger_service, RecordingStack::TRIGGER_RANGE);

        reg.resolve(&p, &adapter).unwrap();
        assert!(reg.is_resolved());
        for id in CharacteristicId::ALL {
            let handle = reg.handle(id).unwrap();
            assert_eq!(reg.characteristic_for_handle(handle), Some(id));
        }
        assert_eq!(reg.characteristic_for_handle(0), None);
    }

    #[test]
    fn resolve_requires_both_services() {
        let p = profile();
        let adapter = ready_adapter(RecordingStack::with_camera(&p));
        let mut reg = Registry::new();
        reg.record_service(&p, &p.pair_service, RecordingStack::PAIR_RANGE);

        assert_eq!(
            reg.resolve(&p, &adapter),
            Err(Error::Discovery(DiscoveryError::ServiceMissing(
                ServiceId::Trigger
            )))
        );
        assert!(!reg.is_resolved());
        assert_eq!(reg.handle(CharacteristicId::PairCommand), None);
    }

    #[test]
    fn resolve_fails_on_missing_characteristic() {
        let p = profile();
        let mut stack = RecordingStack::with_camera(&p);
        stack.remove_characteristic(&p.trigger_config);
        let adapter = ready_adapter(stack);
        let mut reg = Registry::new();
        reg.record_service(&p, &p.pair_service, RecordingStack::PAIR_RANGE);
        reg.record_service(&p, &p.trigger_service, RecordingStack::TRIGGER_RANGE);

        assert_eq!(
            reg.resolve(&p, &adapter),
            Err(Error::Discovery(DiscoveryError::CharacteristicCount {
                service: ServiceId::Trigger,
                expected: 3,
                found: 2,
            }))
        );
        // Pair handles were found first but are not kept.
        assert_eq!(reg.handle(CharacteristicId::PairCommand), None);
    }

    #[test]
    fn clear_forgets_everything() {
        let p = profile();
        let mut adapter = ready_adapter(RecordingStack::with_camera(&p));
        let mut reg = Registry::new();
        reg.record_service(&p, &p.pair_service, RecordingStack::PAIR_RANGE);
        reg.record_service(&p, &p.trigger_service, RecordingStack::TRIGGER_RANGE);
        reg.resolve(&p, &adapter).unwrap();

        adapter.handle_event(&StackEvent::Disconnected { reason: 0x08 });
        reg.clear();
        assert_eq!(reg, Registry::new());
    }
}
