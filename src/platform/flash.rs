//! Paired-camera persistence in internal flash via `sequential-storage`.
//!
//! The whole [`CameraStore`] is one map item; its encoding lives in the
//! library (`camtrig::storage`).

use camtrig::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use camtrig::storage::{CameraStore, MAX_ENCODED_LEN};
use defmt::{debug, error, info};
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};

/// nRF52840 flash page size.
const PAGE_SIZE: u32 = 4096;

const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * PAGE_SIZE;
const STORAGE_END: u32 = STORAGE_START + STORAGE_FLASH_PAGE_COUNT * PAGE_SIZE;

/// Map key of the paired-camera list.
const KEY_PAIRED_CAMERAS: u8 = 0x01;

/// Item plus `sequential-storage` bookkeeping, rounded up to a word.
const ITEM_BUF_LEN: usize = (MAX_ENCODED_LEN + 16 + 3) & !3;

/// Load the remembered cameras. Read errors yield an empty store.
pub async fn load(flash: &mut impl NorFlash) -> CameraStore {
    let mut buf = [0u8; ITEM_BUF_LEN];

    match fetch_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut NoCache::new(),
        &mut buf,
        &KEY_PAIRED_CAMERAS,
    )
    .await
    {
        Ok(Some(data)) => {
            let store = CameraStore::decode(data);
            info!("Loaded {} cameras from flash", store.len());
            store
        }
        Ok(None) => {
            info!("No paired cameras in flash");
            CameraStore::new()
        }
        Err(e) => {
            error!("Flash read error: {:?}", defmt::Debug2Format(&e));
            CameraStore::new()
        }
    }
}

/// Persist the store if it changed since the last load or save.
pub async fn save(flash: &mut impl NorFlash, store: &mut CameraStore) {
    if !store.is_dirty() {
        debug!("CameraStore: no changes to save");
        return;
    }

    let mut data = [0u8; MAX_ENCODED_LEN];
    let len = store.encode(&mut data);
    let item: &[u8] = &data[..len];
    let mut buf = [0u8; ITEM_BUF_LEN];

    match store_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut NoCache::new(),
        &mut buf,
        &KEY_PAIRED_CAMERAS,
        &item,
    )
    .await
    {
        Ok(()) => {
            info!("Saved {} cameras to flash", store.len());
            store.mark_clean();
        }
        Err(e) => {
            error!("Flash write error: {:?}", defmt::Debug2Format(&e));
        }
    }
}
