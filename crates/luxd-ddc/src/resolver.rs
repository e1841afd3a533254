//! Device identity resolution
//!
//! Matches a display handle to the physical control channel serving it by
//! comparing EDID identity blocks. Successful resolutions are cached for the
//! process lifetime; failures are retried on the next call. Cache entries
//! for departed displays are dropped through `retain_present`, so a
//! removed-then-reattached display re-resolves instead of reusing a stale
//! handle.

use crate::DdcError;
use luxd_hal::{ChannelSource, DisplayId, I2cBus, identity_matches};
use std::collections::HashMap;

pub struct ChannelResolver {
    source: Box<dyn ChannelSource>,
    cache: HashMap<DisplayId, Box<dyn I2cBus>>,
}

impl ChannelResolver {
    pub fn new(source: Box<dyn ChannelSource>) -> Self {
        Self {
            source,
            cache: HashMap::new(),
        }
    }

    /// Resolve the control channel for `display`, whose own identity block
    /// (if any) is `identity`.
    ///
    /// When the identity is unavailable or nothing matches, falls back to
    /// the first channel on the bus. That is only correct with a single
    /// external display; with several it is ambiguous, which is why the
    /// fallback is logged as a degraded mode rather than silently taken.
    pub fn resolve(
        &mut self,
        display: DisplayId,
        identity: Option<&[u8]>,
    ) -> Result<&mut (dyn I2cBus + '_), DdcError> {
        if !self.cache.contains_key(&display) {
            let bus = self.lookup(display, identity)?;
            let display_id = display;
            tracing::debug!("Resolved channel {} for display {}", bus.name(), display_id);
            self.cache.insert(display, bus);
        }

        match self.cache.get_mut(&display) {
            Some(b) => Ok(b.as_mut()),
            None => Err(DdcError::NotFound(display)),
        }
    }

    fn lookup(
        &mut self,
        display: DisplayId,
        identity: Option<&[u8]>,
    ) -> Result<Box<dyn I2cBus>, DdcError> {
        let mut candidates = self.source.scan()?;
        if candidates.is_empty() {
            return Err(DdcError::NotFound(display));
        }

        let display_id = display;
        if let Some(identity) = identity {
            let matched = candidates.iter().position(|c| {
                c.edid
                    .as_deref()
                    .map(|edid| identity_matches(identity, edid))
                    .unwrap_or(false)
            });
            if let Some(idx) = matched {
                return Ok(candidates.swap_remove(idx).bus);
            }
            tracing::warn!(
                "No channel identity matches display {}, falling back to first of {} \
                 (ambiguous with multiple external displays)",
                display_id,
                candidates.len()
            );
        } else {
            tracing::warn!(
                "Display {} has no identity block, falling back to first available channel",
                display_id
            );
        }

        Ok(candidates.remove(0).bus)
    }

    /// Drop cached channels for any display not in the latest enumeration.
    pub fn retain_present(&mut self, present: &[DisplayId]) {
        let before = self.cache.len();
        self.cache.retain(|id, _| present.contains(id));
        let dropped = before - self.cache.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} stale channel cache entr(ies)", dropped);
        }
    }

    /// Drop one display's cached channel.
    pub fn invalidate(&mut self, display: DisplayId) {
        self.cache.remove(&display);
    }

    pub fn is_cached(&self, display: DisplayId) -> bool {
        self.cache.contains_key(&display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luxd_hal::mock::{MockChannelSource, MockHardware};

    fn edid(tag: u8) -> Vec<u8> {
        vec![tag; 128]
    }

    #[test]
    fn test_resolve_matches_identity() {
        let state = MockHardware::shared();
        let source = MockChannelSource::new(state)
            .with_channel("i2c-3", Some(edid(0x11)))
            .with_channel("i2c-5", Some(edid(0x22)));

        let mut resolver = ChannelResolver::new(Box::new(source));
        let bus = resolver.resolve(1, Some(&edid(0x22))).unwrap();
        assert_eq!(bus.name(), "i2c-5");
    }

    #[test]
    fn test_resolve_extension_bytes_ignored() {
        let state = MockHardware::shared();
        // Channel identity extends past the base block
        let mut long_edid = edid(0x33);
        long_edid.extend_from_slice(&[0xFF; 64]);

        let source =
            MockChannelSource::new(state).with_channel("i2c-4", Some(long_edid));
        let mut resolver = ChannelResolver::new(Box::new(source));

        assert!(resolver.resolve(9, Some(&edid(0x33))).is_ok());
    }

    #[test]
    fn test_resolve_fallback_without_identity() {
        let state = MockHardware::shared();
        let source = MockChannelSource::new(state)
            .with_channel("i2c-0", Some(edid(0x11)))
            .with_channel("i2c-1", Some(edid(0x22)));

        let mut resolver = ChannelResolver::new(Box::new(source));
        let bus = resolver.resolve(2, None).unwrap();
        assert_eq!(bus.name(), "i2c-0");
    }

    #[test]
    fn test_resolve_fallback_on_mismatch() {
        let state = MockHardware::shared();
        let source = MockChannelSource::new(state).with_channel("i2c-0", Some(edid(0x11)));

        let mut resolver = ChannelResolver::new(Box::new(source));
        let bus = resolver.resolve(3, Some(&edid(0x99))).unwrap();
        assert_eq!(bus.name(), "i2c-0");
    }

    #[test]
    fn test_resolve_no_channels() {
        let state = MockHardware::shared();
        let source = MockChannelSource::new(state);

        let mut resolver = ChannelResolver::new(Box::new(source));
        assert!(matches!(
            resolver.resolve(4, None),
            Err(DdcError::NotFound(4))
        ));
        // Failures are not cached and get retried
        assert!(!resolver.is_cached(4));
    }

    #[test]
    fn test_successful_resolution_is_cached() {
        let state = MockHardware::shared();
        let source = MockChannelSource::new(state).with_channel("i2c-0", Some(edid(0x11)));

        let mut resolver = ChannelResolver::new(Box::new(source));
        resolver.resolve(5, Some(&edid(0x11))).unwrap();
        assert!(resolver.is_cached(5));

        // Second resolve hits the cache even with a now-unmatchable identity
        assert!(resolver.resolve(5, Some(&edid(0x77))).is_ok());
    }

    #[test]
    fn test_retain_present_drops_departed() {
        let state = MockHardware::shared();
        let source = MockChannelSource::new(state)
            .with_channel("i2c-0", Some(edid(0x11)))
            .with_channel("i2c-1", Some(edid(0x22)));

        let mut resolver = ChannelResolver::new(Box::new(source));
        resolver.resolve(1, Some(&edid(0x11))).unwrap();
        resolver.resolve(2, Some(&edid(0x22))).unwrap();

        resolver.retain_present(&[2]);
        assert!(!resolver.is_cached(1));
        assert!(resolver.is_cached(2));

        resolver.invalidate(2);
        assert!(!resolver.is_cached(2));
    }
}
