//! Shared textures and the arena that hands out draw-batch texture slots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;

use crate::raster::Image;
use crate::uri::Uri;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique texture identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

/// An image ready to be bound by a draw batch.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    image: Arc<Image>,
    source: Option<Uri>,
}

impl Texture {
    /// Wraps an image that was not loaded from a URI.
    pub fn new(image: Image) -> Self {
        Self::from_shared(Arc::new(image), None)
    }

    /// Wraps an image loaded from `source`.
    pub fn from_source(image: Image, source: Uri) -> Self {
        Self::from_shared(Arc::new(image), Some(source))
    }

    fn from_shared(image: Arc<Image>, source: Option<Uri>) -> Self {
        Self {
            id: TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed)),
            image,
            source,
        }
    }

    /// This texture's identity.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// The texel data.
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Where the image was loaded from, if known.
    pub fn source(&self) -> Option<&Uri> {
        self.source.as_ref()
    }
}

/// Index of a texture inside a [`TextureArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureSlot(pub u32);

/// Bindless-style texture table shared by every draw batch.
///
/// The arena holds textures weakly: a slot stays valid while some resident
/// asset owns the texture, and [`purge`](Self::purge) reclaims slots whose
/// textures were dropped so they can be reused.
#[derive(Debug, Default)]
pub struct TextureArena {
    slots: Vec<Option<Weak<Texture>>>,
    by_id: FxHashMap<TextureId, TextureSlot>,
    free: Vec<TextureSlot>,
}

impl TextureArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot for `texture`, assigning one on first sight.
    pub fn add(&mut self, texture: &Arc<Texture>) -> TextureSlot {
        if let Some(slot) = self.by_id.get(&texture.id()) {
            return *slot;
        }

        let weak = Some(Arc::downgrade(texture));
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot.0 as usize] = weak;
                slot
            }
            None => {
                self.slots.push(weak);
                TextureSlot(self.slots.len() as u32 - 1)
            }
        };
        self.by_id.insert(texture.id(), slot);
        slot
    }

    /// The live texture in `slot`, if any.
    pub fn get(&self, slot: TextureSlot) -> Option<Arc<Texture>> {
        self.slots
            .get(slot.0 as usize)
            .and_then(|entry| entry.as_ref())
            .and_then(Weak::upgrade)
    }

    /// Releases slots whose textures no longer exist. Returns how many were freed.
    pub fn purge(&mut self) -> usize {
        let mut freed = 0;
        for (index, entry) in self.slots.iter_mut().enumerate() {
            let dead = entry.as_ref().is_some_and(|weak| weak.strong_count() == 0);
            if dead {
                *entry = None;
                self.free.push(TextureSlot(index as u32));
                freed += 1;
            }
        }
        if freed > 0 {
            self.by_id.retain(|_, slot| self.slots[slot.0 as usize].is_some());
            log::debug!("Released {freed} texture slots");
        }
        freed
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelFormat;

    fn texture() -> Arc<Texture> {
        Arc::new(Texture::new(Image::filled(1, 1, PixelFormat::R8, &[0])))
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(texture().id(), texture().id());
    }

    #[test]
    fn test_same_texture_shares_a_slot() {
        let mut arena = TextureArena::new();
        let tex = texture();
        let a = arena.add(&tex);
        let b = arena.add(&tex);
        assert_eq!(a, b);
        assert_eq!(arena.len(), 1);
        assert!(Arc::ptr_eq(&arena.get(a).unwrap(), &tex));
    }

    #[test]
    fn test_purge_reclaims_dropped_textures() {
        let mut arena = TextureArena::new();
        let kept = texture();
        let dropped = texture();
        arena.add(&kept);
        let freed_slot = arena.add(&dropped);
        drop(dropped);

        assert_eq!(arena.purge(), 1);
        assert_eq!(arena.len(), 1);
        assert!(arena.get(freed_slot).is_none());

        let reused = arena.add(&texture());
        assert_eq!(reused, freed_slot);
    }

    #[test]
    fn test_purge_without_dead_textures_is_noop() {
        let mut arena = TextureArena::new();
        let tex = texture();
        arena.add(&tex);
        assert_eq!(arena.purge(), 0);
        assert_eq!(arena.len(), 1);
    }
}
