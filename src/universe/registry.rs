use rand::Rng;
use std::collections::HashMap;

use super::{AddressConstellation, BlockStar};
use crate::feed::{AddressStats, BlockRecord};
use crate::scene::Scene;

/// Position of a star in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StarId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// Height was already registered; nothing changed.
    Existing(StarId),
    Created(StarId),
}

impl Upsert {
    pub fn id(&self) -> StarId {
        match self {
            Upsert::Existing(id) | Upsert::Created(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Upsert::Created(_))
    }
}

/// What exists in the universe: one star per height, plus at most one
/// address constellation.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    stars: Vec<BlockStar>,
    by_height: HashMap<u64, StarId>,
    constellation: Option<AddressConstellation>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_by_height(&self, height: u64) -> Option<&BlockStar> {
        self.by_height.get(&height).map(|id| &self.stars[id.0])
    }

    pub fn get(&self, id: StarId) -> Option<&BlockStar> {
        self.stars.get(id.0)
    }

    pub fn contains(&self, height: u64) -> bool {
        self.by_height.contains_key(&height)
    }

    /// Register `block` unless its height is already known. A known height
    /// returns the existing star untouched.
    pub fn upsert<R: Rng>(
        &mut self,
        block: &BlockRecord,
        max_satellites: usize,
        scene: &mut Scene,
        rng: &mut R,
    ) -> Upsert {
        if let Some(id) = self.by_height.get(&block.height) {
            return Upsert::Existing(*id);
        }

        let mut star = BlockStar::spawn(block, scene);
        if !block.tx_list.is_empty() {
            star.attach_satellites(&block.tx_list, max_satellites, scene, rng);
        }

        let id = StarId(self.stars.len());
        self.stars.push(star);
        self.by_height.insert(block.height, id);
        Upsert::Created(id)
    }

    /// Stars in registration order.
    pub fn all(&self) -> &[BlockStar] {
        &self.stars
    }

    pub(crate) fn all_mut(&mut self) -> &mut [BlockStar] {
        &mut self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Highest known height.
    pub fn frontier(&self) -> Option<u64> {
        self.by_height.keys().copied().max()
    }

    pub fn constellation(&self) -> Option<&AddressConstellation> {
        self.constellation.as_ref()
    }

    /// Dispose the live constellation (if any), then build and register the
    /// one for `address`.
    pub fn replace_constellation(
        &mut self,
        address: &str,
        stats: AddressStats,
        scene: &mut Scene,
    ) -> &AddressConstellation {
        if let Some(previous) = self.constellation.take() {
            previous.dispose(scene);
        }
        self.constellation
            .insert(AddressConstellation::build(address, stats, scene))
    }

    /// Drop every star and constellation. Scene nodes are the caller's to clear.
    pub fn clear(&mut self) {
        self.stars.clear();
        self.by_height.clear();
        self.constellation = None;
    }
}
