//! Live scene objects, keyed by POI id.
//!
//! Feed POIs keep their upstream (positive) id. Parts and duplicates get ids
//! from blocks of negative synthetic ids, so they can never collide with the
//! feed. Every object also carries a lineage id, the feed POI it descends
//! from, which is what external activation signals are matched against.

use crate::{
    geo::offset_anchor,
    scene::{NodeFactory, SceneNode},
};
use na::Vector3;
use poitypes::prelude::{GeoAnchor, PoiDefinition, PoiId};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Number of synthetic ids handed out per block
pub const SYNTHETIC_BLOCK_SIZE: i64 = 1_000;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("POI {0} is already in the scene")]
    Duplicate(PoiId),
    #[error("POI {0} is not in the scene")]
    Unknown(PoiId),
    #[error("Synthetic id block starting at {0} is exhausted")]
    BlockExhausted(PoiId),
}

#[derive(Debug, Clone)]
struct SyntheticIds {
    next_block: PoiId,
}

impl SyntheticIds {
    fn allocate_block(&mut self) -> SyntheticBlock {
        let base = self.next_block;
        self.next_block -= SYNTHETIC_BLOCK_SIZE;
        SyntheticBlock {
            base,
            next: base,
            end: base - SYNTHETIC_BLOCK_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
struct SyntheticBlock {
    base: PoiId,
    next: PoiId,
    end: PoiId,
}

impl SyntheticBlock {
    fn next_id(&mut self) -> Result<PoiId, RegistryError> {
        if self.next <= self.end {
            return Err(RegistryError::BlockExhausted(self.base));
        }
        let id = self.next;
        self.next -= 1;
        Ok(id)
    }
}

/// Where the projector last put an object, and where it is heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub current: Vector3<f64>,
    pub target: Vector3<f64>,
    /// Edge-fade scale of the placement wrapper
    pub scale: f64,
    /// Set once a target has been computed for the object
    pub targeted: bool,
    /// Set once the object has been moved to its first target
    pub placed: bool,
    /// Last range decision, so visibility is only toggled on change
    pub in_range: Option<bool>,
}

impl Default for Placement {
    fn default() -> Self {
        Placement {
            current: Vector3::zeros(),
            target: Vector3::zeros(),
            scale: 1.0,
            targeted: false,
            placed: false,
            in_range: None,
        }
    }
}

#[derive(Debug)]
pub struct SceneObject {
    pub id: PoiId,
    pub lineage_id: PoiId,
    pub parent: Option<PoiId>,
    pub children: Vec<PoiId>,
    pub definition: PoiDefinition,
    pub anchor: Option<GeoAnchor>,
    /// Offset from the viewer, or from the parent for parts
    pub relative_offset: Option<Vector3<f64>>,
    pub placement: Placement,
    pub marked_for_deletion: bool,
    node: Box<dyn SceneNode>,
}

impl SceneObject {
    pub fn is_relative(&self) -> bool {
        self.relative_offset.is_some()
    }

    pub fn is_synthetic(&self) -> bool {
        self.id < 0
    }

    pub fn node(&self) -> &dyn SceneNode {
        self.node.as_ref()
    }

    pub fn node_mut(&mut self) -> &mut dyn SceneNode {
        self.node.as_mut()
    }
}

pub struct SceneObjectRegistry {
    objects: BTreeMap<PoiId, SceneObject>,
    factory: Box<dyn NodeFactory>,
    synthetic_ids: SyntheticIds,
    placed: Vec<PoiId>,
    relative: Vec<PoiId>,
    dirty: bool,
}

impl std::fmt::Debug for SceneObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneObjectRegistry")
            .field("objects", &self.objects.len())
            .field("placed", &self.placed)
            .field("relative", &self.relative)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl SceneObjectRegistry {
    pub fn new(factory: Box<dyn NodeFactory>) -> Self {
        SceneObjectRegistry {
            objects: BTreeMap::new(),
            factory,
            synthetic_ids: SyntheticIds { next_block: -1 },
            placed: Vec::new(),
            relative: Vec::new(),
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: PoiId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get(&self, id: PoiId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: PoiId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn node(&self, id: PoiId) -> Option<&dyn SceneNode> {
        self.objects.get(&id).map(|o| o.node())
    }

    pub fn node_mut(&mut self, id: PoiId) -> Option<&mut dyn SceneNode> {
        self.objects.get_mut(&id).map(|o| o.node_mut())
    }

    /// Top-level objects, i.e. everything that is not a part of another object
    pub fn roots(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values().filter(|o| o.parent.is_none())
    }

    /// The object and all of its parts, parents before children
    pub fn subtree(&self, id: PoiId) -> Vec<PoiId> {
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(obj) = self.objects.get(&next) {
                ids.push(next);
                stack.extend(obj.children.iter().rev());
            }
        }
        ids
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Adds a feed POI and all of its parts, returning every id created.
    /// Nothing is left behind when this fails.
    pub fn insert(&mut self, definition: PoiDefinition) -> Result<Vec<PoiId>, RegistryError> {
        if definition.id > 0 && self.objects.contains_key(&definition.id) {
            return Err(RegistryError::Duplicate(definition.id));
        }
        let mut block = self.synthetic_ids.allocate_block();
        let id = if definition.id > 0 {
            definition.id
        } else {
            block.next_id()?
        };
        let mut created = Vec::new();
        if let Err(e) = self.insert_tree(id, id, None, definition, None, &mut block, &mut created) {
            self.roll_back(&created);
            return Err(e);
        }
        Ok(created)
    }

    /// Clones an object under a fresh synthetic id, moved by the given
    /// east/north offset. The clone keeps the source's lineage.
    pub fn duplicate(
        &mut self,
        source: PoiId,
        east: f64,
        north: f64,
    ) -> Result<Vec<PoiId>, RegistryError> {
        let src = self
            .objects
            .get(&source)
            .ok_or(RegistryError::Unknown(source))?;

        let mut definition = src.definition.clone();
        let lineage = src.lineage_id;
        let parent = src.parent;
        let offset = src
            .relative_offset
            .map(|o| o + Vector3::new(east, 0.0, north));
        if offset.is_none() {
            definition.anchor = src.anchor.as_ref().map(|a| offset_anchor(a, east, north));
        }

        let mut block = self.synthetic_ids.allocate_block();
        let id = block.next_id()?;
        let mut created = Vec::new();
        if let Err(e) =
            self.insert_tree(id, lineage, parent, definition, offset, &mut block, &mut created)
        {
            self.roll_back(&created);
            return Err(e);
        }
        if let Some(parent) = parent.and_then(|p| self.objects.get_mut(&p)) {
            parent.children.push(id);
        }

        debug!(source, duplicate = id, lineage, "Duplicated scene object");
        Ok(created)
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_tree(
        &mut self,
        id: PoiId,
        lineage_id: PoiId,
        parent: Option<PoiId>,
        definition: PoiDefinition,
        offset: Option<Vector3<f64>>,
        block: &mut SyntheticBlock,
        created: &mut Vec<PoiId>,
    ) -> Result<(), RegistryError> {
        let relative_offset = match (offset, &definition.relative_location) {
            (Some(o), _) => Some(o),
            (None, Some(location)) => match poidsl::parse_offset(location) {
                Ok((_, v)) => Some(v),
                Err(_) => {
                    warn!(
                        id,
                        location = location.as_str(),
                        "Invalid relative location, placing at the origin"
                    );
                    Some(Vector3::zeros())
                }
            },
            (None, None) if parent.is_some() || definition.anchor.is_none() => {
                Some(Vector3::zeros())
            }
            (None, None) => None,
        };

        let node = self.factory.create_node(id, &definition);
        let parts = definition.parts.clone();
        self.objects.insert(
            id,
            SceneObject {
                id,
                lineage_id,
                parent,
                children: Vec::with_capacity(parts.len()),
                anchor: definition.anchor,
                definition,
                relative_offset,
                placement: Placement::default(),
                marked_for_deletion: false,
                node,
            },
        );
        created.push(id);
        self.dirty = true;

        for part in parts {
            let child_id = block.next_id()?;
            let child_lineage = if part.id > 0 { part.id } else { lineage_id };
            self.insert_tree(child_id, child_lineage, Some(id), part, None, block, created)?;
            if let Some(obj) = self.objects.get_mut(&id) {
                obj.children.push(child_id);
            }
        }
        Ok(())
    }

    fn roll_back(&mut self, created: &[PoiId]) {
        for id in created.iter() {
            self.objects.remove(id);
        }
        debug!(count = created.len(), "Rolled back partial insert");
    }

    /// Removes an object and all of its parts, returning the removed ids.
    pub fn destroy(&mut self, id: PoiId) -> Vec<PoiId> {
        let removed = self.subtree(id);
        let parent = self.objects.get(&id).and_then(|o| o.parent);
        if let Some(parent) = parent.and_then(|p| self.objects.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
        for r in removed.iter() {
            self.objects.remove(r);
        }
        if !removed.is_empty() {
            self.dirty = true;
            debug!(id, count = removed.len(), "Destroyed scene object");
        }
        removed
    }

    pub fn mark_for_deletion(&mut self, id: PoiId, marked: bool) {
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.marked_for_deletion = marked;
        }
    }

    /// Destroys every object still marked for deletion.
    pub fn gc(&mut self) -> Vec<PoiId> {
        let marked: Vec<PoiId> = self
            .objects
            .values()
            .filter(|o| o.marked_for_deletion)
            .map(|o| o.id)
            .collect();
        let mut removed = Vec::new();
        for id in marked {
            removed.extend(self.destroy(id));
        }
        removed
    }

    /// Enables or disables every object with the given title.
    pub fn set_enabled_by_title(&mut self, title: &str, enabled: bool) -> usize {
        let mut count = 0;
        for obj in self.objects.values_mut() {
            if obj.definition.title == title {
                obj.node.set_enabled(enabled);
                count += 1;
            }
        }
        if count == 0 {
            warn!(title, "No scene object with this title");
        }
        count
    }

    /// Rebuilds the geo-placed and viewer-relative partitions after structural changes.
    pub fn set_ar_objects_to_place(&mut self) {
        self.placed.clear();
        self.relative.clear();
        for obj in self.objects.values().filter(|o| o.parent.is_none()) {
            if obj.is_relative() {
                self.relative.push(obj.id);
            } else {
                self.placed.push(obj.id);
            }
        }
        self.dirty = false;
        debug!(
            placed = self.placed.len(),
            relative = self.relative.len(),
            "Updated objects to place"
        );
    }

    pub fn placed_objects(&self) -> &[PoiId] {
        &self.placed
    }

    pub fn relative_objects(&self) -> &[PoiId] {
        &self.relative
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryNodeFactory;

    fn poi(id: PoiId, parts: Vec<PoiDefinition>) -> PoiDefinition {
        PoiDefinition {
            id,
            title: format!("poi-{id}"),
            anchor: Some(GeoAnchor::new(48.0, 16.0, 0.0)),
            parts,
            ..Default::default()
        }
    }

    fn registry() -> SceneObjectRegistry {
        SceneObjectRegistry::new(Box::new(MemoryNodeFactory))
    }

    #[test]
    fn parts_get_synthetic_ids_and_inherit_lineage() {
        let mut reg = registry();
        let part = PoiDefinition {
            relative_location: Some("0,1,0".to_owned()),
            ..Default::default()
        };
        let ids = reg.insert(poi(7, vec![part.clone(), part])).unwrap();
        assert_eq!(ids, vec![7, -1, -2]);
        let child = reg.get(-2).unwrap();
        assert_eq!(child.parent, Some(7));
        assert_eq!(child.lineage_id, 7);
        assert_eq!(child.relative_offset, Some(Vector3::new(0.0, 1.0, 0.0)));
        assert_eq!(reg.get(7).unwrap().children, vec![-1, -2]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut reg = registry();
        reg.insert(poi(1, vec![])).unwrap();
        assert!(matches!(
            reg.insert(poi(1, vec![])),
            Err(RegistryError::Duplicate(1))
        ));
    }

    #[test]
    fn destroy_is_recursive() {
        let mut reg = registry();
        reg.insert(poi(1, vec![poi(0, vec![poi(0, vec![])])])).unwrap();
        reg.insert(poi(2, vec![])).unwrap();
        assert_eq!(reg.len(), 4);
        let mut removed = reg.destroy(1);
        removed.sort();
        assert_eq!(removed, vec![-2, -1, 1]);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicates_use_fresh_blocks_and_keep_lineage() {
        let mut reg = registry();
        reg.insert(poi(5, vec![])).unwrap();
        let first = reg.duplicate(5, 1.0, 0.0).unwrap();
        let second = reg.duplicate(5, 1.0, 0.0).unwrap();
        assert_eq!(first, vec![-1 - SYNTHETIC_BLOCK_SIZE]);
        assert_eq!(second, vec![-1 - 2 * SYNTHETIC_BLOCK_SIZE]);
        let dup = reg.get(first[0]).unwrap();
        assert_eq!(dup.lineage_id, 5);
        assert!(dup.anchor.as_ref().unwrap().longitude > 16.0);
    }

    #[test]
    fn partitions_follow_relative_location() {
        let mut reg = registry();
        reg.insert(poi(1, vec![])).unwrap();
        reg.insert(PoiDefinition {
            id: 2,
            relative_location: Some("0,0,3".to_owned()),
            ..Default::default()
        })
        .unwrap();
        assert!(reg.is_dirty());
        reg.set_ar_objects_to_place();
        assert!(!reg.is_dirty());
        assert_eq!(reg.placed_objects(), &[1]);
        assert_eq!(reg.relative_objects(), &[2]);
    }

    #[test]
    fn gc_removes_marked_objects() {
        let mut reg = registry();
        reg.insert(poi(1, vec![])).unwrap();
        reg.insert(poi(2, vec![])).unwrap();
        reg.mark_for_deletion(1, true);
        assert_eq!(reg.gc(), vec![1]);
        assert!(reg.contains(2));
    }

    #[test]
    fn bad_relative_location_falls_back_to_origin() {
        let mut reg = registry();
        let ids = reg
            .insert(PoiDefinition {
                id: 3,
                relative_location: Some("north".to_owned()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ids, vec![3]);
        assert_eq!(reg.get(3).unwrap().relative_offset, Some(Vector3::zeros()));
    }

    #[test]
    fn bad_part_location_keeps_the_whole_tree() {
        let mut reg = registry();
        let part = PoiDefinition {
            relative_location: Some("x".to_owned()),
            ..Default::default()
        };
        let ids = reg.insert(poi(4, vec![part])).unwrap();
        assert_eq!(ids, vec![4, -1]);
        assert_eq!(reg.get(4).unwrap().children, vec![-1]);
        assert_eq!(reg.get(-1).unwrap().relative_offset, Some(Vector3::zeros()));
    }

    #[test]
    fn failed_insert_leaves_nothing_behind() {
        let mut reg = registry();
        let parts = (0..SYNTHETIC_BLOCK_SIZE + 1)
            .map(|_| PoiDefinition::default())
            .collect();
        let res = reg.insert(poi(6, parts));
        assert!(matches!(res, Err(RegistryError::BlockExhausted(_))));
        assert!(reg.is_empty());

        reg.insert(poi(6, vec![])).unwrap();
        assert!(reg.contains(6));
    }
}
