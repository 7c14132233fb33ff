//! # World Snapshot Schema
//!
//! The per-tick record the simulation publishes for other contexts:
//! a tick counter plus parallel arrays of entity ids and positions.
//! Structure-of-arrays so each consumer touches only the fields it needs.

use skein_core::{
    CodecResult, EntityId, FieldDef, FieldId, FieldKind, ObjectView, ObjectViewMut, Schema,
};
use skein_shared::Vec3;

/// Default maximum entities in one published snapshot.
pub const MAX_SNAPSHOT_ENTITIES: usize = 64;

/// Builds the world snapshot schema for a given entity capacity.
#[must_use]
pub fn world_schema(max_entities: usize) -> Schema {
    Schema::new(&[
        FieldDef::scalar("tick", FieldKind::U32),
        FieldDef::scalar("entity_count", FieldKind::U32),
        FieldDef::array("entity_index", FieldKind::U32, max_entities),
        FieldDef::array("entity_generation", FieldKind::U32, max_entities),
        FieldDef::array("position_x", FieldKind::F32, max_entities),
        FieldDef::array("position_y", FieldKind::F32, max_entities),
        FieldDef::array("position_z", FieldKind::F32, max_entities),
    ])
}

/// Field ids of the world snapshot schema, resolved once.
#[derive(Clone, Copy)]
pub struct SnapshotFields {
    tick: FieldId,
    entity_count: FieldId,
    entity_index: FieldId,
    entity_generation: FieldId,
    position_x: FieldId,
    position_y: FieldId,
    position_z: FieldId,
    max_entities: usize,
}

impl SnapshotFields {
    /// Resolves every field against a schema built by [`world_schema`].
    ///
    /// # Panics
    ///
    /// Panics if the schema is not a world snapshot schema - a wiring bug,
    /// not a runtime condition.
    #[must_use]
    pub fn resolve(schema: &Schema, max_entities: usize) -> Self {
        let field = |name: &str| {
            schema
                .field(name)
                .unwrap_or_else(|| panic!("world schema is missing field {name}"))
        };
        Self {
            tick: field("tick"),
            entity_count: field("entity_count"),
            entity_index: field("entity_index"),
            entity_generation: field("entity_generation"),
            position_x: field("position_x"),
            position_y: field("position_y"),
            position_z: field("position_z"),
            max_entities,
        }
    }

    /// Writes one snapshot record. Entities beyond the schema capacity are
    /// dropped (logged); the count field holds what was actually written.
    pub fn write(
        &self,
        view: &mut ObjectViewMut<'_>,
        tick: u32,
        entities: impl Iterator<Item = (EntityId, Vec3)>,
    ) -> CodecResult<u32> {
        view.set_u32(self.tick, 0, tick)?;

        let mut count = 0usize;
        let mut dropped = 0usize;
        for (id, position) in entities {
            if count == self.max_entities {
                dropped += 1;
                continue;
            }
            view.set_u32(self.entity_index, count, id.index())?;
            view.set_u32(self.entity_generation, count, id.generation())?;
            view.set_f32(self.position_x, count, position.x)?;
            view.set_f32(self.position_y, count, position.y)?;
            view.set_f32(self.position_z, count, position.z)?;
            count += 1;
        }
        if dropped > 0 {
            tracing::warn!(dropped, capacity = self.max_entities, "snapshot overflow, entities dropped");
        }

        view.set_u32(self.entity_count, 0, count as u32)?;
        Ok(count as u32)
    }

    /// Reads one snapshot record back into owned data.
    pub fn read(&self, view: &ObjectView<'_>) -> CodecResult<(u32, Vec<(EntityId, Vec3)>)> {
        let tick = view.get_u32(self.tick, 0)?;
        let count = (view.get_u32(self.entity_count, 0)? as usize).min(self.max_entities);

        let mut entities = Vec::with_capacity(count);
        for slot in 0..count {
            let id = EntityId::new(
                view.get_u32(self.entity_index, slot)?,
                view.get_u32(self.entity_generation, slot)?,
            );
            let position = Vec3::new(
                view.get_f32(self.position_x, slot)?,
                view.get_f32(self.position_y, slot)?,
                view.get_f32(self.position_z, slot)?,
            );
            entities.push((id, position));
        }
        Ok((tick, entities))
    }
}
