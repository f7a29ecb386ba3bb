//! Cache identity for compiled gradients and the per-document cache.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::Result;

use crate::geometry::{IRect, Matrix};
use crate::pdf::{DocumentEmitter, ObjectRef};

use super::alpha::make_alpha_function_shader;
use super::function_shader::make_function_shader;
use super::types::GradientDescriptor;

/// Everything that determines the emitted pattern.
///
/// The hash is computed once at construction; [`Hash`] only feeds that value,
/// while equality compares every field.
#[derive(Clone, Debug)]
pub struct GradientKey {
    pub descriptor: GradientDescriptor,
    pub canvas_transform: Matrix,
    pub shader_transform: Matrix,
    pub bbox: IRect,
    hash: u64,
}

impl GradientKey {
    pub fn new(
        descriptor: GradientDescriptor,
        canvas_transform: Matrix,
        shader_transform: Matrix,
        bbox: IRect,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        descriptor.hash(&mut hasher);
        canvas_transform.hash(&mut hasher);
        shader_transform.hash(&mut hasher);
        bbox.hash(&mut hasher);
        Self {
            descriptor,
            canvas_transform,
            shader_transform,
            bbox,
            hash: hasher.finish(),
        }
    }

    /// Same placement, different stops. The hash is recomputed.
    pub fn with_descriptor(&self, descriptor: GradientDescriptor) -> Self {
        Self::new(
            descriptor,
            self.canvas_transform,
            self.shader_transform,
            self.bbox,
        )
    }

    pub fn precomputed_hash(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for GradientKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.descriptor == other.descriptor
            && self.canvas_transform == other.canvas_transform
            && self.shader_transform == other.shader_transform
            && self.bbox == other.bbox
    }
}

impl Eq for GradientKey {}

impl Hash for GradientKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// Per-document map from gradient keys to emitted pattern objects.
///
/// Only successful compilations are stored, so a key that failed once is
/// retried on its next use.
#[derive(Debug, Default)]
pub struct GradientCache {
    patterns: HashMap<GradientKey, ObjectRef>,
}

impl GradientCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, key: &GradientKey) -> Option<ObjectRef> {
        self.patterns.get(key).copied()
    }

    pub fn insert(&mut self, key: GradientKey, pattern: ObjectRef) {
        self.patterns.insert(key, pattern);
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Cached pattern for `key`, compiling and recording it on a miss.
    ///
    /// Malformed stops (none, unsorted, or outside `[0, 1]`) yield `Ok(None)`
    /// and touch neither the document nor the cache. Keys with translucent
    /// stops go through the soft-mask construction, everything else straight
    /// to a shading pattern.
    pub fn acquire(
        &mut self,
        doc: &mut dyn DocumentEmitter,
        key: GradientKey,
    ) -> Result<Option<ObjectRef>> {
        if !key.descriptor.is_well_formed() {
            log::warn!(
                "{:?} gradient with {} stop(s) is malformed; skipping",
                key.descriptor.kind,
                key.descriptor.stops.len()
            );
            return Ok(None);
        }

        if let Some(pattern) = self.find(&key) {
            log::trace!("gradient cache hit: {:?}", pattern);
            return Ok(Some(pattern));
        }

        let pattern = if key.descriptor.has_alpha() {
            make_alpha_function_shader(doc, self, &key)?
        } else {
            make_function_shader(doc, &key)?
        };

        match pattern {
            Some(pattern) => self.insert(key, pattern),
            None => log::debug!("{:?} gradient produced no pattern", key.descriptor.kind),
        }
        Ok(pattern)
    }
}
