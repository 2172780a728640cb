//! In-memory path state implementing the executor ports

use ese_core::shared::models::{AllocKey, ExprRef, InstLocation, ObjectSnapshot, PathId};
use ese_core::{PathSource, PathView};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct MockPath {
    pub pc: InstLocation,
    pub callers: Vec<InstLocation>,
    pub stack: BTreeMap<(u32, u32), ExprRef>,
    pub heap: BTreeMap<(AllocKey, u64), ExprRef>,
    pub constraints: Vec<ExprRef>,
}

impl MockPath {
    pub fn at(pc: InstLocation) -> Self {
        Self {
            pc,
            callers: Vec::new(),
            stack: BTreeMap::new(),
            heap: BTreeMap::new(),
            constraints: Vec::new(),
        }
    }
}

impl PathView for MockPath {
    fn pc(&self) -> InstLocation {
        self.pc
    }

    fn call_string(&self) -> Vec<InstLocation> {
        self.callers.clone()
    }

    fn stack_depth(&self) -> u32 {
        self.callers.len() as u32 + 1
    }

    fn stack_value(&self, frame: u32, reg: u32) -> Option<ExprRef> {
        self.stack.get(&(frame, reg)).cloned()
    }

    fn read_byte(&self, alloc: AllocKey, offset: u64) -> Option<ExprRef> {
        self.heap.get(&(alloc, offset)).cloned()
    }

    fn object_snapshot(&self, alloc: AllocKey) -> Option<ObjectSnapshot> {
        let bytes: Vec<ExprRef> = self
            .heap
            .iter()
            .filter(|((a, _), _)| *a == alloc)
            .map(|(_, v)| v.clone())
            .collect();
        if bytes.is_empty() {
            None
        } else {
            Some(ObjectSnapshot::new(bytes))
        }
    }

    fn constraints(&self) -> &[ExprRef] {
        &self.constraints
    }
}

/// The executor's set of live paths
#[derive(Debug, Clone, Default)]
pub struct MockPaths {
    pub paths: BTreeMap<PathId, MockPath>,
}

impl MockPaths {
    pub fn get_mut(&mut self, id: PathId) -> &mut MockPath {
        self.paths.get_mut(&id).expect("path is live")
    }

    pub fn insert(&mut self, id: PathId, path: MockPath) {
        self.paths.insert(id, path);
    }

    pub fn remove(&mut self, id: PathId) {
        self.paths.remove(&id);
    }
}

impl PathSource for MockPaths {
    fn path(&self, id: PathId) -> Option<&dyn PathView> {
        self.paths.get(&id).map(|p| p as &dyn PathView)
    }
}
