//! Rendering collaborator interface.
//!
//! The animators only ever allocate instances from a mesh and then set their
//! transform, color and visibility. Calls are synchronous and always succeed.
//! [`RecordingRenderer`] keeps the resulting per-instance state in memory and
//! is what the tests and headless runs use.

use glam::{Mat4, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeshKind {
    Ground,
    EchoPillar,
    EchoGlow,
    PointNote,
    PointBackdrop,
    Bubble,
}

impl MeshKind {
    pub const ALL: [MeshKind; 6] = [
        MeshKind::Ground,
        MeshKind::EchoPillar,
        MeshKind::EchoGlow,
        MeshKind::PointNote,
        MeshKind::PointBackdrop,
        MeshKind::Bubble,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Opaque reference to one renderer instance of one mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceHandle {
    pub mesh: MeshKind,
    pub index: u32,
}

pub trait InstanceRenderer {
    fn allocate_instances(&mut self, mesh: MeshKind, count: usize) -> Vec<InstanceHandle>;
    fn set_instance_transform(&mut self, handle: InstanceHandle, matrix: Mat4);
    fn set_instance_color(&mut self, handle: InstanceHandle, rgb: Vec3);
    fn set_instance_visible(&mut self, handle: InstanceHandle, visible: bool);

    /// Flush a batch of mutations for `mesh`. Renderers that apply every call
    /// immediately can ignore this.
    fn commit(&mut self, _mesh: MeshKind) {}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceState {
    pub transform: Mat4,
    pub color: Vec3,
    pub visible: bool,
}

impl Default for InstanceState {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            color: Vec3::ONE,
            visible: true,
        }
    }
}

/// In-memory renderer: one instance list per mesh kind.
#[derive(Clone, Debug, Default)]
pub struct RecordingRenderer {
    meshes: [Vec<InstanceState>; 6],
    commits: [usize; 6],
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances(&self, mesh: MeshKind) -> &[InstanceState] {
        &self.meshes[mesh.index()]
    }

    pub fn instance(&self, handle: InstanceHandle) -> &InstanceState {
        &self.meshes[handle.mesh.index()][handle.index as usize]
    }

    pub fn visible_count(&self, mesh: MeshKind) -> usize {
        self.meshes[mesh.index()].iter().filter(|s| s.visible).count()
    }

    pub fn commit_count(&self, mesh: MeshKind) -> usize {
        self.commits[mesh.index()]
    }

    fn state_mut(&mut self, handle: InstanceHandle) -> Option<&mut InstanceState> {
        self.meshes[handle.mesh.index()].get_mut(handle.index as usize)
    }
}

impl InstanceRenderer for RecordingRenderer {
    fn allocate_instances(&mut self, mesh: MeshKind, count: usize) -> Vec<InstanceHandle> {
        let list = &mut self.meshes[mesh.index()];
        let first = list.len() as u32;
        list.resize(list.len() + count, InstanceState::default());
        (0..count as u32)
            .map(|i| InstanceHandle {
                mesh,
                index: first + i,
            })
            .collect()
    }

    fn set_instance_transform(&mut self, handle: InstanceHandle, matrix: Mat4) {
        if let Some(s) = self.state_mut(handle) {
            s.transform = matrix;
        }
    }

    fn set_instance_color(&mut self, handle: InstanceHandle, rgb: Vec3) {
        if let Some(s) = self.state_mut(handle) {
            s.color = rgb;
        }
    }

    fn set_instance_visible(&mut self, handle: InstanceHandle, visible: bool) {
        if let Some(s) = self.state_mut(handle) {
            s.visible = visible;
        }
    }

    fn commit(&mut self, mesh: MeshKind) {
        self.commits[mesh.index()] += 1;
    }
}
