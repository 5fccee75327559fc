//! Minimal scene graph: a flat node arena with parent links.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use terra_materials::MaterialDescriptor;
use terra_space::PointCloud;

use crate::SphereGeometry;

/// Index of a node inside a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Local translation, rotation and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_uniform_scale(scale: f32) -> Self {
        Self {
            scale: Vec3::splat(scale),
            ..Self::IDENTITY
        }
    }

    /// Local-to-parent matrix: scale, then rotate, then translate.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Rotate about the node's own Y axis.
    pub fn rotate_local_y(&mut self, angle: f32) {
        self.rotation = (self.rotation * Quat::from_rotation_y(angle)).normalize();
    }
}

/// What a node draws.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Pure transform.
    Group,
    /// Triangle mesh with a material. Layers may share one geometry.
    Mesh {
        geometry: Arc<SphereGeometry>,
        material: MaterialDescriptor,
    },
    /// Point sprites.
    Points(Arc<PointCloud>),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

/// Arena of nodes. Parents are always inserted before their children.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under `parent` (or at the root).
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this scene.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        transform: Transform,
        kind: NodeKind,
    ) -> NodeId {
        if let Some(p) = parent {
            assert!(p.0 < self.nodes.len(), "parent node {p:?} does not exist");
        }
        self.nodes.push(Node {
            name: name.into(),
            transform,
            parent,
            kind,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Local-to-world matrix of `id`.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.nodes.get(c.0)) {
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// World matrices of every node, indexed like the arena.
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut out: Vec<Mat4> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let local = node.transform.matrix();
            let world = match node.parent {
                Some(p) => out[p.0] * local,
                None => local,
            };
            out.push(world);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_child_inherits_parent_transform() {
        let mut scene = Scene::new();
        let group = scene.add(
            "group",
            None,
            Transform {
                translation: Vec3::new(1.0, 0.0, 0.0),
                ..Transform::IDENTITY
            },
            NodeKind::Group,
        );
        let child = scene.add(
            "child",
            Some(group),
            Transform::from_uniform_scale(2.0),
            NodeKind::Group,
        );
        let p = scene.world_matrix(child).transform_point3(Vec3::Y);
        assert!(approx(p, Vec3::new(1.0, 2.0, 0.0)), "{p}");
    }

    #[test]
    fn test_world_matrices_match_single_lookup() {
        let mut scene = Scene::new();
        let a = scene.add(
            "a",
            None,
            Transform::from_rotation(Quat::from_rotation_z(0.4)),
            NodeKind::Group,
        );
        let b = scene.add("b", Some(a), Transform::from_uniform_scale(1.01), NodeKind::Group);
        let all = scene.world_matrices();
        assert_eq!(all.len(), 2);
        assert!(all[b.index()].abs_diff_eq(scene.world_matrix(b), 1e-6));
    }

    #[test]
    fn test_rotate_local_y_accumulates() {
        let mut t = Transform::IDENTITY;
        for _ in 0..10 {
            t.rotate_local_y(0.1);
        }
        let expected = Quat::from_rotation_y(1.0);
        assert!(t.rotation.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_find_by_name() {
        let mut scene = Scene::new();
        scene.add("earth", None, Transform::IDENTITY, NodeKind::Group);
        let stars = scene.add("stars", None, Transform::IDENTITY, NodeKind::Group);
        assert_eq!(scene.find("stars"), Some(stars));
        assert_eq!(scene.find("moon"), None);
    }
}
