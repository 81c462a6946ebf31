//! Shape classification for virtual nodes.

bitflags::bitflags! {
    /// What a node is and what its children are, packed for cheap branching.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShapeFlags: u16 {
        const ELEMENT            = 1;
        const STATEFUL_COMPONENT = 1 << 2;
        const TEXT_CHILDREN      = 1 << 3;
        const ARRAY_CHILDREN     = 1 << 4;
    }
}

impl ShapeFlags {
    /// Both child-kind bits.
    pub const CHILDREN: Self = Self::TEXT_CHILDREN.union(Self::ARRAY_CHILDREN);

    /// The node's own flags with the child-kind bits cleared.
    pub fn without_children(self) -> Self {
        self.difference(Self::CHILDREN)
    }
}
