use super::tree::SnapshotNode;

/// Children of `node` reached by following `modules` one level at a time
///
/// `children_of(tree, &["Parent"])` returns the direct `Parent` children;
/// `children_of(tree, &["Parent", "Child"])` returns every `Child` under
/// every `Parent`, in document order. A level with no matches simply yields
/// nothing further down. An empty path returns no nodes.
pub fn children_of<'a>(node: &'a SnapshotNode, modules: &[&str]) -> Vec<&'a SnapshotNode> {
    let Some((first, rest)) = modules.split_first() else {
        return Vec::new();
    };

    let mut level: Vec<&SnapshotNode> = direct_children(node, first);
    for module in rest {
        level = level
            .into_iter()
            .flat_map(|n| direct_children(n, module))
            .collect();
    }
    level
}

/// First node `children_of` would return
pub fn first_child_of<'a>(node: &'a SnapshotNode, modules: &[&str]) -> Option<&'a SnapshotNode> {
    children_of(node, modules).into_iter().next()
}

fn direct_children<'a>(node: &'a SnapshotNode, module: &str) -> Vec<&'a SnapshotNode> {
    node.children
        .iter()
        .filter(|child| child.core_module == module)
        .collect()
}
