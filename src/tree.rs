//! Core balanced tree: `Box`-allocated nodes addressed through `NonNull`
//! pointers with parent back-links for in-order stepping.

use std::borrow::Borrow;
use std::cmp::{self, Ordering};
use std::ptr::NonNull;

pub(crate) struct Tree<T> {
    root: Link<T>,
    rightmost: Link<T>,
    num_nodes: usize,
}

pub(crate) struct Node<T> {
    pub(crate) key: T,
    pub(crate) left: Link<T>,
    pub(crate) right: Link<T>,
    pub(crate) parent: Link<T>,
    pub(crate) height: usize,
}

pub(crate) type NodePtr<T> = NonNull<Node<T>>;
pub(crate) type Link<T> = Option<NodePtr<T>>;
type LinkPtr<T> = NonNull<Link<T>>;

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

impl<T> Tree<T> {
    pub(crate) fn new() -> Self {
        Self {
            root: None,
            rightmost: None,
            num_nodes: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.num_nodes
    }

    #[cfg(any(test, feature = "consistency_check"))]
    pub(crate) fn height(&self) -> usize {
        match self.root {
            None => 0,
            Some(root_ptr) => unsafe { root_ptr.as_ref().height },
        }
    }

    /// Clears the tree, deallocating all nodes.
    pub(crate) fn clear(&mut self) {
        self.postorder(|node_ptr| unsafe { Node::destroy(node_ptr) });
        self.root = None;
        self.rightmost = None;
        self.num_nodes = 0;
    }

    /// Returns the node holding the minimum key, found by descending left.
    pub(crate) fn leftmost(&self) -> Link<T> {
        self.root.map(Self::subtree_leftmost)
    }

    /// Returns the node holding the maximum key from the cache.
    pub(crate) fn rightmost(&self) -> Link<T> {
        self.rightmost
    }

    /// Removes the node with the minimum key and returns its key.
    pub(crate) fn pop_leftmost(&mut self) -> Option<T> {
        let node_ptr = self.leftmost()?;
        self.unlink_node(node_ptr);
        self.num_nodes -= 1;
        Some(unsafe { Node::take_key(node_ptr) })
    }

    /// Removes the node with the maximum key and returns its key.
    pub(crate) fn pop_rightmost(&mut self) -> Option<T> {
        let node_ptr = self.rightmost?;
        self.unlink_node(node_ptr);
        self.num_nodes -= 1;
        Some(unsafe { Node::take_key(node_ptr) })
    }

    /// Returns the in-order successor of the given node, or `None` if the
    /// node holds the maximum key.
    pub(crate) fn successor(node_ptr: NodePtr<T>) -> Link<T> {
        unsafe {
            if let Some(right_ptr) = node_ptr.as_ref().right {
                return Some(Self::subtree_leftmost(right_ptr));
            }
            let mut current = node_ptr;
            while let Some(parent_ptr) = current.as_ref().parent {
                if parent_ptr.as_ref().left == Some(current) {
                    return Some(parent_ptr);
                }
                current = parent_ptr;
            }
        }
        None
    }

    /// Returns the in-order predecessor of the given node, or `None` if the
    /// node holds the minimum key.
    pub(crate) fn predecessor(node_ptr: NodePtr<T>) -> Link<T> {
        unsafe {
            if let Some(left_ptr) = node_ptr.as_ref().left {
                return Some(Self::subtree_rightmost(left_ptr));
            }
            let mut current = node_ptr;
            while let Some(parent_ptr) = current.as_ref().parent {
                if parent_ptr.as_ref().right == Some(current) {
                    return Some(parent_ptr);
                }
                current = parent_ptr;
            }
        }
        None
    }

    fn subtree_leftmost(node_ptr: NodePtr<T>) -> NodePtr<T> {
        let mut current = node_ptr;
        while let Some(left_ptr) = unsafe { current.as_ref().left } {
            current = left_ptr;
        }
        current
    }

    fn subtree_rightmost(node_ptr: NodePtr<T>) -> NodePtr<T> {
        let mut current = node_ptr;
        while let Some(right_ptr) = unsafe { current.as_ref().right } {
            current = right_ptr;
        }
        current
    }

    fn unlink_node(&mut self, node_ptr: NodePtr<T>) {
        // The maximum can only disappear by being unlinked itself.
        if Some(node_ptr) == self.rightmost {
            self.rightmost = Self::predecessor(node_ptr);
        }
        unsafe {
            // Check if node to-unlink has right sub tree
            if let Some(mut min_child_ptr) = node_ptr.as_ref().right {
                // Find smallest child node in right sub tree
                let mut min_child_parent_ptr = node_ptr;
                while let Some(left_ptr) = min_child_ptr.as_ref().left {
                    min_child_parent_ptr = min_child_ptr;
                    min_child_ptr = left_ptr;
                }

                // Smallest child node is stem or leaf, unlink from tree
                debug_assert!(min_child_ptr.as_ref().left.is_none());
                if min_child_parent_ptr.as_ref().left == Some(min_child_ptr) {
                    min_child_parent_ptr.as_mut().left = min_child_ptr.as_ref().right;
                } else {
                    min_child_parent_ptr.as_mut().right = min_child_ptr.as_ref().right;
                }
                if let Some(mut right_ptr) = min_child_ptr.as_ref().right {
                    right_ptr.as_mut().parent = min_child_ptr.as_ref().parent;
                }

                // Replace node to-unlink by smallest child node (up to 6 links)
                min_child_ptr.as_mut().left = node_ptr.as_ref().left;
                if let Some(mut left_ptr) = node_ptr.as_ref().left {
                    left_ptr.as_mut().parent = Some(min_child_ptr);
                }

                min_child_ptr.as_mut().right = node_ptr.as_ref().right;
                if let Some(mut right_ptr) = node_ptr.as_ref().right {
                    right_ptr.as_mut().parent = Some(min_child_ptr);
                }

                min_child_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(min_child_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(min_child_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(min_child_ptr);
                        }
                    }
                }

                // Parent of smallest child node might be out of balance now
                let mut rebalance_from = min_child_parent_ptr;
                if rebalance_from == node_ptr {
                    // Parent is node to-unlink and has been replaced by smallest child
                    rebalance_from = min_child_ptr;
                }
                self.rebalance(Some(rebalance_from));
            } else {
                // Node to-unlink is stem or leaf, unlink from tree.
                debug_assert!(node_ptr.as_ref().right.is_none());
                if let Some(mut left_ptr) = node_ptr.as_ref().left {
                    left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                }
                match node_ptr.as_ref().parent {
                    None => self.root = node_ptr.as_ref().left,
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = node_ptr.as_ref().left;
                        } else {
                            parent_ptr.as_mut().right = node_ptr.as_ref().left
                        }
                        // Parent node might be out of balance now
                        self.rebalance(Some(parent_ptr));
                    }
                }
            }
        }
    }

    fn left_height(node_ptr: NodePtr<T>) -> usize {
        unsafe {
            match node_ptr.as_ref().left {
                None => 0,
                Some(left_ptr) => left_ptr.as_ref().height + 1,
            }
        }
    }

    fn right_height(node_ptr: NodePtr<T>) -> usize {
        unsafe {
            match node_ptr.as_ref().right {
                None => 0,
                Some(right_ptr) => right_ptr.as_ref().height + 1,
            }
        }
    }

    fn adjust_height(mut node_ptr: NodePtr<T>) {
        unsafe {
            node_ptr.as_mut().height = cmp::max(
                match node_ptr.as_ref().left {
                    None => 0,
                    Some(left_ptr) => left_ptr.as_ref().height + 1,
                },
                match node_ptr.as_ref().right {
                    None => 0,
                    Some(right_ptr) => right_ptr.as_ref().height + 1,
                },
            );
        }
    }

    fn rotate_left(&mut self, mut node_ptr: NodePtr<T>) {
        unsafe {
            if let Some(mut right_ptr) = node_ptr.as_ref().right {
                node_ptr.as_mut().right = right_ptr.as_ref().left;
                if let Some(mut right_left_ptr) = right_ptr.as_mut().left {
                    right_left_ptr.as_mut().parent = Some(node_ptr);
                }

                right_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(right_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(right_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(right_ptr);
                        }
                    }
                }

                right_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(right_ptr);

                Self::adjust_height(node_ptr);
                Self::adjust_height(right_ptr);
            }
        }
    }

    fn rotate_right(&mut self, mut node_ptr: NodePtr<T>) {
        unsafe {
            if let Some(mut left_ptr) = node_ptr.as_ref().left {
                node_ptr.as_mut().left = left_ptr.as_ref().right;
                if let Some(mut right_ptr) = left_ptr.as_ref().right {
                    right_ptr.as_mut().parent = Some(node_ptr);
                }

                left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(left_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(left_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(left_ptr);
                        }
                    }
                }

                left_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(left_ptr);

                Self::adjust_height(node_ptr);
                Self::adjust_height(left_ptr);
            }
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    fn rebalance(&mut self, start_from: Link<T>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            self.rebalance_node(node_ptr);
            current = parent;
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    /// Stops after first rebalance operation.
    /// This is enough to restore balance after a single insert operation.
    fn rebalance_once(&mut self, start_from: Link<T>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            let did_rebalance = self.rebalance_node(node_ptr);
            if did_rebalance {
                break;
            }
            current = parent;
        }
    }

    /// Restores the balance condition at given node if necessary and adjusts height.
    /// Resulting balance will be +1, 0 or -1 height difference between left and right subtree.
    /// Initial balance must not exceed +2 or -2, which always holds after a single update.
    /// Returns whether rebalancing had been necessary.
    fn rebalance_node(&mut self, node_ptr: NodePtr<T>) -> bool {
        unsafe {
            let left_height = Self::left_height(node_ptr);
            let right_height = Self::right_height(node_ptr);
            debug_assert!(left_height <= right_height + 2);
            debug_assert!(right_height <= left_height + 2);
            if left_height > right_height + 1 {
                // Rebalance right
                let left_ptr = node_ptr.as_ref().left.unwrap();
                if Self::right_height(left_ptr) > Self::left_height(left_ptr) {
                    self.rotate_left(left_ptr);
                }
                self.rotate_right(node_ptr);
                true
            } else if right_height > left_height + 1 {
                // Rebalance left
                let right_ptr = node_ptr.as_ref().right.unwrap();
                if Self::left_height(right_ptr) > Self::right_height(right_ptr) {
                    self.rotate_right(right_ptr);
                }
                self.rotate_left(node_ptr);
                true
            } else {
                Self::adjust_height(node_ptr);
                false
            }
        }
    }

    #[cfg(any(test, feature = "consistency_check"))]
    fn preorder<F: FnMut(NodePtr<T>)>(&self, f: F) {
        self.traverse(f, |_| {}, |_| {});
    }

    fn postorder<F: FnMut(NodePtr<T>)>(&self, f: F) {
        self.traverse(|_| {}, |_| {}, f);
    }

    fn traverse<Pre, In, Post>(&self, mut preorder: Pre, mut inorder: In, mut postorder: Post)
    where
        Pre: FnMut(NodePtr<T>),
        In: FnMut(NodePtr<T>),
        Post: FnMut(NodePtr<T>),
    {
        if let Some(mut node_ptr) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        preorder(node_ptr);
                        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        inorder(node_ptr);
                        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after postorder call.
                        if let Some(parent_ptr) = unsafe { node_ptr.as_ref().parent } {
                            if Some(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            postorder(node_ptr);
                            node_ptr = parent_ptr;
                        } else {
                            postorder(node_ptr);
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl<T: Ord> Tree<T> {
    pub(crate) fn find<Q>(&self, key: &Q) -> Link<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match key.cmp(node_ptr.as_ref().key.borrow()) {
                    Ordering::Equal => break,
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    /// Returns the node with the smallest key not less than the given key,
    /// or `None` if all keys are less.
    pub(crate) fn lower_bound<Q>(&self, key: &Q) -> Link<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut candidate: Link<T> = None;
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                if node_ptr.as_ref().key.borrow() < key {
                    node_ptr.as_ref().right
                } else {
                    candidate = Some(node_ptr);
                    node_ptr.as_ref().left
                }
            }
        }
        // Guard against a descent that stopped one element short of the
        // bound: step forward while the candidate key is still less.
        while let Some(node_ptr) = candidate {
            if unsafe { node_ptr.as_ref().key.borrow() } < key {
                candidate = Self::successor(node_ptr);
            } else {
                break;
            }
        }
        candidate
    }

    pub(crate) fn insert(&mut self, key: T) -> bool {
        if let Some((parent, mut link_ptr)) = self.find_insert_pos(&key) {
            let node_ptr = Node::create(parent, key);
            unsafe {
                *link_ptr.as_mut() = Some(node_ptr);
            }
            let is_new_max = match self.rightmost {
                None => true,
                Some(max_ptr) => unsafe { max_ptr.as_ref().key < node_ptr.as_ref().key },
            };
            if is_new_max {
                self.rightmost = Some(node_ptr);
            }
            self.num_nodes += 1;
            self.rebalance_once(parent);
            return true;
        }
        false
    }

    pub(crate) fn remove<Q>(&mut self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // Find node to-be-removed
        if let Some(node_ptr) = self.find(key) {
            debug_assert!(self.num_nodes >= 1);
            self.unlink_node(node_ptr);
            unsafe { Node::destroy(node_ptr) };
            self.num_nodes -= 1;
            debug_assert!(self.find(key).is_none());
            return true;
        }
        false
    }

    /// Like `remove`, but hands the stored key back to the caller.
    pub(crate) fn take<Q>(&mut self, key: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node_ptr = self.find(key)?;
        self.unlink_node(node_ptr);
        self.num_nodes -= 1;
        Some(unsafe { Node::take_key(node_ptr) })
    }

    fn find_insert_pos(&mut self, key: &T) -> Option<(Link<T>, LinkPtr<T>)> {
        let mut parent: Link<T> = None;
        let mut link_ptr: LinkPtr<T> = unsafe { LinkPtr::new_unchecked(&mut self.root) };
        unsafe {
            while let Some(mut node_ptr) = *link_ptr.as_ref() {
                match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => return None,
                    Ordering::Less => {
                        parent = Some(node_ptr);
                        link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().left);
                    }
                    Ordering::Greater => {
                        parent = Some(node_ptr);
                        link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().right);
                    }
                }
            }
        }
        Some((parent, link_ptr))
    }

    #[cfg(any(test, feature = "consistency_check"))]
    pub(crate) fn check_consistency(&self) {
        unsafe {
            // Check root link
            if let Some(root_node_ptr) = self.root {
                assert!(root_node_ptr.as_ref().parent.is_none());
            }

            // Check cached maximum node
            match self.rightmost {
                None => assert!(self.root.is_none()),
                Some(max_ptr) => {
                    assert!(max_ptr.as_ref().right.is_none());
                    assert_eq!(self.root.map(Self::subtree_rightmost), Some(max_ptr));
                }
            }

            // Check tree nodes
            let mut num_nodes = 0;
            self.preorder(|node_ptr| {
                let mut height = 0;
                let mut left_height = 0;
                let mut right_height = 0;

                // Check link for left child node
                if let Some(left_ptr) = node_ptr.as_ref().left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(left_ptr.as_ref().key < node_ptr.as_ref().key);
                    left_height = left_ptr.as_ref().height + 1;
                    height = cmp::max(height, left_height);
                }

                // Check link for right child node
                if let Some(right_ptr) = node_ptr.as_ref().right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(right_ptr.as_ref().key > node_ptr.as_ref().key);
                    right_height = right_ptr.as_ref().height + 1;
                    height = cmp::max(height, right_height);
                }

                // Check height
                assert_eq!(node_ptr.as_ref().height, height);

                // Check AVL condition (nearly balance)
                assert!(left_height <= right_height + 1);
                assert!(right_height <= left_height + 1);

                num_nodes += 1;
            });

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);
        }
    }
}

impl<T: Clone> Tree<T> {
    fn clone_subtree(node_ptr: NodePtr<T>, parent: Link<T>) -> NodePtr<T> {
        unsafe {
            let node = node_ptr.as_ref();
            let mut clone_ptr = Node::create(parent, node.key.clone());
            clone_ptr.as_mut().height = node.height;
            clone_ptr.as_mut().left = node
                .left
                .map(|left_ptr| Self::clone_subtree(left_ptr, Some(clone_ptr)));
            clone_ptr.as_mut().right = node
                .right
                .map(|right_ptr| Self::clone_subtree(right_ptr, Some(clone_ptr)));
            clone_ptr
        }
    }
}

impl<T: Clone> Clone for Tree<T> {
    /// Deep copy preserving the exact node structure.
    fn clone(&self) -> Self {
        let root = self.root.map(|root_ptr| Self::clone_subtree(root_ptr, None));
        Self {
            root,
            rightmost: root.map(Self::subtree_rightmost),
            num_nodes: self.num_nodes,
        }
    }

    /// Tears down the current tree, then deep copies the source.
    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.root = source
            .root
            .map(|root_ptr| Self::clone_subtree(root_ptr, None));
        self.rightmost = self.root.map(Self::subtree_rightmost);
        self.num_nodes = source.num_nodes;
    }
}

impl<T> Drop for Tree<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Node<T> {
    fn create(parent: Link<T>, key: T) -> NodePtr<T> {
        let boxed = Box::new(Node {
            key,
            parent,
            left: None,
            right: None,
            height: 0,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    unsafe fn destroy(node_ptr: NodePtr<T>) {
        drop(Box::from_raw(node_ptr.as_ptr()));
    }

    unsafe fn take_key(node_ptr: NodePtr<T>) -> T {
        Box::from_raw(node_ptr.as_ptr()).key
    }
}
