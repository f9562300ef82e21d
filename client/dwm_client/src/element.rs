//! Retained-mode widget tree nodes.
//!
//! Each element owns a parent-local rectangle, an event procedure and opaque
//! private state. The tree itself lives in a slot arena owned by the window;
//! procedures receive the window plus their element's key, so widget code
//! can reach both its own state and the window APIs without aliasing.

use std::any::Any;
use std::rc::Rc;

use bitflags::bitflags;

use dwm_api_types::event::{ElementId, Event};
use dwm_api_types::point::Point;
use dwm_api_types::rect::Rect;

use crate::drawable::Align;
use crate::font::Font;
use crate::image::Image;
use crate::theme::ThemeOverrides;
use crate::window::Window;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ElementFlags: u64 {
        /// Press toggles the latched state instead of tracking the button.
        const TOGGLE = 1 << 0;
        /// Flat look: plain fills, no frame.
        const FLAT = 1 << 1;
        const NO_BEZEL = 1 << 2;
        const NO_OUTLINE = 1 << 3;
    }
}

/// Handle into a window's element arena.
pub type ElementKey = usize;

/// Procedures never panic the dispatch; an error tears the display down.
#[derive(Clone, Copy, Debug)]
pub struct ProcError;

pub type ProcResult = Result<(), ProcError>;

/// The function handling every event directed at one element.
pub type Procedure = fn(&mut Window, ElementKey, &Event) -> ProcResult;

#[derive(Clone, Debug, Default)]
pub struct TextProps {
    pub font: Option<Rc<Font>>,
    pub x_align: Align,
    pub y_align: Align,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ImageProps {
    pub x_align: Align,
    pub y_align: Align,
    pub src_offset: Point,
}

pub struct Element {
    pub id: ElementId,
    /// Parent-local geometry.
    pub rect: Rect,
    pub flags: ElementFlags,
    pub text: String,
    pub image: Option<Rc<Image>>,
    pub text_props: TextProps,
    pub image_props: ImageProps,
    pub overrides: ThemeOverrides,
    pub(crate) parent: Option<ElementKey>,
    pub(crate) children: Vec<ElementKey>,
    pub(crate) procedure: Procedure,
    pub(crate) private: Option<Box<dyn Any>>,
}

impl Element {
    pub(crate) fn new(
        id: ElementId,
        rect: Rect,
        text: &str,
        flags: ElementFlags,
        procedure: Procedure,
        private: Option<Box<dyn Any>>,
    ) -> Self {
        Self {
            id,
            rect,
            flags,
            text: text.to_string(),
            image: None,
            text_props: TextProps::default(),
            image_props: ImageProps::default(),
            overrides: ThemeOverrides::new(),
            parent: None,
            children: Vec::new(),
            procedure,
            private,
        }
    }

    pub fn content_rect(&self) -> Rect {
        Rect::from_dim(0, 0, self.rect.width(), self.rect.height())
    }

    pub fn children(&self) -> &[ElementKey] {
        &self.children
    }
}

/// Slot arena holding a window's elements.
#[derive(Default)]
pub struct ElementTree {
    nodes: Vec<Option<Element>>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, element: Element) -> ElementKey {
        if let Some(slot) = self.nodes.iter_mut().position(|n| n.is_none()) {
            self.nodes[slot] = Some(element);
            slot
        } else {
            self.nodes.push(Some(element));
            self.nodes.len() - 1
        }
    }

    pub(crate) fn remove(&mut self, key: ElementKey) -> Option<Element> {
        self.nodes.get_mut(key)?.take()
    }

    pub fn node(&self, key: ElementKey) -> Option<&Element> {
        self.nodes.get(key)?.as_ref()
    }

    pub fn node_mut(&mut self, key: ElementKey) -> Option<&mut Element> {
        self.nodes.get_mut(key)?.as_mut()
    }

    /// Depth-first search by application id, starting at `from`.
    pub fn find(&self, from: ElementKey, id: ElementId) -> Option<ElementKey> {
        let node = self.node(from)?;
        if node.id == id {
            return Some(from);
        }
        for &child in &node.children {
            if let Some(found) = self.find(child, id) {
                return Some(found);
            }
        }
        None
    }

    /// The element's top-left corner in window coordinates.
    pub fn global_point(&self, key: ElementKey) -> Point {
        let mut offset = Point::ZERO;
        let mut cursor = Some(key);
        while let Some(current) = cursor {
            let Some(node) = self.node(current) else {
                break;
            };
            offset.x += node.rect.left;
            offset.y += node.rect.top;
            cursor = node.parent;
        }
        offset
    }

    pub fn global_rect(&self, key: ElementKey) -> Rect {
        let point = self.global_point(key);
        let node = self.node(key).map(|n| n.rect).unwrap_or(Rect::ZERO);
        Rect::from_dim(point.x, point.y, node.width(), node.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwm_api_types::event::ELEMENT_ID_NONE;

    fn noop(_: &mut Window, _: ElementKey, _: &Event) -> ProcResult {
        Ok(())
    }

    fn leaf(id: ElementId, rect: Rect) -> Element {
        Element::new(id, rect, "", ElementFlags::empty(), noop, None)
    }

    #[test]
    fn insert_reuses_freed_slots() {
        let mut tree = ElementTree::new();
        let a = tree.insert(leaf(1, Rect::ZERO));
        let b = tree.insert(leaf(2, Rect::ZERO));
        tree.remove(a);
        let c = tree.insert(leaf(3, Rect::ZERO));
        assert_eq!(c, a);
        assert!(tree.node(b).is_some());
    }

    #[test]
    fn find_walks_depth_first() {
        let mut tree = ElementTree::new();
        let root = tree.insert(leaf(10, Rect::from_dim(0, 0, 100, 100)));
        let child = tree.insert(leaf(20, Rect::from_dim(5, 5, 10, 10)));
        let grandchild = tree.insert(leaf(30, Rect::from_dim(1, 1, 2, 2)));
        tree.node_mut(child).unwrap().parent = Some(root);
        tree.node_mut(root).unwrap().children.push(child);
        tree.node_mut(grandchild).unwrap().parent = Some(child);
        tree.node_mut(child).unwrap().children.push(grandchild);

        assert_eq!(tree.find(root, 30), Some(grandchild));
        assert_eq!(tree.find(root, 20), Some(child));
        assert_eq!(tree.find(root, ELEMENT_ID_NONE), None);
    }

    #[test]
    fn global_point_accumulates_ancestor_offsets() {
        let mut tree = ElementTree::new();
        let root = tree.insert(leaf(1, Rect::from_dim(0, 0, 100, 100)));
        let child = tree.insert(leaf(2, Rect::from_dim(10, 20, 50, 50)));
        let grandchild = tree.insert(leaf(3, Rect::from_dim(3, 4, 10, 10)));
        tree.node_mut(child).unwrap().parent = Some(root);
        tree.node_mut(grandchild).unwrap().parent = Some(child);

        assert_eq!(tree.global_point(grandchild), Point::new(13, 24));
        assert_eq!(tree.global_rect(grandchild), Rect::from_dim(13, 24, 10, 10));
    }
}
