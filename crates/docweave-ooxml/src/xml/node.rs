//! Mutable, order-preserving XML element tree
//!
//! A [`Node`] is either an element (qualified name, ordered attributes,
//! ordered children), a text leaf or a comment leaf. Children are addressed
//! by paths of [`Index`] steps.
//!
//! Cloning a node is a deep copy. Aliasing is expressed with borrows: the
//! visitor methods hand out references whose lifetime ends with the
//! callback invocation, so a view of one sibling can never be kept around
//! while the traversal moves on to the next one.
//!
//! ```compile_fail
//! use docweave_ooxml::xml::{parse_xml, Node};
//!
//! let root = parse_xml("<a><b/><c/></a>").unwrap();
//! let mut kept: Option<&Node> = None;
//! root.visit_children(|_| true, 0, |child, _| {
//!     kept = Some(child);
//!     true
//! })
//! .unwrap();
//! println!("{:?}", kept);
//! ```

use crate::error::{OoxmlError, Result};
use crate::xml::path::{describe, Index};

/// A node of the XML tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Element with a qualified name, attributes and children
    Element(Element),
    /// Character data
    Text(String),
    /// Comment text (without the `<!--`/`-->` delimiters)
    Comment(String),
}

/// Element payload of a [`Node`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub(crate) name: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes and no children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Qualified tag name (e.g. `w:p`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in document order
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Children in document order
    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

impl Node {
    /// Create an empty element node
    pub fn element(name: impl Into<String>) -> Self {
        Node::Element(Element::new(name))
    }

    /// Create a text leaf
    pub fn new_text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// Create a comment leaf
    pub fn new_comment(text: impl Into<String>) -> Self {
        Node::Comment(text.into())
    }

    /// Builder: add an attribute (no-op on leaves)
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Node::Element(element) = &mut self {
            element.attributes.push((name.into(), value.into()));
        }
        self
    }

    /// Builder: append a child (no-op on leaves)
    pub fn with_child(mut self, child: Node) -> Self {
        if let Node::Element(element) = &mut self {
            element.children.push(child);
        }
        self
    }

    /// Builder: append several children (no-op on leaves)
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        if let Node::Element(element) = &mut self {
            element.children.extend(children);
        }
        self
    }

    /// The element's tag name, `None` for text and comment leaves
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Node::Element(element) => Some(&element.name),
            _ => None,
        }
    }

    /// Whether this node is an element named `name`
    pub fn is(&self, name: &str) -> bool {
        self.tag_name() == Some(name)
    }

    /// Whether this node is an element
    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    /// Element payload, if any
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Look up an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attributes in stored order (empty for leaves)
    pub fn attributes(&self) -> &[(String, String)] {
        match self {
            Node::Element(element) => &element.attributes,
            _ => &[],
        }
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let element = self.element_mut("set an attribute on")?;
        let value = value.into();
        match element.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => element.attributes.push((name.to_string(), value)),
        }
        Ok(())
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        match self {
            Node::Element(element) => {
                let position = element.attributes.iter().position(|(key, _)| key == name)?;
                Some(element.attributes.remove(position).1)
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Leaf payloads
    // ------------------------------------------------------------------

    /// Text of a text leaf
    pub fn text(&self) -> Result<&str> {
        match self {
            Node::Text(text) => Ok(text),
            other => Err(OoxmlError::structural(format!(
                "expected a text node, found {}",
                other.kind()
            ))),
        }
    }

    /// Replace the text of a text leaf
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        match self {
            Node::Text(current) => {
                *current = text.into();
                Ok(())
            }
            other => Err(OoxmlError::structural(format!(
                "expected a text node, found {}",
                other.kind()
            ))),
        }
    }

    /// Text of a comment leaf
    pub fn comment(&self) -> Result<&str> {
        match self {
            Node::Comment(text) => Ok(text),
            other => Err(OoxmlError::structural(format!(
                "expected a comment node, found {}",
                other.kind()
            ))),
        }
    }

    /// Concatenation of every text leaf in this subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    // ------------------------------------------------------------------
    // Copying
    // ------------------------------------------------------------------

    /// Recursive copy with fresh storage
    pub fn deep_copy(&self) -> Node {
        self.clone()
    }

    /// Replace this node's contents with `other`
    pub fn assign(&mut self, other: Node) {
        *self = other;
    }

    // ------------------------------------------------------------------
    // Children
    // ------------------------------------------------------------------

    /// Children in order (empty for leaves)
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(element) => &element.children,
            _ => &[],
        }
    }

    /// Mutable child list of this element
    pub fn children_mut(&mut self) -> Result<&mut Vec<Node>> {
        Ok(&mut self.element_mut("access the children of")?.children)
    }

    /// Child elements named `name`
    pub fn elements<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children().iter().filter(move |child| child.is(name))
    }

    /// First child element named `name`
    pub fn first_element(&self, name: &str) -> Option<&Node> {
        self.children().iter().find(|child| child.is(name))
    }

    /// First child element named `name`, mutable
    pub fn first_element_mut(&mut self, name: &str) -> Option<&mut Node> {
        match self {
            Node::Element(element) => element.children.iter_mut().find(|child| child.is(name)),
            _ => None,
        }
    }

    /// Descend along `path`; `None` when any step is missing.
    ///
    /// An empty path addresses `self`.
    pub fn child(&self, path: &[Index]) -> Option<&Node> {
        let mut current = self;
        for step in path {
            let children = current.children();
            let position = step.resolve_access(children.len())?;
            current = &children[position];
        }
        Some(current)
    }

    /// Mutable variant of [`Node::child`]
    pub fn child_mut(&mut self, path: &[Index]) -> Option<&mut Node> {
        let mut current = self;
        for step in path {
            let children = match current {
                Node::Element(element) => &mut element.children,
                _ => return None,
            };
            let position = step.resolve_access(children.len())?;
            current = &mut children[position];
        }
        Some(current)
    }

    /// The single child matching `filter`.
    ///
    /// More than one match is a caller contract violation and yields a
    /// structural error rather than the first match.
    pub fn find_child<F>(&self, filter: F) -> Result<Option<&Node>>
    where
        F: Fn(&Node) -> bool,
    {
        Ok(self
            .find_child_position(filter)?
            .map(|position| &self.children()[position]))
    }

    /// Mutable variant of [`Node::find_child`]
    pub fn find_child_mut<F>(&mut self, filter: F) -> Result<Option<&mut Node>>
    where
        F: Fn(&Node) -> bool,
    {
        match self.find_child_position(filter)? {
            Some(position) => Ok(Some(&mut self.children_mut()?[position])),
            None => Ok(None),
        }
    }

    fn find_child_position<F>(&self, filter: F) -> Result<Option<usize>>
    where
        F: Fn(&Node) -> bool,
    {
        let children = self.child_list("search the children of")?;
        let mut found = None;
        for (position, child) in children.iter().enumerate() {
            if filter(child) {
                if found.is_some() {
                    return Err(OoxmlError::structural(format!(
                        "more than one child of <{}> matches a single-child lookup",
                        self.tag_name().unwrap_or_default()
                    )));
                }
                found = Some(position);
            }
        }
        Ok(found)
    }

    /// Append `child` to the element at `path`
    pub fn push_child(&mut self, path: &[Index], child: Node) -> Result<()> {
        self.children_at_mut(path)?.push(child);
        Ok(())
    }

    /// Prepend `child` to the element at `path`
    pub fn unshift_child(&mut self, path: &[Index], child: Node) -> Result<()> {
        self.children_at_mut(path)?.insert(0, child);
        Ok(())
    }

    /// Insert `children` at a position.
    ///
    /// The last step of `path` is the insertion position inside the element
    /// addressed by the preceding steps; `Index::LAST` appends.
    pub fn insert_children(
        &mut self,
        path: &[Index],
        children: impl IntoIterator<Item = Node>,
    ) -> Result<()> {
        let (position, parent_path) = path
            .split_last()
            .ok_or_else(|| OoxmlError::structural("insert_children needs a non-empty path"))?;
        let siblings = self.children_at_mut(parent_path)?;
        let at = position.resolve_insert(siblings.len()).ok_or_else(|| {
            OoxmlError::structural(format!(
                "insertion position {} is out of range",
                describe(path)
            ))
        })?;
        siblings.splice(at..at, children);
        Ok(())
    }

    /// Remove and return the node at `path`
    pub fn remove_child(&mut self, path: &[Index]) -> Result<Node> {
        let (position, parent_path) = path
            .split_last()
            .ok_or_else(|| OoxmlError::structural("remove_child needs a non-empty path"))?;
        let siblings = self.children_at_mut(parent_path)?;
        let at = position.resolve_access(siblings.len()).ok_or_else(|| {
            OoxmlError::structural(format!("no node at path {}", describe(path)))
        })?;
        Ok(siblings.remove(at))
    }

    /// Remove every direct child matching `filter`; returns how many went
    pub fn remove_children<F>(&mut self, filter: F) -> Result<usize>
    where
        F: Fn(&Node) -> bool,
    {
        let children = self.children_mut()?;
        let before = children.len();
        children.retain(|child| !filter(child));
        Ok(before - children.len())
    }

    // ------------------------------------------------------------------
    // Visitors
    // ------------------------------------------------------------------

    /// Visit direct children from `start`, in order.
    ///
    /// The callback receives each child passing `filter` and its index;
    /// returning `false` stops the traversal.
    pub fn visit_children<F, C>(&self, filter: F, start: usize, mut callback: C) -> Result<()>
    where
        F: Fn(&Node) -> bool,
        C: FnMut(&Node, usize) -> bool,
    {
        let children = self.child_list("visit the children of")?;
        for (position, child) in children.iter().enumerate().skip(start) {
            if filter(child) && !callback(child, position) {
                break;
            }
        }
        Ok(())
    }

    /// Mutable variant of [`Node::visit_children`]
    pub fn visit_children_mut<F, C>(&mut self, filter: F, start: usize, mut callback: C) -> Result<()>
    where
        F: Fn(&Node) -> bool,
        C: FnMut(&mut Node, usize) -> bool,
    {
        let children = self.children_mut()?;
        for (position, child) in children.iter_mut().enumerate().skip(start) {
            if filter(child) && !callback(child, position) {
                break;
            }
        }
        Ok(())
    }

    /// Pre-order depth-first traversal of the subtree below `start`.
    ///
    /// The callback receives each descendant passing `filter` together with
    /// its path relative to the traversal root; returning `true` descends
    /// into that node's children. Nodes rejected by `filter` are still
    /// descended into.
    pub fn visit_subtree<F, C>(&self, filter: F, start: &[Index], mut callback: C) -> Result<()>
    where
        F: Fn(&Node) -> bool,
        C: FnMut(&Node, &[usize]) -> bool,
    {
        let root = self.child(start).ok_or_else(|| {
            OoxmlError::structural(format!("no node at path {}", describe(start)))
        })?;
        let mut path = Vec::new();
        walk(root, &filter, &mut callback, &mut path);
        Ok(())
    }

    /// Mutable variant of [`Node::visit_subtree`]
    pub fn visit_subtree_mut<F, C>(
        &mut self,
        filter: F,
        start: &[Index],
        mut callback: C,
    ) -> Result<()>
    where
        F: Fn(&Node) -> bool,
        C: FnMut(&mut Node, &[usize]) -> bool,
    {
        let root = self.child_mut(start).ok_or_else(|| {
            OoxmlError::structural(format!("no node at path {}", describe(start)))
        })?;
        let mut path = Vec::new();
        walk_mut(root, &filter, &mut callback, &mut path);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn kind(&self) -> String {
        match self {
            Node::Element(element) => format!("element <{}>", element.name),
            Node::Text(_) => "text node".to_string(),
            Node::Comment(_) => "comment node".to_string(),
        }
    }

    fn element_mut(&mut self, action: &str) -> Result<&mut Element> {
        match self {
            Node::Element(element) => Ok(element),
            other => Err(OoxmlError::structural(format!(
                "cannot {} a {}",
                action,
                other.kind()
            ))),
        }
    }

    fn child_list(&self, action: &str) -> Result<&[Node]> {
        match self {
            Node::Element(element) => Ok(&element.children),
            other => Err(OoxmlError::structural(format!(
                "cannot {} a {}",
                action,
                other.kind()
            ))),
        }
    }

    fn children_at_mut(&mut self, path: &[Index]) -> Result<&mut Vec<Node>> {
        let target = self
            .child_mut(path)
            .ok_or_else(|| OoxmlError::structural(format!("no node at path {}", describe(path))))?;
        match target {
            Node::Element(element) => Ok(&mut element.children),
            leaf => Err(OoxmlError::structural(format!(
                "cannot mutate the children of a {} at path {}",
                leaf.kind(),
                describe(path)
            ))),
        }
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            for child in &element.children {
                collect_text(child, out);
            }
        }
        Node::Comment(_) => {}
    }
}

fn walk<F, C>(node: &Node, filter: &F, callback: &mut C, path: &mut Vec<usize>)
where
    F: Fn(&Node) -> bool,
    C: FnMut(&Node, &[usize]) -> bool,
{
    for (position, child) in node.children().iter().enumerate() {
        path.push(position);
        let descend = if filter(child) {
            callback(child, path.as_slice())
        } else {
            true
        };
        if descend {
            walk(child, filter, callback, path);
        }
        path.pop();
    }
}

fn walk_mut<F, C>(node: &mut Node, filter: &F, callback: &mut C, path: &mut Vec<usize>)
where
    F: Fn(&Node) -> bool,
    C: FnMut(&mut Node, &[usize]) -> bool,
{
    let Node::Element(element) = node else {
        return;
    };
    for (position, child) in element.children.iter_mut().enumerate() {
        path.push(position);
        let descend = if filter(child) {
            callback(child, path.as_slice())
        } else {
            true
        };
        if descend {
            walk_mut(child, filter, callback, path);
        }
        path.pop();
    }
}

/// Filter accepting every node
pub fn any(_: &Node) -> bool {
    true
}

/// Filter accepting elements named `name`
pub fn tag(name: &str) -> impl Fn(&Node) -> bool + '_ {
    move |node: &Node| node.is(name)
}
