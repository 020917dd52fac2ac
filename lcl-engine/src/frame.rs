//! Lexical scope frames.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::handle::Handle;
use crate::value::{NamespaceData, Value};

/// A frame's local bindings are either an owned map, or borrowed straight
/// from a namespace's map (used by `namespace eval` so that bindings made
/// inside the block land in the namespace rather than a throwaway frame).
enum LocalMap {
    Owned(HashMap<SmolStr, Value>),
    Borrowed(Handle<NamespaceData>),
}

/// A map from local name to value, with an optional parent frame.
///
/// Frames are reference-counted ([`Handle`]) because a captured `Cell` may
/// outlive the frame that originally held it (closures retain cells
/// directly, never the frame — see [`crate::closure`]).
pub struct Frame {
    locals: LocalMap,
    pub parent: Option<Handle<Frame>>,
}

impl Frame {
    pub fn new(parent: Option<Handle<Frame>>) -> Self {
        Frame {
            locals: LocalMap::Owned(HashMap::new()),
            parent,
        }
    }

    pub fn new_namespace(parent: Option<Handle<Frame>>, ns: Handle<NamespaceData>) -> Self {
        Frame {
            locals: LocalMap::Borrowed(ns),
            parent,
        }
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        match &self.locals {
            LocalMap::Owned(map) => map.get(name).cloned(),
            LocalMap::Borrowed(ns) => ns.borrow().map.get(name).cloned(),
        }
    }

    pub fn set_local(&mut self, name: impl Into<SmolStr>, value: Value) {
        match &mut self.locals {
            LocalMap::Owned(map) => {
                map.insert(name.into(), value);
            }
            LocalMap::Borrowed(ns) => {
                ns.borrow_mut().map.insert(name.into(), value);
            }
        }
    }

    /// Values owned directly by this frame (excludes borrowed namespace
    /// maps, which are cleared by the namespace's own lifetime).
    pub fn owned_values(&self) -> Vec<Value> {
        match &self.locals {
            LocalMap::Owned(map) => map.values().cloned().collect(),
            LocalMap::Borrowed(_) => Vec::new(),
        }
    }

    /// Walks the frame chain starting at `frame`, returning the first
    /// binding found (§4.3 `get_binding`).
    pub fn get_binding(frame: &Handle<Frame>, name: &str) -> Option<Value> {
        let mut current = Some(frame.clone());
        while let Some(f) = current {
            if let Some(v) = f.borrow().get_local(name) {
                return Some(v);
            }
            current = f.borrow().parent.clone();
        }
        None
    }
}
