//! Execution environment: current frame, current namespace, global namespace.

use std::collections::HashMap;

use smol_str::SmolStr;

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::handle::Handle;
use crate::value::{NamespaceData, Value};

/// Per-interpreter environment (§3.4).
///
/// The current namespace changes during `namespace eval`; the current
/// frame changes during procedure calls and namespace evaluation. Both
/// swaps are undone by the caller once the nested evaluation returns.
pub struct Environment {
    pub frame: Handle<Frame>,
    pub current_ns: Handle<NamespaceData>,
    pub global_ns: Handle<NamespaceData>,
}

impl Environment {
    pub fn new() -> Self {
        let global = Handle::new(NamespaceData {
            qname: SmolStr::new_inline(""),
            map: HashMap::new(),
        });
        Environment {
            frame: Handle::new(Frame::new(None)),
            current_ns: global.clone(),
            global_ns: global,
        }
    }

    /// `let(name, value)` — bind in the current frame's map.
    pub fn let_binding(&mut self, name: impl Into<SmolStr>, value: Value) {
        self.frame.borrow_mut().set_local(name, value);
    }

    /// `var(name, value)` — wrap in a fresh `Cell`, bind in the current frame.
    pub fn var_binding(&mut self, name: impl Into<SmolStr>, value: Value) {
        let cell = Value::new_cell(value);
        self.frame.borrow_mut().set_local(name, cell);
    }

    /// `set!(name, value)` — assign into an existing `Cell` binding.
    pub fn set_bang(&mut self, name: &str, value: Value) -> Result<()> {
        let mut current = Some(self.frame.clone());
        while let Some(f) = current {
            if let Some(existing) = f.borrow().get_local(name) {
                return existing
                    .cell_set(value)
                    .map_err(|_| Error::generic(format!("'{name}' is not a mutable binding")));
            }
            current = f.borrow().parent.clone();
        }
        Err(Error::unbound(name))
    }

    /// `get_value(name)` — the four-step lookup order of §4.3.
    pub fn get_value(&self, name: &str) -> Result<Value> {
        if let Some(v) = Frame::get_binding(&self.frame, name) {
            return Ok(v);
        }
        if let Some(v) = self.current_ns.borrow().map.get(name).cloned() {
            return Ok(v);
        }
        if let Some(v) = self.global_ns.borrow().map.get(name).cloned() {
            return Ok(v);
        }
        if let Some((left, rest)) = Value::split_qualified(name) {
            let mut current = self.get_value(left).map_err(|_| Error::unbound(name))?;
            let mut remaining = rest;
            loop {
                if !current.is_namespace() {
                    return Err(Error::unbound(name));
                }
                match Value::split_qualified(remaining) {
                    Some((seg, tail)) => {
                        current = current
                            .ns_get(seg)?
                            .ok_or_else(|| Error::unbound(name))?;
                        remaining = tail;
                    }
                    None => {
                        return current.ns_get(remaining)?.ok_or_else(|| Error::unbound(name));
                    }
                }
            }
        }
        Err(Error::unbound(name))
    }

    pub fn swap_frame(&mut self, new_frame: Handle<Frame>) -> Handle<Frame> {
        std::mem::replace(&mut self.frame, new_frame)
    }

    pub fn swap_namespace(&mut self, new_ns: Handle<NamespaceData>) -> Handle<NamespaceData> {
        std::mem::replace(&mut self.current_ns, new_ns)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Breaks residual `Cell` <-> closure cycles before the environment's root
/// frame is released (§9 "Frame clearing at interpreter shutdown").
impl Drop for Environment {
    fn drop(&mut self) {
        for value in self.frame.borrow().owned_values() {
            if let Value::Cell(cell) = value {
                cell.borrow_mut().inner = Value::Int(0);
            }
        }
    }
}
