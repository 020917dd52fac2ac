//! Dynamically typed, reference-counted value.
//!
//! Acquire/release from the reference design (§3.1/§4.1) is realized as
//! ordinary [`Clone`]/[`Drop`]: cloning a `Value` is an acquire, dropping one
//! is a release, and [`std::rc::Rc::strong_count`] is the observable
//! refcount. Copy-on-write for `List`/`Dict` is realized with
//! [`Rc::make_mut`], which already clones exactly when the count is greater
//! than one.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::error::{Error, Result};
use crate::eval::EvalResult;
use crate::handle::Handle;
use crate::interp::Interpreter;
use crate::program::{Program, Word};

/// Native procedure, called with pre-evaluated arguments.
pub type NativeFn = fn(&mut Interpreter, &[Value]) -> Result<Value>;

/// Special form, called with the raw, unevaluated argument words.
pub type SpecialFn = fn(&mut Interpreter, &[Word]) -> EvalResult;

const MAX_EQ_DEPTH: usize = 1000;

#[derive(Clone)]
pub enum Value {
    String(Rc<str>),
    Int(i64),
    Float(f64),
    List(Rc<ListData>),
    Dict(Rc<DictData>),
    Cell(Handle<CellData>),
    UserProc(Rc<UserProc>),
    NativeProc(NativeProc),
    Namespace(Handle<NamespaceData>),
    Opaque(Rc<OpaqueData>),
}

#[derive(Clone, Default)]
pub struct ListData {
    pub items: Vec<Value>,
    cache: RefCell<Option<Rc<str>>>,
}

#[derive(Clone, Default)]
pub struct DictData {
    pub entries: HashMap<SmolStr, Value>,
    cache: RefCell<Option<Rc<str>>>,
}

pub struct CellData {
    pub inner: Value,
}

pub struct NamespaceData {
    pub qname: SmolStr,
    pub map: HashMap<SmolStr, Value>,
}

/// A parsed user-defined procedure: parameters, body, and its flat closure.
pub struct UserProc {
    pub name: SmolStr,
    pub params: Vec<SmolStr>,
    pub body: Rc<Program>,
    pub upvalues: Vec<Upvalue>,
    /// Captured defining namespace, present only when it differs from the
    /// global namespace at creation time (§4.5.1).
    pub namespace: Option<Handle<NamespaceData>>,
}

/// A single captured free variable, per §4.5.1.
#[derive(Clone)]
pub struct Upvalue {
    pub name: SmolStr,
    pub is_cell: bool,
    pub value: Value,
}

#[derive(Clone, Copy)]
pub enum NativeKind {
    Proc(NativeFn),
    SpecialForm(SpecialFn),
}

#[derive(Clone)]
pub struct NativeProc {
    pub name: SmolStr,
    pub kind: NativeKind,
}

impl NativeProc {
    pub fn new_proc(name: impl Into<SmolStr>, func: NativeFn) -> Self {
        NativeProc {
            name: name.into(),
            kind: NativeKind::Proc(func),
        }
    }

    pub fn new_special(name: impl Into<SmolStr>, func: SpecialFn) -> Self {
        NativeProc {
            name: name.into(),
            kind: NativeKind::SpecialForm(func),
        }
    }

    pub fn is_special_form(&self) -> bool {
        matches!(self.kind, NativeKind::SpecialForm(_))
    }

    fn identical(&self, other: &NativeProc) -> bool {
        match (self.kind, other.kind) {
            (NativeKind::Proc(a), NativeKind::Proc(b)) => a as usize == b as usize,
            (NativeKind::SpecialForm(a), NativeKind::SpecialForm(b)) => a as usize == b as usize,
            _ => false,
        }
    }
}

pub struct OpaqueData {
    pub tag: SmolStr,
    pub payload: Box<dyn Any>,
}

impl Value {
    // ---- constructors -----------------------------------------------

    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn new_list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(ListData {
            items,
            cache: RefCell::new(None),
        }))
    }

    pub fn new_dict() -> Value {
        Value::Dict(Rc::new(DictData::default()))
    }

    pub fn new_cell(initial: Value) -> Value {
        Value::Cell(Handle::new(CellData { inner: initial }))
    }

    pub fn new_namespace(qname: impl Into<SmolStr>) -> Value {
        Value::Namespace(Handle::new(NamespaceData {
            qname: qname.into(),
            map: HashMap::new(),
        }))
    }

    pub fn new_opaque(tag: impl Into<SmolStr>, payload: Box<dyn Any>) -> Value {
        Value::Opaque(Rc::new(OpaqueData {
            tag: tag.into(),
            payload,
        }))
    }

    // ---- introspection ------------------------------------------------

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Cell(_) => "cell",
            Value::UserProc(_) => "proc",
            Value::NativeProc(_) => "nativeproc",
            Value::Namespace(_) => "namespace",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }
    pub fn is_dict(&self) -> bool {
        matches!(self, Value::Dict(_))
    }
    pub fn is_cell(&self) -> bool {
        matches!(self, Value::Cell(_))
    }
    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }
    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }
    pub fn is_namespace(&self) -> bool {
        matches!(self, Value::Namespace(_))
    }
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::UserProc(_))
            || matches!(self, Value::NativeProc(np) if !np.is_special_form())
    }
    pub fn is_special_form(&self) -> bool {
        matches!(self, Value::NativeProc(np) if np.is_special_form())
    }
    pub fn is_proc(&self) -> bool {
        matches!(self, Value::UserProc(_) | Value::NativeProc(_))
    }

    // ---- string reification --------------------------------------------

    /// Returns the cached string form, computing and caching it if absent.
    pub fn to_display_string(&self) -> Rc<str> {
        match self {
            Value::String(s) => Rc::clone(s),
            Value::Int(i) => Rc::from(i.to_string().as_str()),
            Value::Float(f) => Rc::from(f.to_string().as_str()),
            Value::List(rc) => {
                if let Some(cached) = rc.cache.borrow().as_ref() {
                    return Rc::clone(cached);
                }
                let mut buf = String::new();
                for (idx, item) in rc.items.iter().enumerate() {
                    if idx > 0 {
                        buf.push(' ');
                    }
                    write_element(&mut buf, &item.to_display_string());
                }
                let out: Rc<str> = Rc::from(buf.as_str());
                *rc.cache.borrow_mut() = Some(Rc::clone(&out));
                out
            }
            Value::Dict(rc) => {
                if let Some(cached) = rc.cache.borrow().as_ref() {
                    return Rc::clone(cached);
                }
                let mut buf = String::new();
                let mut first = true;
                for (key, value) in rc.entries.iter() {
                    if !first {
                        buf.push(' ');
                    }
                    first = false;
                    write_element(&mut buf, key.as_str());
                    buf.push(' ');
                    write_element(&mut buf, &value.to_display_string());
                }
                let out: Rc<str> = Rc::from(buf.as_str());
                *rc.cache.borrow_mut() = Some(Rc::clone(&out));
                out
            }
            Value::Cell(_) => Rc::from("<cell>"),
            Value::UserProc(p) => Rc::from(format!("<proc:{}>", p.name).as_str()),
            Value::NativeProc(np) => Rc::from(format!("<native-proc:{}>", np.name).as_str()),
            Value::Namespace(ns) => Rc::from(ns.borrow().qname.as_str()),
            Value::Opaque(op) => Rc::from(format!("<opaque:{}>", op.tag).as_str()),
        }
    }

    // ---- coercions -------------------------------------------------------

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Float(f) => Ok(*f as i64),
            Value::String(s) => s
                .parse::<i64>()
                .map_err(|_| Error::type_mismatch("int", "string")),
            _ => Err(Error::type_mismatch("int", self.type_name())),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::String(s) => s
                .parse::<f64>()
                .map_err(|_| Error::type_mismatch("float", "string")),
            _ => Err(Error::type_mismatch("float", self.type_name())),
        }
    }

    fn as_numeric_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Unwraps one layer of `Cell`, otherwise clones self (cheap: a refcount
    /// bump for every variant).
    fn deref_cell(&self) -> Value {
        match self {
            Value::Cell(c) => c.borrow().inner.clone(),
            _ => self.clone(),
        }
    }

    // ---- equality ----------------------------------------------------------

    /// Language `==`: deep, numeric-promoting, cycle-guarded equality.
    pub fn loose_eq(&self, other: &Value) -> Result<bool> {
        self.loose_eq_depth(other, 0)
    }

    fn loose_eq_depth(&self, other: &Value, depth: usize) -> Result<bool> {
        if depth > MAX_EQ_DEPTH {
            return Err(Error::generic("equality comparison nested too deeply"));
        }
        let a = self.deref_cell();
        let b = other.deref_cell();

        if let (Some(x), Some(y)) = (a.as_numeric_f64(), b.as_numeric_f64()) {
            return Ok(x == y);
        }

        let eq = match (&a, &b) {
            (Value::String(x), Value::String(y)) => x == y,
            (Value::List(x), Value::List(y)) => {
                if x.items.len() != y.items.len() {
                    false
                } else {
                    let mut all = true;
                    for (xi, yi) in x.items.iter().zip(y.items.iter()) {
                        if !xi.loose_eq_depth(yi, depth + 1)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
            }
            (Value::Dict(x), Value::Dict(y)) => {
                if x.entries.len() != y.entries.len() {
                    false
                } else {
                    let mut all = true;
                    for (k, v) in x.entries.iter() {
                        match y.entries.get(k) {
                            Some(yv) if v.loose_eq_depth(yv, depth + 1)? => {}
                            _ => {
                                all = false;
                                break;
                            }
                        }
                    }
                    all
                }
            }
            (Value::Cell(x), Value::Cell(y)) => x.ptr_eq(y),
            (Value::Namespace(x), Value::Namespace(y)) => x.ptr_eq(y),
            (Value::UserProc(x), Value::UserProc(y)) => Rc::ptr_eq(x, y),
            (Value::NativeProc(x), Value::NativeProc(y)) => x.identical(y),
            (Value::Opaque(x), Value::Opaque(y)) => Rc::ptr_eq(x, y),
            _ => false,
        };
        Ok(eq)
    }

    /// Language `same?`: pointer identity, no numeric/cell coercion.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(x), Value::String(y)) => Rc::ptr_eq(x, y),
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y,
            (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
            (Value::Dict(x), Value::Dict(y)) => Rc::ptr_eq(x, y),
            (Value::Cell(x), Value::Cell(y)) => x.ptr_eq(y),
            (Value::UserProc(x), Value::UserProc(y)) => Rc::ptr_eq(x, y),
            (Value::NativeProc(x), Value::NativeProc(y)) => x.identical(y),
            (Value::Namespace(x), Value::Namespace(y)) => x.ptr_eq(y),
            (Value::Opaque(x), Value::Opaque(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }

    // ---- list operations -----------------------------------------------

    pub fn list_items(&self) -> Result<&[Value]> {
        match self {
            Value::List(rc) => Ok(&rc.items),
            _ => Err(Error::type_mismatch("list", self.type_name())),
        }
    }

    pub fn list_len(&self) -> Result<usize> {
        Ok(self.list_items()?.len())
    }

    pub fn list_get(&self, index: i64) -> Result<Value> {
        let items = self.list_items()?;
        if index < 0 || index as usize >= items.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: items.len(),
            });
        }
        Ok(items[index as usize].clone())
    }

    pub fn list_push(&mut self, value: Value) -> Result<()> {
        match self {
            Value::List(rc) => {
                let data = Rc::make_mut(rc);
                data.cache.borrow_mut().take();
                data.items.push(value);
                Ok(())
            }
            _ => Err(Error::type_mismatch("list", self.type_name())),
        }
    }

    /// Pops and returns the last element, or `None` if the list is empty.
    pub fn list_pop(&mut self) -> Result<Option<Value>> {
        match self {
            Value::List(rc) => {
                let data = Rc::make_mut(rc);
                data.cache.borrow_mut().take();
                Ok(data.items.pop())
            }
            _ => Err(Error::type_mismatch("list", self.type_name())),
        }
    }

    pub fn list_set(&mut self, index: i64, value: Value) -> Result<()> {
        let len = self.list_len()?;
        if index < 0 || index as usize >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        match self {
            Value::List(rc) => {
                let data = Rc::make_mut(rc);
                data.cache.borrow_mut().take();
                data.items[index as usize] = value;
                Ok(())
            }
            _ => unreachable!(),
        }
    }

    // ---- dict operations -----------------------------------------------

    pub fn dict_len(&self) -> Result<usize> {
        match self {
            Value::Dict(rc) => Ok(rc.entries.len()),
            _ => Err(Error::type_mismatch("dict", self.type_name())),
        }
    }

    pub fn dict_get(&self, key: &str) -> Result<Option<Value>> {
        match self {
            Value::Dict(rc) => Ok(rc.entries.get(key).cloned()),
            _ => Err(Error::type_mismatch("dict", self.type_name())),
        }
    }

    pub fn dict_put(&mut self, key: impl Into<SmolStr>, value: Value) -> Result<()> {
        match self {
            Value::Dict(rc) => {
                let data = Rc::make_mut(rc);
                data.cache.borrow_mut().take();
                data.entries.insert(key.into(), value);
                Ok(())
            }
            _ => Err(Error::type_mismatch("dict", self.type_name())),
        }
    }

    pub fn dict_delete(&mut self, key: &str) -> Result<Option<Value>> {
        match self {
            Value::Dict(rc) => {
                let data = Rc::make_mut(rc);
                data.cache.borrow_mut().take();
                Ok(data.entries.remove(key))
            }
            _ => Err(Error::type_mismatch("dict", self.type_name())),
        }
    }

    pub fn dict_keys(&self) -> Result<Vec<SmolStr>> {
        match self {
            Value::Dict(rc) => Ok(rc.entries.keys().cloned().collect()),
            _ => Err(Error::type_mismatch("dict", self.type_name())),
        }
    }

    pub fn dict_iter(&self) -> Result<Vec<(SmolStr, Value)>> {
        match self {
            Value::Dict(rc) => Ok(rc
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            _ => Err(Error::type_mismatch("dict", self.type_name())),
        }
    }

    // ---- cell operations -----------------------------------------------

    pub fn cell_get(&self) -> Result<Value> {
        match self {
            Value::Cell(h) => Ok(h.borrow().inner.clone()),
            _ => Err(Error::type_mismatch("cell", self.type_name())),
        }
    }

    pub fn cell_set(&self, value: Value) -> Result<()> {
        match self {
            Value::Cell(h) => {
                h.borrow_mut().inner = value;
                Ok(())
            }
            _ => Err(Error::type_mismatch("cell", self.type_name())),
        }
    }

    pub fn as_cell_handle(&self) -> Result<Handle<CellData>> {
        match self {
            Value::Cell(h) => Ok(h.clone()),
            _ => Err(Error::type_mismatch("cell", self.type_name())),
        }
    }

    // ---- namespace operations --------------------------------------------

    pub fn ns_qname(&self) -> Result<SmolStr> {
        match self {
            Value::Namespace(h) => Ok(h.borrow().qname.clone()),
            _ => Err(Error::type_mismatch("namespace", self.type_name())),
        }
    }

    pub fn ns_def(&self, name: impl Into<SmolStr>, value: Value) -> Result<()> {
        match self {
            Value::Namespace(h) => {
                h.borrow_mut().map.insert(name.into(), value);
                Ok(())
            }
            _ => Err(Error::type_mismatch("namespace", self.type_name())),
        }
    }

    pub fn ns_get(&self, name: &str) -> Result<Option<Value>> {
        match self {
            Value::Namespace(h) => Ok(h.borrow().map.get(name).cloned()),
            _ => Err(Error::type_mismatch("namespace", self.type_name())),
        }
    }

    pub fn as_namespace_handle(&self) -> Result<Handle<NamespaceData>> {
        match self {
            Value::Namespace(h) => Ok(h.clone()),
            _ => Err(Error::type_mismatch("namespace", self.type_name())),
        }
    }

    /// Recognizes `left::rest` as a qualified reference (§4.1 `split`).
    pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
        name.find("::").map(|idx| (&name[..idx], &name[idx + 2..]))
    }

    // ---- opaque operations -----------------------------------------------

    pub fn opaque_tag(&self) -> Result<SmolStr> {
        match self {
            Value::Opaque(o) => Ok(o.tag.clone()),
            _ => Err(Error::type_mismatch("opaque", self.type_name())),
        }
    }

    pub fn opaque_get<T: 'static>(&self, expected_tag: Option<&str>) -> Result<&T> {
        match self {
            Value::Opaque(o) => {
                if let Some(tag) = expected_tag {
                    if tag != o.tag.as_str() {
                        return Err(Error::OpaqueTypeMismatch {
                            expected: tag.to_string(),
                            found: o.tag.to_string(),
                        });
                    }
                }
                o.payload
                    .downcast_ref::<T>()
                    .ok_or_else(|| Error::type_mismatch("opaque", self.type_name()))
            }
            _ => Err(Error::type_mismatch("opaque", self.type_name())),
        }
    }
}

fn needs_braces(s: &str) -> bool {
    s.is_empty()
        || s.chars()
            .any(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '[' | ']' | '{' | '}' | '"' | '$' | '\\'))
}

fn write_element(buf: &mut String, s: &str) {
    if needs_braces(s) {
        buf.push('{');
        buf.push_str(s);
        buf.push('}');
    } else {
        buf.push_str(s);
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.to_display_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn string_form_round_trips() {
        let v = Value::string("hello");
        assert_eq!(&*v.to_display_string(), "hello");
        assert_eq!(&*v.to_display_string(), &*v.to_display_string());
    }

    #[test]
    fn list_cow_isolation() {
        let mut a = Value::new_list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let b = a.clone();
        a.list_push(Value::Int(4)).unwrap();
        assert_eq!(a.list_len().unwrap(), 4);
        assert_eq!(b.list_len().unwrap(), 3);
    }

    #[test]
    fn list_string_form_invalidated_on_mutation() {
        let mut a = Value::new_list(vec![Value::Int(1)]);
        let before = a.to_display_string();
        a.list_push(Value::Int(2)).unwrap();
        let after = a.to_display_string();
        assert_ne!(&*before, &*after);
    }

    #[test]
    fn cell_aliasing() {
        let cell = Value::new_cell(Value::Int(0));
        let alias = cell.clone();
        cell.cell_set(Value::Int(9)).unwrap();
        assert_eq!(alias.cell_get().unwrap().as_int().unwrap(), 9);
    }

    #[test]
    fn loose_eq_numeric_promotion() {
        let a = Value::Int(3);
        let b = Value::Float(3.0);
        let c = Value::string("3");
        assert!(a.loose_eq(&b).unwrap());
        assert!(a.loose_eq(&c).unwrap());
    }

    #[test]
    fn same_is_stricter_than_loose_eq() {
        let a = Value::Int(3);
        let b = Value::Float(3.0);
        assert!(a.loose_eq(&b).unwrap());
        assert!(!a.identical(&b));
    }
}
