use crate::error::{Error, Result};
use crate::eval::{self, value_or_propagate, EvalResult, Flow};
use crate::interp::Interpreter;
use crate::program::Word;
use crate::value::{NativeProc, Value};

pub fn register(interp: &mut Interpreter) {
    interp.register_proc("list", list_new);
    interp.register_proc("lindex", lindex);
    interp.register_proc("llength", llength);
    interp.register_proc("lrange", lrange);
    interp.register_proc("concat", concat);
    interp.register_proc("join", join);
    interp.register_proc("split", split);
    interp.register_special("lappend", lappend);
    interp.register_special("lset", lset);

    interp.register_proc("len", len);
    interp.register_proc("empty?", is_empty);
    interp.register_proc("get", get);
    interp.register_proc("put", put);
    interp.register_proc("del", del);
    interp.register_proc("has?", has);

    interp.register_proc("list?", |_i, a| type_predicate(a, Value::is_list));
    interp.register_proc("dict?", |_i, a| type_predicate(a, Value::is_dict));
    interp.register_proc("string?", |_i, a| type_predicate(a, Value::is_string));
    interp.register_proc("number?", |_i, a| type_predicate(a, is_number_value));
    interp.register_proc("int?", |_i, a| type_predicate(a, Value::is_int));
    interp.register_proc("float?", |_i, a| type_predicate(a, Value::is_float));
    interp.register_proc("proc?", |_i, a| type_predicate(a, Value::is_proc));

    interp.register_special("dict", dict_ensemble);

    register_namespace(interp);
}

fn arity1(args: &[Value]) -> Result<()> {
    if args.len() != 1 {
        return Err(Error::arity(1usize.to_string(), args.len()));
    }
    Ok(())
}

fn type_predicate(args: &[Value], test: impl Fn(&Value) -> bool) -> Result<Value> {
    arity1(args)?;
    Ok(Value::Int(test(&args[0]) as i64))
}

fn is_number_value(v: &Value) -> bool {
    match v {
        Value::Int(_) | Value::Float(_) => true,
        Value::String(s) => s.parse::<i64>().is_ok() || s.parse::<f64>().is_ok(),
        _ => false,
    }
}

// ---- list -------------------------------------------------------------

fn list_new(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::new_list(args.to_vec()))
}

/// `lindex base idx...` — chained indexing; indexing into a non-list by 0
/// returns the value itself, any other index (or out-of-range) is `""`.
fn lindex(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::arity("1+", 0));
    }
    let mut current = args[0].clone();
    for idx_val in &args[1..] {
        let idx = idx_val.as_int()?;
        if current.is_list() {
            if idx < 0 {
                return Ok(Value::string(""));
            }
            match current.list_get(idx) {
                Ok(v) => current = v,
                Err(_) => return Ok(Value::string("")),
            }
        } else if idx == 0 {
            continue;
        } else {
            return Ok(Value::string(""));
        }
    }
    Ok(current)
}

fn llength(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    arity1(args)?;
    if args[0].is_list() {
        Ok(Value::Int(args[0].list_len()? as i64))
    } else {
        Ok(Value::Int(1))
    }
}

fn lrange(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 3 {
        return Err(Error::arity(3usize.to_string(), args.len()));
    }
    if !args[0].is_list() {
        let first = args[1].as_int()?;
        let last = args[2].as_int()?;
        return if first <= 0 && last >= 0 {
            Ok(Value::new_list(vec![args[0].clone()]))
        } else {
            Ok(Value::new_list(vec![]))
        };
    }
    let len = args[0].list_len()? as i64;
    let first = args[1].as_int()?.max(0);
    let last = {
        let l = args[2].as_int()?;
        if l < 0 {
            -1
        } else {
            l.min(len - 1)
        }
    };
    let mut out = Vec::new();
    let mut i = first;
    while i <= last && i < len {
        out.push(args[0].list_get(i)?);
        i += 1;
    }
    Ok(Value::new_list(out))
}

fn concat(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let mut out = Vec::new();
    for a in args {
        if a.is_list() {
            out.extend(a.list_items()?.iter().cloned());
        } else {
            out.push(a.clone());
        }
    }
    Ok(Value::new_list(out))
}

fn join(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(Error::arity("1 or 2", args.len()));
    }
    let sep = if args.len() == 2 {
        args[1].to_display_string()
    } else {
        std::rc::Rc::from(" ")
    };
    if !args[0].is_list() {
        return Ok(Value::string(args[0].to_display_string()));
    }
    let mut out = String::new();
    for (idx, item) in args[0].list_items()?.iter().enumerate() {
        if idx > 0 {
            out.push_str(&sep);
        }
        out.push_str(&item.to_display_string());
    }
    Ok(Value::string(out))
}

fn split(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(Error::arity("1 or 2", args.len()));
    }
    let s = args[0].to_display_string();
    let items: Vec<Value> = if args.len() == 2 {
        let split_chars = args[1].to_display_string();
        if split_chars.is_empty() {
            s.chars().map(|c| Value::string(c.to_string())).collect()
        } else {
            s.split(|c: char| split_chars.contains(c))
                .map(Value::string)
                .collect()
        }
    } else {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    };
    Ok(Value::new_list(items))
}

/// `lappend name value...` — appends to the list held in the `Cell` bound
/// to `name` (wrapping a non-list value into a singleton list first).
fn lappend(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.is_empty() {
        return Err(Error::arity("1+", 0));
    }
    let name = value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let cell = interp.env.get_value(&name)?;
    if !cell.is_cell() {
        return Err(Error::type_mismatch("cell", cell.type_name()));
    }
    let mut list = cell.cell_get()?;
    if !list.is_list() {
        list = Value::new_list(vec![list]);
    }
    for word in &args[1..] {
        let v = value_or_propagate!(eval::eval_word(interp, word)?);
        list.list_push(v)?;
    }
    cell.cell_set(list.clone())?;
    Ok(Flow::Value(list))
}

/// `lset name idx value` — in-place element replacement via the `Cell`
/// bound to `name`.
fn lset(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.len() != 3 {
        return Err(Error::arity(3usize.to_string(), args.len()));
    }
    let name = value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let idx = value_or_propagate!(eval::eval_word(interp, &args[1])?).as_int()?;
    let value = value_or_propagate!(eval::eval_word(interp, &args[2])?);
    let cell = interp.env.get_value(&name)?;
    if !cell.is_cell() {
        return Err(Error::type_mismatch("cell", cell.type_name()));
    }
    let mut list = cell.cell_get()?;
    if !list.is_list() {
        return Err(Error::type_mismatch("list", list.type_name()));
    }
    list.list_set(idx, value)?;
    cell.cell_set(list.clone())?;
    Ok(Flow::Value(list))
}

// ---- generic container accessors ---------------------------------------

fn len(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    arity1(args)?;
    match &args[0] {
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        v if v.is_list() => Ok(Value::Int(v.list_len()? as i64)),
        v if v.is_dict() => Ok(Value::Int(v.dict_len()? as i64)),
        v => Err(Error::type_mismatch("container", v.type_name())),
    }
}

fn is_empty(interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    let l = len(interp, args)?;
    Ok(Value::Int((l.as_int()? == 0) as i64))
}

/// `get container key [default]` — the generic accessor (`c_generic_get`).
fn get(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 && args.len() != 3 {
        return Err(Error::arity("2 or 3", args.len()));
    }
    let default = args.get(2).cloned();
    match &args[0] {
        v if v.is_list() => match args[1].as_int().ok().and_then(|i| v.list_get(i).ok()) {
            Some(found) => Ok(found),
            None => default.ok_or_else(|| Error::IndexOutOfRange {
                index: args[1].as_int().unwrap_or(-1),
                len: v.list_len().unwrap_or(0),
            }),
        },
        v if v.is_dict() => {
            let key = args[1].to_display_string();
            match v.dict_get(&key)? {
                Some(found) => Ok(found),
                None => default.ok_or_else(|| Error::generic(format!("no such key '{key}'"))),
            }
        }
        Value::String(s) => {
            let idx = args[1].as_int().ok();
            match idx.and_then(|i| {
                if i < 0 {
                    None
                } else {
                    s.chars().nth(i as usize)
                }
            }) {
                Some(c) => Ok(Value::string(c.to_string())),
                None => default.ok_or_else(|| Error::generic("string index out of range")),
            }
        }
        v => Err(Error::type_mismatch("container", v.type_name())),
    }
}

/// `put container key value` — functional update, returns a new container.
fn put(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 3 {
        return Err(Error::arity(3usize.to_string(), args.len()));
    }
    match &args[0] {
        v if v.is_list() => {
            let mut copy = v.clone();
            copy.list_set(args[1].as_int()?, args[2].clone())?;
            Ok(copy)
        }
        v if v.is_dict() => {
            let mut copy = v.clone();
            copy.dict_put(args[1].to_display_string().as_ref(), args[2].clone())?;
            Ok(copy)
        }
        v => Err(Error::type_mismatch("list or dict", v.type_name())),
    }
}

/// `del container key` — functional delete, dict only (`c_del`).
fn del(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let mut copy = args[0].clone();
    copy.dict_delete(&args[1].to_display_string())?;
    Ok(copy)
}

fn has(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    match &args[0] {
        v if v.is_list() => {
            let idx = args[1].as_int()?;
            let in_range = idx >= 0 && (idx as usize) < v.list_len()?;
            Ok(Value::Int(in_range as i64))
        }
        v if v.is_dict() => {
            let key = args[1].to_display_string();
            Ok(Value::Int(v.dict_get(&key)?.is_some() as i64))
        }
        v => Err(Error::type_mismatch("list or dict", v.type_name())),
    }
}

// ---- dict ensemble ------------------------------------------------------

/// `dict create|get|size|keys|values|exists|set|unset ...` (§4.6 `dict`).
fn dict_ensemble(interp: &mut Interpreter, args: &[Word]) -> EvalResult {
    if args.is_empty() {
        return Err(Error::arity("1+", 0));
    }
    let subcmd = value_or_propagate!(eval::eval_word_to_string(interp, &args[0])?).to_display_string();
    let mut values = Vec::with_capacity(args.len() - 1);
    for word in &args[1..] {
        values.push(value_or_propagate!(eval::eval_word(interp, word)?));
    }

    let result = match subcmd.as_ref() {
        "create" => {
            if values.len() % 2 != 0 {
                return Err(Error::generic("dict create: expected an even number of arguments"));
            }
            let mut d = Value::new_dict();
            for pair in values.chunks(2) {
                d.dict_put(pair[0].to_display_string().as_ref(), pair[1].clone())?;
            }
            d
        }
        "get" => {
            if values.is_empty() {
                return Err(Error::arity("1+", 0));
            }
            get(interp, &values)?
        }
        "size" => {
            if values.len() != 1 {
                return Err(Error::arity(1usize.to_string(), values.len()));
            }
            Value::Int(values[0].dict_len()? as i64)
        }
        "keys" => {
            if values.len() != 1 {
                return Err(Error::arity(1usize.to_string(), values.len()));
            }
            Value::new_list(
                values[0]
                    .dict_keys()?
                    .into_iter()
                    .map(|k| Value::string(k.as_str()))
                    .collect(),
            )
        }
        "values" => {
            if values.len() != 1 {
                return Err(Error::arity(1usize.to_string(), values.len()));
            }
            Value::new_list(values[0].dict_iter()?.into_iter().map(|(_, v)| v).collect())
        }
        "exists" => {
            if values.len() != 2 {
                return Err(Error::arity(2usize.to_string(), values.len()));
            }
            has(interp, &values)?
        }
        "set" => {
            if values.len() != 3 {
                return Err(Error::arity(3usize.to_string(), values.len()));
            }
            put(interp, &values)?
        }
        "unset" => {
            if values.len() != 2 {
                return Err(Error::arity(2usize.to_string(), values.len()));
            }
            del(interp, &values)?
        }
        other => return Err(Error::generic(format!("dict: unknown subcommand '{other}'"))),
    };
    Ok(Flow::Value(result))
}

// ---- List::/Dict::/String:: namespaces ---------------------------------

fn register_namespace(interp: &mut Interpreter) {
    let list_ns = Value::new_namespace("List");
    bind(&list_ns, "new", list_new);
    bind(&list_ns, "push", list_push_ns);
    bind(&list_ns, "pop", list_pop_ns);
    bind(&list_ns, "slice", list_slice_ns);
    bind(&list_ns, "concat", concat);
    bind(&list_ns, "reverse", list_reverse_ns);
    bind(&list_ns, "index", lindex);
    bind(&list_ns, "range", lrange);
    interp.define("List", list_ns);

    let dict_ns = Value::new_namespace("Dict");
    bind(&dict_ns, "new", dict_create_ns);
    bind(&dict_ns, "keys", dict_keys_ns);
    bind(&dict_ns, "values", dict_values_ns);
    bind(&dict_ns, "items", dict_items_ns);
    bind(&dict_ns, "merge", dict_merge_ns);
    interp.define("Dict", dict_ns);

    let string_ns = Value::new_namespace("String");
    bind(&string_ns, "upper", string_upper_ns);
    bind(&string_ns, "lower", string_lower_ns);
    bind(&string_ns, "find", string_find_ns);
    bind(&string_ns, "replace", string_replace_ns);
    bind(&string_ns, "split", split);
    bind(&string_ns, "join", join);
    interp.define("String", string_ns);
}

fn bind(ns: &Value, name: &str, f: crate::value::NativeFn) {
    ns.ns_def(name, Value::NativeProc(NativeProc::new_proc(name, f)))
        .expect("namespace value");
}

fn list_push_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let mut copy = args[0].clone();
    copy.list_push(args[1].clone())?;
    Ok(copy)
}

/// `List::pop list` — returns `[remaining-list popped-value]`.
fn list_pop_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    arity1(args)?;
    let mut copy = args[0].clone();
    match copy.list_pop()? {
        Some(last) => Ok(Value::new_list(vec![copy, last])),
        None => Err(Error::IndexOutOfRange { index: -1, len: 0 }),
    }
}

/// `List::slice list start [end]` — Python-like negative-offset slicing,
/// distinct from `lrange`'s clamped-index semantics.
fn list_slice_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 && args.len() != 3 {
        return Err(Error::arity("2 or 3", args.len()));
    }
    let items = args[0].list_items()?;
    let len = items.len() as i64;
    let normalize = |i: i64| -> i64 {
        let i = if i < 0 { len + i } else { i };
        i.clamp(0, len)
    };
    let start = normalize(args[1].as_int()?);
    let end = if args.len() == 3 {
        normalize(args[2].as_int()?)
    } else {
        len
    };
    if start >= end {
        return Ok(Value::new_list(vec![]));
    }
    Ok(Value::new_list(items[start as usize..end as usize].to_vec()))
}

fn list_reverse_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    arity1(args)?;
    let mut items = args[0].list_items()?.to_vec();
    items.reverse();
    Ok(Value::new_list(items))
}

fn dict_create_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() % 2 != 0 {
        return Err(Error::generic("Dict::new: expected an even number of arguments"));
    }
    let mut d = Value::new_dict();
    for pair in args.chunks(2) {
        d.dict_put(pair[0].to_display_string().as_ref(), pair[1].clone())?;
    }
    Ok(d)
}

fn dict_keys_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    arity1(args)?;
    Ok(Value::new_list(
        args[0]
            .dict_keys()?
            .into_iter()
            .map(|k| Value::string(k.as_str()))
            .collect(),
    ))
}

fn dict_values_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    arity1(args)?;
    Ok(Value::new_list(args[0].dict_iter()?.into_iter().map(|(_, v)| v).collect()))
}

fn dict_items_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    arity1(args)?;
    Ok(Value::new_list(
        args[0]
            .dict_iter()?
            .into_iter()
            .map(|(k, v)| Value::new_list(vec![Value::string(k.as_str()), v]))
            .collect(),
    ))
}

fn dict_merge_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let mut out = args[0].clone();
    for (k, v) in args[1].dict_iter()? {
        out.dict_put(k, v)?;
    }
    Ok(out)
}

fn string_upper_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    arity1(args)?;
    Ok(Value::string(ascii_upper(&args[0].to_display_string())))
}

fn string_lower_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    arity1(args)?;
    Ok(Value::string(ascii_lower(&args[0].to_display_string())))
}

fn ascii_upper(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_lowercase() { c.to_ascii_uppercase() } else { c })
        .collect()
}

fn ascii_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_uppercase() { c.to_ascii_lowercase() } else { c })
        .collect()
}

fn string_find_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 2 {
        return Err(Error::arity(2usize.to_string(), args.len()));
    }
    let haystack = args[0].to_display_string();
    let needle = args[1].to_display_string();
    match haystack.find(needle.as_ref()) {
        Some(byte_idx) => Ok(Value::Int(haystack[..byte_idx].chars().count() as i64)),
        None => Ok(Value::Int(-1)),
    }
}

fn string_replace_ns(_interp: &mut Interpreter, args: &[Value]) -> Result<Value> {
    if args.len() != 3 {
        return Err(Error::arity(3usize.to_string(), args.len()));
    }
    let s = args[0].to_display_string();
    let old = args[1].to_display_string();
    if old.is_empty() {
        return Ok(Value::string(s));
    }
    let new = args[2].to_display_string();
    Ok(Value::string(s.replace(old.as_ref(), &new)))
}

