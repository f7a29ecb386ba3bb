//! Minimal PDF object model and the object-emission boundary.
//!
//! The gradient compiler only ever talks to a [`DocumentEmitter`]; object
//! numbering, cross-reference tables and file output belong to whoever
//! implements it. [`InMemoryDocument`] is the implementation used by the
//! command line tool and the tests.

use std::fmt::Write as _;

use anyhow::{Result, bail};

use crate::shader::utils::fmt_scalar;

/// Reference to an emitted indirect object. Object numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(pub u32);

impl ObjectRef {
    pub fn number(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Bool(bool),
    Int(i64),
    Real(f32),
    Name(String),
    Array(Vec<PdfObject>),
    Dict(PdfDict),
    Ref(ObjectRef),
}

impl PdfObject {
    pub fn name(name: impl Into<String>) -> Self {
        PdfObject::Name(name.into())
    }

    pub fn reals(values: &[f32]) -> Self {
        PdfObject::Array(values.iter().copied().map(PdfObject::Real).collect())
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PdfObject::Int(v) => Some(*v as f32),
            PdfObject::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PdfObject::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfObject]> {
        match self {
            PdfObject::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PdfDict> {
        match self {
            PdfObject::Dict(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object_ref(&self) -> Option<ObjectRef> {
        match self {
            PdfObject::Ref(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric array contents, or `None` if any element is not a number.
    pub fn as_f32_vec(&self) -> Option<Vec<f32>> {
        self.as_array()?.iter().map(PdfObject::as_f32).collect()
    }

    fn write_to(&self, out: &mut String) {
        match self {
            PdfObject::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
            PdfObject::Int(v) => {
                let _ = write!(out, "{v}");
            }
            PdfObject::Real(v) => out.push_str(&fmt_scalar(*v)),
            PdfObject::Name(v) => {
                out.push('/');
                out.push_str(v);
            }
            PdfObject::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    item.write_to(out);
                }
                out.push(']');
            }
            PdfObject::Dict(dict) => dict.write_to(out),
            PdfObject::Ref(r) => {
                let _ = write!(out, "{} 0 R", r.0);
            }
        }
    }
}

impl From<PdfDict> for PdfObject {
    fn from(d: PdfDict) -> Self {
        PdfObject::Dict(d)
    }
}

impl From<ObjectRef> for PdfObject {
    fn from(r: ObjectRef) -> Self {
        PdfObject::Ref(r)
    }
}

/// Insertion-ordered dictionary. Keys are names without the leading slash.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfDict {
    entries: Vec<(String, PdfObject)>,
}

impl PdfDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dictionary with a `/Type` entry.
    pub fn typed(type_name: &str) -> Self {
        let mut d = Self::new();
        d.insert_name("Type", type_name);
        d
    }

    /// Insert or replace `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PdfObject>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn insert_int(&mut self, key: &str, v: i64) {
        self.insert(key, PdfObject::Int(v));
    }

    pub fn insert_real(&mut self, key: &str, v: f32) {
        self.insert(key, PdfObject::Real(v));
    }

    pub fn insert_name(&mut self, key: &str, v: &str) {
        self.insert(key, PdfObject::name(v));
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PdfObject)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn write_to(&self, out: &mut String) {
        out.push_str("<<");
        for (k, v) in &self.entries {
            out.push_str(" /");
            out.push_str(k);
            out.push(' ');
            v.write_to(out);
        }
        out.push_str(" >>");
    }

    pub fn to_pdf_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

/// The narrow interface through which generated objects leave the compiler.
pub trait DocumentEmitter {
    /// Allocate and serialize an indirect dictionary object.
    fn emit_object(&mut self, dict: PdfDict) -> Result<ObjectRef>;

    /// Allocate and serialize an indirect stream object. `/Length` is
    /// filled in by the emitter.
    fn emit_stream(&mut self, dict: PdfDict, bytes: Vec<u8>) -> Result<ObjectRef>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmittedObject {
    pub dict: PdfDict,
    pub stream: Option<Vec<u8>>,
}

impl EmittedObject {
    pub fn stream_text(&self) -> Option<&str> {
        self.stream
            .as_deref()
            .and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Append-only object store.
#[derive(Debug, Default)]
pub struct InMemoryDocument {
    objects: Vec<EmittedObject>,
    max_objects: Option<usize>,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document that refuses to emit more than `max_objects` objects.
    pub fn with_object_limit(max_objects: usize) -> Self {
        Self {
            objects: Vec::new(),
            max_objects: Some(max_objects),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, r: ObjectRef) -> Option<&EmittedObject> {
        let idx = (r.0 as usize).checked_sub(1)?;
        self.objects.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectRef, &EmittedObject)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectRef(i as u32 + 1), o))
    }

    fn push(&mut self, obj: EmittedObject) -> Result<ObjectRef> {
        if let Some(max) = self.max_objects {
            if self.objects.len() >= max {
                bail!("object limit of {max} reached");
            }
        }
        self.objects.push(obj);
        Ok(ObjectRef(self.objects.len() as u32))
    }

    /// Every object in `N 0 obj ... endobj` form, in allocation order.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (r, obj) in self.iter() {
            let _ = writeln!(out, "{} 0 obj", r.0);
            out.push_str(&obj.dict.to_pdf_string());
            out.push('\n');
            if let Some(bytes) = &obj.stream {
                out.push_str("stream\n");
                out.push_str(&String::from_utf8_lossy(bytes));
                if !bytes.ends_with(b"\n") {
                    out.push('\n');
                }
                out.push_str("endstream\n");
            }
            out.push_str("endobj\n");
        }
        out
    }
}

impl DocumentEmitter for InMemoryDocument {
    fn emit_object(&mut self, dict: PdfDict) -> Result<ObjectRef> {
        self.push(EmittedObject { dict, stream: None })
    }

    fn emit_stream(&mut self, mut dict: PdfDict, bytes: Vec<u8>) -> Result<ObjectRef> {
        dict.insert_int("Length", bytes.len() as i64);
        self.push(EmittedObject {
            dict,
            stream: Some(bytes),
        })
    }
}
